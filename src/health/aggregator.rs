use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;

use crate::config::HealthConfig;
use crate::error::{MonitorError, ProbeError, Result};
use crate::health::probe::{
    CompositeHealth, HealthDetails, HealthProbe, HealthReport, HealthStatus, ReadinessReport,
};

/// Runs registered probes concurrently and reduces them to one status.
///
/// Holds no state between calls apart from the probe list and start time.
pub struct HealthAggregator {
    probes: Vec<Arc<dyn HealthProbe>>,
    probe_timeout: Duration,
    version: String,
    started_at: Instant,
}

impl HealthAggregator {
    pub fn new(config: &HealthConfig) -> Self {
        Self {
            probes: Vec::new(),
            probe_timeout: config.probe_timeout,
            version: config.version.clone(),
            started_at: Instant::now(),
        }
    }

    /// Register a probe. A probe with the same name replaces the earlier one.
    pub fn register(&mut self, probe: Arc<dyn HealthProbe>) {
        match self.probes.iter().position(|p| p.name() == probe.name()) {
            Some(index) => self.probes[index] = probe,
            None => self.probes.push(probe),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.register(probe);
        self
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.probes.iter().map(|p| p.name()).collect()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub async fn check_all(&self) -> CompositeHealth {
        let services = self.run_probes(self.probes.iter().cloned()).await;
        let status = HealthStatus::worst(services.values().map(|r| r.status));

        if status != HealthStatus::Healthy {
            tracing::warn!(status = %status, "Composite health is not healthy");
        }

        CompositeHealth {
            status,
            services,
            checked_at: Utc::now(),
            uptime_seconds: self.uptime().as_secs_f64(),
            version: self.version.clone(),
        }
    }

    pub async fn check_one(&self, name: &str) -> Result<HealthReport> {
        let probe = self
            .probes
            .iter()
            .find(|p| p.name() == name)
            .cloned()
            .ok_or_else(|| MonitorError::ServiceNotFound(name.to_string()))?;
        Ok(run_probe(probe, self.probe_timeout).await)
    }

    /// Ready when every critical probe is healthy.
    pub async fn check_ready(&self) -> ReadinessReport {
        let critical = self.probes.iter().filter(|p| p.is_critical()).cloned();
        let services = self.run_probes(critical).await;
        let ready = services
            .values()
            .all(|r| r.status == HealthStatus::Healthy);

        ReadinessReport {
            ready,
            services,
            checked_at: Utc::now(),
        }
    }

    async fn run_probes<I>(&self, probes: I) -> BTreeMap<String, HealthReport>
    where
        I: IntoIterator<Item = Arc<dyn HealthProbe>>,
    {
        let timeout = self.probe_timeout;
        join_all(probes.into_iter().map(|probe| run_probe(probe, timeout)))
            .await
            .into_iter()
            .map(|report| (report.service.clone(), report))
            .collect()
    }
}

/// Run one probe on its own task under `timeout`.
///
/// Errors, timeouts and panics all come back as an unhealthy report with
/// the cause in `details.error`.
async fn run_probe(probe: Arc<dyn HealthProbe>, timeout: Duration) -> HealthReport {
    let service = probe.name().to_string();
    let started = Instant::now();

    let mut handle = tokio::spawn(async move { probe.probe().await });
    let outcome = match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(ProbeError::Panicked(join_error.to_string())),
        Err(_) => {
            handle.abort();
            Err(ProbeError::Timeout(timeout))
        }
    };
    let response_time_ms = started.elapsed().as_secs_f64() * 1000.0;

    let (status, details) = match outcome {
        Ok(reading) => (reading.status, reading.details),
        Err(e) => {
            tracing::warn!(service = %service, error = %e, "Health probe failed");
            let mut details = HealthDetails::new();
            details.insert("error".to_string(), e.to_string().into());
            (HealthStatus::Unhealthy, details)
        }
    };

    HealthReport {
        service,
        status,
        response_time_ms,
        details,
        checked_at: Utc::now(),
    }
}
