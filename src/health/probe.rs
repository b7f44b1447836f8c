use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

/// Diagnostic key/value pairs attached to a probe result.
pub type HealthDetails = BTreeMap<String, serde_json::Value>;

/// Service status, ordered by severity: `Healthy < Degraded < Unhealthy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Most severe status in `statuses`; `Healthy` when empty.
    pub fn worst<I>(statuses: I) -> HealthStatus
    where
        I: IntoIterator<Item = HealthStatus>,
    {
        statuses.into_iter().max().unwrap_or(HealthStatus::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// What a probe observed. Timing is added by the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReading {
    pub status: HealthStatus,
    pub details: HealthDetails,
}

impl ProbeReading {
    pub fn new(status: HealthStatus) -> Self {
        Self {
            status,
            details: HealthDetails::new(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(HealthStatus::Healthy)
    }

    pub fn degraded() -> Self {
        Self::new(HealthStatus::Degraded)
    }

    pub fn unhealthy() -> Self {
        Self::new(HealthStatus::Unhealthy)
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// A single dependency check.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Service name used as the key in composite reports.
    fn name(&self) -> &str;

    /// Critical probes gate readiness.
    fn is_critical(&self) -> bool {
        false
    }

    async fn probe(&self) -> Result<ProbeReading, ProbeError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub service: String,
    pub status: HealthStatus,
    pub response_time_ms: f64,
    pub details: HealthDetails,
    pub checked_at: DateTime<Utc>,
}

/// Worst-of reduction over every registered probe. Built per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeHealth {
    pub status: HealthStatus,
    pub services: BTreeMap<String, HealthReport>,
    pub checked_at: DateTime<Utc>,
    pub uptime_seconds: f64,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessReport {
    pub ready: bool,
    pub services: BTreeMap<String, HealthReport>,
    pub checked_at: DateTime<Utc>,
}
