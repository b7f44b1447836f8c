use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::api::{self, ApiState};
use crate::config::ServerConfig;
use crate::error::{MonitorError, Result};
use crate::health::{
    GithubProbe, HealthAggregator, HealthProbe, SummarizerProbe, SummaryStoreProbe,
};
use crate::scheduler::JobManager;
use crate::services::{
    Collaborators, DigestSummarizer, GithubClient, InMemorySummaryStore, SummaryRepository,
};

/// Wires collaborators, the job manager and health checks behind the HTTP API.
pub struct App {
    pub config: ServerConfig,
    pub jobs: JobManager,
    pub health: Arc<HealthAggregator>,
    pub summaries: Arc<dyn SummaryRepository>,
}

impl App {
    /// Build the production stack: GitHub commit fetcher, digest summarizer
    /// and in-memory summary store, each with a health probe.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let github = Arc::new(GithubClient::new(&config.github)?);
        let summarizer = Arc::new(DigestSummarizer::new(&config.summarizer));
        let summaries: Arc<dyn SummaryRepository> = Arc::new(InMemorySummaryStore::new());

        let collaborators = Collaborators {
            commits: github.clone(),
            summarizer: summarizer.clone(),
            summaries: summaries.clone(),
        };
        let probes: Vec<Arc<dyn HealthProbe>> = vec![
            Arc::new(SummaryStoreProbe::new(summaries.clone())),
            Arc::new(GithubProbe::new(github)),
            Arc::new(SummarizerProbe::new(summarizer)),
        ];

        Ok(Self::with_collaborators(config, collaborators, probes))
    }

    pub fn with_collaborators(
        config: ServerConfig,
        collaborators: Collaborators,
        probes: Vec<Arc<dyn HealthProbe>>,
    ) -> Self {
        let summaries = collaborators.summaries.clone();
        let jobs = JobManager::new(&config.jobs, collaborators);
        let health = probes
            .into_iter()
            .fold(HealthAggregator::new(&config.health), |agg, probe| {
                agg.with_probe(probe)
            });

        Self {
            config,
            jobs,
            health: Arc::new(health),
            summaries,
        }
    }

    pub fn router(&self) -> Router {
        api::router(ApiState {
            jobs: self.jobs.clone(),
            health: self.health.clone(),
            summaries: self.summaries.clone(),
        })
    }

    /// Bind the configured address and serve until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let listener = TcpListener::bind(self.config.listen_addr)
            .await
            .map_err(|e| {
                MonitorError::Internal(format!("failed to bind {}: {}", self.config.listen_addr, e))
            })?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener. Runs the finished-job pruning task
    /// alongside the server and drains running jobs on shutdown.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        let addr: Option<SocketAddr> = listener.local_addr().ok();
        tracing::info!(
            addr = ?addr,
            services = ?self.health.service_names(),
            "Starting repo-monitor HTTP server"
        );

        let prune_jobs = self.jobs.clone();
        let prune_token = shutdown.clone();
        let retention = self.config.jobs.retention;
        let prune_interval = self.config.jobs.prune_interval;
        tokio::spawn(async move {
            Self::prune_loop(prune_jobs, retention, prune_interval, prune_token).await;
        });

        let server_token = shutdown.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { server_token.cancelled().await })
            .await
            .map_err(|e| MonitorError::Internal(format!("HTTP server failed: {}", e)))?;

        let drained = self.jobs.shutdown(self.config.jobs.shutdown_grace).await;
        tracing::info!(drained, "repo-monitor stopped");
        Ok(())
    }

    async fn prune_loop(
        jobs: JobManager,
        retention: std::time::Duration,
        every: std::time::Duration,
        shutdown: CancellationToken,
    ) {
        let mut interval = tokio::time::interval(every);
        // first tick fires immediately; nothing to prune at startup
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    jobs.prune_finished(retention).await;
                }
            }
        }
    }
}
