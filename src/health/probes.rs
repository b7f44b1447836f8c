use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::ProbeError;
use crate::health::probe::{HealthProbe, ProbeReading};
use crate::scheduler::RepositoryRef;
use crate::services::{CommitSummary, GithubClient, Summarizer, SummaryRepository};

/// Reachability of the summary store. Critical for readiness.
pub struct SummaryStoreProbe {
    store: Arc<dyn SummaryRepository>,
}

impl SummaryStoreProbe {
    pub const NAME: &'static str = "summary_store";

    pub fn new(store: Arc<dyn SummaryRepository>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HealthProbe for SummaryStoreProbe {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_critical(&self) -> bool {
        true
    }

    async fn probe(&self) -> Result<ProbeReading, ProbeError> {
        let count = self.store.count().await?;
        Ok(ProbeReading::healthy().with_detail("summaries", count))
    }
}

/// GitHub API reachability and remaining quota.
pub struct GithubProbe {
    client: Arc<GithubClient>,
}

impl GithubProbe {
    pub const NAME: &'static str = "github_api";

    pub fn new(client: Arc<GithubClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HealthProbe for GithubProbe {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn probe(&self) -> Result<ProbeReading, ProbeError> {
        let limit = self.client.rate_limit().await?;
        // under 10% of the quota left
        let reading = if limit.remaining.saturating_mul(10) < limit.limit {
            ProbeReading::degraded()
        } else {
            ProbeReading::healthy()
        };
        Ok(reading
            .with_detail("limit", limit.limit)
            .with_detail("remaining", limit.remaining)
            .with_detail("reset_at", limit.reset_at.to_rfc3339()))
    }
}

/// Summarizes a synthetic commit to confirm the summarizer produces output.
pub struct SummarizerProbe {
    summarizer: Arc<dyn Summarizer>,
}

impl SummarizerProbe {
    pub const NAME: &'static str = "summarizer";

    pub fn new(summarizer: Arc<dyn Summarizer>) -> Self {
        Self { summarizer }
    }
}

#[async_trait]
impl HealthProbe for SummarizerProbe {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn probe(&self) -> Result<ProbeReading, ProbeError> {
        let repository = RepositoryRef::new("health", "probe")
            .map_err(|e| ProbeError::Failed(e.to_string()))?;
        let sample = CommitSummary {
            sha: "0000000".to_string(),
            message: "Health check commit".to_string(),
            author_name: "repo-monitor".to_string(),
            author_email: String::new(),
            authored_at: Utc::now(),
            html_url: String::new(),
            additions: 1,
            deletions: 0,
        };

        let summary = self
            .summarizer
            .summarize(&repository, std::slice::from_ref(&sample))
            .await?;

        let reading = if summary.content.trim().is_empty() {
            ProbeReading::unhealthy().with_detail("error", "summarizer returned empty text")
        } else {
            ProbeReading::healthy().with_detail("confidence_score", summary.confidence_score)
        };
        Ok(reading.with_detail("model", self.summarizer.model_name()))
    }
}
