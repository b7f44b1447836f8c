//! HTTP client for a running repo-monitor server.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::api::{GenerateResponse, HealthResponse, JobStatusView, ServiceHealthResponse};
use crate::config::PollConfig;
use crate::error::ClientError;
use crate::scheduler::RepositoryRef;

#[derive(Debug, Clone)]
pub struct MonitorClient {
    http: reqwest::Client,
    base_url: String,
}

impl MonitorClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn summaries_url(&self, repository: &RepositoryRef, action: &str) -> String {
        format!(
            "{}/repositories/{}/{}/summaries/{}",
            self.base_url,
            repository.owner(),
            repository.name(),
            action
        )
    }

    pub async fn generate_weekly(
        &self,
        repository: &RepositoryRef,
    ) -> Result<GenerateResponse, ClientError> {
        let url = self.summaries_url(repository, "generate-weekly");
        let response = self.http.post(&url).send().await?;
        Self::decode(response, &[]).await
    }

    pub async fn weekly_status(
        &self,
        repository: &RepositoryRef,
    ) -> Result<JobStatusView, ClientError> {
        let url = self.summaries_url(repository, "weekly-status");
        let response = self.http.get(&url).send().await?;
        Self::decode(response, &[]).await
    }

    /// Composite health. A 503 still carries a full report.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = format!("{}/health", self.base_url);
        let response = self.http.get(&url).send().await?;
        Self::decode(response, &[StatusCode::SERVICE_UNAVAILABLE]).await
    }

    pub async fn service_health(&self, service: &str) -> Result<ServiceHealthResponse, ClientError> {
        let url = format!("{}/health/{}", self.base_url, service);
        let response = self.http.get(&url).send().await?;
        Self::decode(response, &[]).await
    }

    /// Poll weekly-status until the job is terminal or `poll.max_attempts`
    /// checks have been made. `on_update` sees every observed status.
    ///
    /// Giving up does not cancel the job; it keeps running on the server and
    /// a later status check will pick up its result.
    pub async fn wait_for_completion<F>(
        &self,
        repository: &RepositoryRef,
        poll: &PollConfig,
        mut on_update: F,
    ) -> Result<JobStatusView, ClientError>
    where
        F: FnMut(&JobStatusView),
    {
        for attempt in 1..=poll.max_attempts {
            let view = self.weekly_status(repository).await?;
            on_update(&view);
            if view.status.is_terminal() {
                return Ok(view);
            }
            tracing::debug!(
                repository = %repository,
                attempt,
                status = ?view.status,
                "Summary job not finished yet"
            );
            if attempt < poll.max_attempts {
                tokio::time::sleep(poll.interval).await;
            }
        }

        Err(ClientError::PollTimeout {
            attempts: poll.max_attempts,
        })
    }

    async fn decode<T: DeserializeOwned>(
        response: Response,
        also_ok: &[StatusCode],
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() || also_ok.contains(&status) {
            return Ok(response.json().await?);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
