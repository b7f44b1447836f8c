//! Shared doubles for repo-monitor integration tests.
//!
//! Collaborators can be gated on a semaphore so a test can hold a job in a
//! given phase, observe it, then release it step by step.

#![allow(dead_code)]

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use uuid::Uuid;

use repo_monitor::config::{HealthConfig, JobConfig, ServerConfig};
use repo_monitor::error::{CollaboratorError, ProbeError};
use repo_monitor::health::{HealthProbe, HealthStatus, ProbeReading};
use repo_monitor::scheduler::{JobManager, JobRecord, RepositoryRef};
use repo_monitor::services::{
    Collaborators, CommitFetcher, CommitSummary, InMemorySummaryStore, StoredSummary, Summarizer,
    SummaryId, SummaryRepository, SummaryText,
};

pub fn repo(s: &str) -> RepositoryRef {
    s.parse().unwrap()
}

pub fn commit(sha: &str, message: &str) -> CommitSummary {
    CommitSummary {
        sha: sha.to_string(),
        message: message.to_string(),
        author_name: "Dev".to_string(),
        author_email: "dev@example.com".to_string(),
        authored_at: Utc::now(),
        html_url: format!("https://github.com/acme/demo/commit/{}", sha),
        additions: 10,
        deletions: 2,
    }
}

/// A closed gate: every gated call blocks until [`Gate::release`] or [`Gate::open`].
#[derive(Clone)]
pub struct Gate(Arc<Semaphore>);

impl Gate {
    pub fn new() -> Self {
        Gate(Arc::new(Semaphore::new(0)))
    }

    /// Let one waiting call through.
    pub fn release(&self) {
        self.0.add_permits(1);
    }

    /// Let every call through from now on.
    pub fn open(&self) {
        self.0.add_permits(1 << 20);
    }

    async fn pass(&self) {
        self.0.acquire().await.unwrap().forget();
    }
}

async fn pass_gate(gate: &Option<Gate>) {
    if let Some(gate) = gate {
        gate.pass().await;
    }
}

// =============================================================================
// Collaborators
// =============================================================================

pub struct MockFetcher {
    commits: Vec<CommitSummary>,
    error: Option<String>,
    gate: Option<Gate>,
    calls: Mutex<Vec<(RepositoryRef, DateTime<Utc>)>>,
}

impl MockFetcher {
    pub fn returning(commits: Vec<CommitSummary>) -> Self {
        Self {
            commits,
            error: None,
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::returning(Vec::new())
        }
    }

    pub fn gated(mut self, gate: &Gate) -> Self {
        self.gate = Some(gate.clone());
        self
    }

    pub fn calls(&self) -> Vec<(RepositoryRef, DateTime<Utc>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommitFetcher for MockFetcher {
    async fn fetch_commits(
        &self,
        repository: &RepositoryRef,
        since: DateTime<Utc>,
    ) -> Result<Vec<CommitSummary>, CollaboratorError> {
        pass_gate(&self.gate).await;
        self.calls
            .lock()
            .unwrap()
            .push((repository.clone(), since));
        match &self.error {
            Some(message) => Err(CollaboratorError::Api {
                status: 502,
                message: message.clone(),
            }),
            None => Ok(self.commits.clone()),
        }
    }
}

pub struct MockSummarizer {
    error: Option<String>,
    panics: bool,
    gate: Option<Gate>,
}

impl MockSummarizer {
    pub fn ok() -> Self {
        Self {
            error: None,
            panics: false,
            gate: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::ok()
        }
    }

    /// Panics inside `summarize` instead of returning.
    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::ok()
        }
    }

    pub fn gated(mut self, gate: &Gate) -> Self {
        self.gate = Some(gate.clone());
        self
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn summarize(
        &self,
        repository: &RepositoryRef,
        commits: &[CommitSummary],
    ) -> Result<SummaryText, CollaboratorError> {
        pass_gate(&self.gate).await;
        if self.panics {
            panic!("summarizer crashed on {} commits", commits.len());
        }
        if let Some(message) = &self.error {
            return Err(CollaboratorError::Summarizer(message.clone()));
        }
        Ok(SummaryText {
            title: format!("Weekly summary for {}", repository),
            content: format!("{} commits", commits.len()),
            key_points: commits.iter().map(|c| c.subject().to_string()).collect(),
            model: "mock-model".to_string(),
            confidence_score: 80,
            commit_count: commits.len(),
        })
    }
}

/// In-memory summary store with an optional failure and gate in front of writes.
pub struct MockSummaryStore {
    inner: InMemorySummaryStore,
    error: Option<String>,
    gate: Option<Gate>,
}

impl MockSummaryStore {
    pub fn ok() -> Self {
        Self {
            inner: InMemorySummaryStore::new(),
            error: None,
            gate: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::ok()
        }
    }

    pub fn gated(mut self, gate: &Gate) -> Self {
        self.gate = Some(gate.clone());
        self
    }
}

#[async_trait]
impl SummaryRepository for MockSummaryStore {
    async fn persist_summary(
        &self,
        repository: &RepositoryRef,
        summary: &SummaryText,
    ) -> Result<SummaryId, CollaboratorError> {
        pass_gate(&self.gate).await;
        if let Some(message) = &self.error {
            return Err(CollaboratorError::Persistence(message.clone()));
        }
        self.inner.persist_summary(repository, summary).await
    }

    async fn list_summaries(
        &self,
        repository: &RepositoryRef,
    ) -> Result<Vec<StoredSummary>, CollaboratorError> {
        self.inner.list_summaries(repository).await
    }

    async fn count(&self) -> Result<usize, CollaboratorError> {
        if let Some(message) = &self.error {
            return Err(CollaboratorError::Persistence(message.clone()));
        }
        self.inner.count().await
    }
}

pub struct TestCollaborators {
    pub fetcher: Arc<MockFetcher>,
    pub summarizer: Arc<MockSummarizer>,
    pub store: Arc<MockSummaryStore>,
}

impl TestCollaborators {
    pub fn new(fetcher: MockFetcher, summarizer: MockSummarizer, store: MockSummaryStore) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            summarizer: Arc::new(summarizer),
            store: Arc::new(store),
        }
    }

    /// Everything succeeds immediately with two commits.
    pub fn happy() -> Self {
        Self::new(
            MockFetcher::returning(vec![
                commit("aaa1111", "Add weekly digest"),
                commit("bbb2222", "Fix pagination"),
            ]),
            MockSummarizer::ok(),
            MockSummaryStore::ok(),
        )
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            commits: self.fetcher.clone(),
            summarizer: self.summarizer.clone(),
            summaries: self.store.clone(),
        }
    }
}

pub fn test_job_config() -> JobConfig {
    JobConfig {
        shutdown_grace: Duration::from_secs(2),
        ..JobConfig::default()
    }
}

pub fn test_server_config() -> ServerConfig {
    ServerConfig {
        health: HealthConfig {
            probe_timeout: Duration::from_millis(200),
            version: "test".to_string(),
        },
        jobs: test_job_config(),
        ..ServerConfig::default()
    }
}

pub fn manager(collaborators: &TestCollaborators) -> JobManager {
    JobManager::new(&test_job_config(), collaborators.collaborators())
}

// =============================================================================
// Polling helpers
// =============================================================================

/// Poll `check` every 10ms until it returns true or `timeout` passes.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

pub async fn wait_for_terminal(manager: &JobManager, job_id: Uuid) -> JobRecord {
    let finished = wait_until(Duration::from_secs(5), || async move {
        manager.get_status(job_id).await.unwrap().is_terminal()
    })
    .await;
    assert!(finished, "job {} did not finish in time", job_id);
    manager.get_status(job_id).await.unwrap()
}

// =============================================================================
// Probes
// =============================================================================

pub struct StaticProbe {
    name: String,
    status: HealthStatus,
    delay: Duration,
    critical: bool,
}

impl StaticProbe {
    pub fn new(name: &str, status: HealthStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
            delay: Duration::ZERO,
            critical: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}

#[async_trait]
impl HealthProbe for StaticProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_critical(&self) -> bool {
        self.critical
    }

    async fn probe(&self) -> Result<ProbeReading, ProbeError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(ProbeReading::new(self.status).with_detail("probe", self.name.as_str()))
    }
}

pub struct FailingProbe {
    name: String,
    message: String,
}

impl FailingProbe {
    pub fn new(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl HealthProbe for FailingProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<ProbeReading, ProbeError> {
        Err(ProbeError::Failed(self.message.clone()))
    }
}

pub struct PanickingProbe {
    name: String,
}

impl PanickingProbe {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl HealthProbe for PanickingProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<ProbeReading, ProbeError> {
        panic!("probe exploded");
    }
}
