//! Collaborators consumed by summary jobs.
//!
//! Each collaborator sits behind a trait so the job runner and the health
//! probes can be exercised against in-process doubles:
//!
//! - [`CommitFetcher`]: recent commits for a repository ([`GithubClient`])
//! - [`Summarizer`]: turns a commit set into summary text ([`DigestSummarizer`])
//! - [`SummaryRepository`]: persists generated summaries ([`InMemorySummaryStore`])

pub mod github;
pub mod summarizer;
pub mod summary_store;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::scheduler::RepositoryRef;

pub use github::{GithubClient, RateLimit};
pub use summarizer::DigestSummarizer;
pub use summary_store::InMemorySummaryStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub authored_at: DateTime<Utc>,
    pub html_url: String,
    pub additions: u64,
    pub deletions: u64,
}

impl CommitSummary {
    /// First line of the commit message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryText {
    pub title: String,
    pub content: String,
    pub key_points: Vec<String>,
    pub model: String,
    pub confidence_score: u8,
    pub commit_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummaryId(pub u64);

impl fmt::Display for SummaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSummary {
    pub id: SummaryId,
    pub repository: RepositoryRef,
    pub summary_type: String,
    #[serde(flatten)]
    pub text: SummaryText,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait CommitFetcher: Send + Sync {
    /// Commits authored at or after `since`. An empty list is a successful fetch.
    async fn fetch_commits(
        &self,
        repository: &RepositoryRef,
        since: DateTime<Utc>,
    ) -> Result<Vec<CommitSummary>, CollaboratorError>;
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    fn model_name(&self) -> &str;

    async fn summarize(
        &self,
        repository: &RepositoryRef,
        commits: &[CommitSummary],
    ) -> Result<SummaryText, CollaboratorError>;
}

#[async_trait]
pub trait SummaryRepository: Send + Sync {
    async fn persist_summary(
        &self,
        repository: &RepositoryRef,
        summary: &SummaryText,
    ) -> Result<SummaryId, CollaboratorError>;

    /// Summaries for a repository, newest first.
    async fn list_summaries(
        &self,
        repository: &RepositoryRef,
    ) -> Result<Vec<StoredSummary>, CollaboratorError>;

    async fn count(&self) -> Result<usize, CollaboratorError>;
}

/// The set of collaborators a job runner needs.
#[derive(Clone)]
pub struct Collaborators {
    pub commits: Arc<dyn CommitFetcher>,
    pub summarizer: Arc<dyn Summarizer>,
    pub summaries: Arc<dyn SummaryRepository>,
}
