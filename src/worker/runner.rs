use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::FutureExt;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{CollaboratorError, MonitorError, Result};
use crate::scheduler::{JobPhase, JobRecord, JobStore};
use crate::services::{Collaborators, SummaryId};

/// Drives one weekly summary job through its phases.
///
/// The runner works on a private copy of the job record and publishes it to
/// the store as a whole after every transition, so readers only ever see
/// complete records. The store lock is never held across a collaborator call.
pub struct JobRunner {
    store: Arc<RwLock<JobStore>>,
    collaborators: Collaborators,
    lookback: Duration,
}

impl JobRunner {
    pub fn new(
        store: Arc<RwLock<JobStore>>,
        collaborators: Collaborators,
        lookback: Duration,
    ) -> Self {
        Self {
            store,
            collaborators,
            lookback,
        }
    }

    /// Run the job to completion or failure and return its final record.
    ///
    /// Collaborator failures end the job as `Failed` and are not returned as
    /// errors. An error here means the job could not be tracked at all.
    pub async fn run(&self, job_id: Uuid) -> Result<JobRecord> {
        let mut record = self
            .store
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or(MonitorError::JobNotFound(job_id))?;

        let started_at = Utc::now();
        record.start()?;
        self.publish(&record).await?;
        tracing::info!(job_id = %job_id, repository = %record.repository, "Summary job started");

        match self.execute(&mut record, started_at).await {
            Ok(summary_id) => {
                record.complete(summary_id)?;
                tracing::info!(
                    job_id = %job_id,
                    repository = %record.repository,
                    summary_id = %summary_id,
                    "Summary job completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    job_id = %job_id,
                    repository = %record.repository,
                    phase = ?record.phase,
                    error = %e,
                    "Summary job failed"
                );
                record.fail(e.to_string())?;
            }
        }

        self.publish(&record).await?;
        Ok(record)
    }

    async fn execute(
        &self,
        record: &mut JobRecord,
        started_at: DateTime<Utc>,
    ) -> Result<SummaryId> {
        let repository = record.repository.clone();

        let since = started_at - self.lookback;
        let commits = guarded(
            JobPhase::FetchingCommits,
            self.collaborators.commits.fetch_commits(&repository, since),
        )
        .await?;
        record.commit_count = Some(commits.len());

        self.enter(record, JobPhase::GeneratingSummary).await?;
        let summary = guarded(
            JobPhase::GeneratingSummary,
            self.collaborators.summarizer.summarize(&repository, &commits),
        )
        .await?;

        self.enter(record, JobPhase::SavingSummary).await?;
        let summary_id = guarded(
            JobPhase::SavingSummary,
            self.collaborators
                .summaries
                .persist_summary(&repository, &summary),
        )
        .await?;

        Ok(summary_id)
    }

    async fn enter(&self, record: &mut JobRecord, phase: JobPhase) -> Result<()> {
        record.advance(phase)?;
        self.publish(record).await?;
        tracing::debug!(job_id = %record.id, phase = %phase, "Summary job advanced");
        Ok(())
    }

    /// Replace the stored record with our copy.
    async fn publish(&self, record: &JobRecord) -> Result<()> {
        if self.store.write().await.replace(record.clone()) {
            Ok(())
        } else {
            Err(MonitorError::Internal(format!(
                "job {} is no longer the latest for {}",
                record.id, record.repository
            )))
        }
    }
}

/// Await one collaborator call. A panic inside the collaborator becomes a
/// [`CollaboratorError::Panicked`] so the job still fails through `run`.
async fn guarded<T, F>(phase: JobPhase, call: F) -> std::result::Result<T, CollaboratorError>
where
    F: Future<Output = std::result::Result<T, CollaboratorError>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(CollaboratorError::Panicked {
            phase: phase.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
