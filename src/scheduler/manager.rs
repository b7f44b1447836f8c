use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::config::JobConfig;
use crate::error::{MonitorError, Result};
use crate::scheduler::job::{JobRecord, RepositoryRef};
use crate::scheduler::store::{Admission, JobStore};
use crate::services::Collaborators;
use crate::worker::JobRunner;

/// Result of asking for a new job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartOutcome {
    pub job_id: Uuid,
    /// False when a job for the repository was already in flight; `job_id`
    /// is then that job's id and nothing new was scheduled.
    pub accepted: bool,
}

/// Entry point for summary jobs: admission, scheduling and status reads.
#[derive(Clone)]
pub struct JobManager {
    store: Arc<RwLock<JobStore>>,
    runner: Arc<JobRunner>,
    tracker: TaskTracker,
    draining: Arc<AtomicBool>,
}

impl JobManager {
    pub fn new(config: &JobConfig, collaborators: Collaborators) -> Self {
        let store = Arc::new(RwLock::new(JobStore::with_capacity(config.max_jobs)));
        let lookback = chrono::Duration::days(i64::from(config.lookback_days));
        let runner = Arc::new(JobRunner::new(store.clone(), collaborators, lookback));
        Self {
            store,
            runner,
            tracker: TaskTracker::new(),
            draining: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a weekly summary job for `repository` unless one is in flight.
    ///
    /// Returns as soon as the job is recorded; the work runs on a background task.
    pub async fn start_job(&self, repository: RepositoryRef) -> Result<StartOutcome> {
        // Draining is checked and the runner spawned under the store write
        // lock, which `shutdown` also takes to set the flag. A job is either
        // rejected or tracked before the tracker is closed.
        let mut store = self.store.write().await;
        if self.draining.load(Ordering::SeqCst) {
            return Err(MonitorError::Draining);
        }

        let admission = store.admit(&repository)?;
        match admission {
            Admission::InFlight(job_id) => {
                tracing::info!(
                    job_id = %job_id,
                    repository = %repository,
                    "Summary job already in flight"
                );
                Ok(StartOutcome {
                    job_id,
                    accepted: false,
                })
            }
            Admission::Admitted(job_id) => {
                tracing::info!(job_id = %job_id, repository = %repository, "Summary job accepted");
                let runner = self.runner.clone();
                self.tracker.spawn(async move {
                    if let Err(e) = runner.run(job_id).await {
                        tracing::error!(job_id = %job_id, error = %e, "Summary job aborted");
                    }
                });
                Ok(StartOutcome {
                    job_id,
                    accepted: true,
                })
            }
        }
    }

    pub async fn get_status(&self, job_id: Uuid) -> Result<JobRecord> {
        self.store
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or(MonitorError::JobNotFound(job_id))
    }

    pub async fn latest_for_repository(&self, repository: &RepositoryRef) -> Result<JobRecord> {
        self.store
            .read()
            .await
            .latest(repository)
            .cloned()
            .ok_or_else(|| MonitorError::NoJobForRepository(repository.to_string()))
    }

    pub async fn list_jobs(&self) -> Vec<JobRecord> {
        self.store
            .read()
            .await
            .all_jobs()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Drop finished jobs not updated within `older_than`.
    pub async fn prune_finished(&self, older_than: Duration) -> usize {
        let retention = chrono::Duration::from_std(older_than).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(retention)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        let removed = self.store.write().await.prune_finished(cutoff);
        if removed > 0 {
            tracing::info!(removed, "Pruned finished summary jobs");
        }
        removed
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Stop admitting jobs and wait up to `grace` for running ones.
    ///
    /// Returns false if jobs were still running when the grace period ended;
    /// those jobs are lost with the process.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        let in_flight = {
            let store = self.store.write().await;
            self.draining.store(true, Ordering::SeqCst);
            self.tracker.close();
            store.in_flight().len()
        };
        tracing::info!(in_flight, "Waiting for summary jobs to finish");

        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                let abandoned = self.store.read().await.in_flight().len();
                tracing::warn!(abandoned, "Shutdown grace period elapsed with jobs still running");
                false
            }
        }
    }
}
