use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{MonitorError, Result};
use crate::scheduler::job::{JobRecord, RepositoryRef};

const DEFAULT_MAX_JOBS: usize = 10_000;

/// Outcome of an admission attempt against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A new pending record was inserted.
    Admitted(Uuid),
    /// A non-terminal record already exists for the repository.
    InFlight(Uuid),
}

/// In-memory table of the latest job per repository.
///
/// Records are only ever read or written whole. A job id index lets callers
/// look records up by id; ids of superseded records are dropped with them.
#[derive(Debug)]
pub struct JobStore {
    jobs: HashMap<RepositoryRef, JobRecord>,
    by_id: HashMap<Uuid, RepositoryRef>,
    max_jobs: usize,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_JOBS)
    }

    pub fn with_capacity(max_jobs: usize) -> Self {
        Self {
            jobs: HashMap::new(),
            by_id: HashMap::new(),
            max_jobs,
        }
    }

    /// Check-and-insert in one step: returns the in-flight job if there is
    /// one, otherwise replaces any terminal record with a fresh pending job.
    pub fn admit(&mut self, repository: &RepositoryRef) -> Result<Admission> {
        if let Some(existing) = self.jobs.get(repository) {
            if !existing.is_terminal() {
                return Ok(Admission::InFlight(existing.id));
            }
        } else if self.jobs.len() >= self.max_jobs {
            return Err(MonitorError::StoreFull);
        }

        let record = JobRecord::new(repository.clone());
        let id = record.id;
        if let Some(previous) = self.jobs.insert(repository.clone(), record) {
            self.by_id.remove(&previous.id);
        }
        self.by_id.insert(id, repository.clone());
        Ok(Admission::Admitted(id))
    }

    /// Get a job by ID
    pub fn get(&self, id: &Uuid) -> Option<&JobRecord> {
        self.by_id
            .get(id)
            .and_then(|repo| self.jobs.get(repo))
            .filter(|job| job.id == *id)
    }

    /// Latest job for a repository, terminal or not
    pub fn latest(&self, repository: &RepositoryRef) -> Option<&JobRecord> {
        self.jobs.get(repository)
    }

    /// Replace the stored record with `record`. Only the record with the same
    /// job id may be replaced; returns false if it has been superseded.
    pub fn replace(&mut self, record: JobRecord) -> bool {
        match self.jobs.get_mut(&record.repository) {
            Some(current) if current.id == record.id => {
                *current = record;
                true
            }
            _ => false,
        }
    }

    /// Get all jobs sorted chronologically by creation time
    pub fn all_jobs(&self) -> Vec<&JobRecord> {
        let mut jobs: Vec<&JobRecord> = self.jobs.values().collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }

    pub fn in_flight(&self) -> Vec<&JobRecord> {
        self.jobs.values().filter(|j| !j.is_terminal()).collect()
    }

    /// Remove terminal jobs last updated before `cutoff`. Returns the number removed.
    pub fn prune_finished(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.jobs.len();
        let by_id = &mut self.by_id;
        self.jobs.retain(|_, job| {
            let keep = !job.is_terminal() || job.updated_at >= cutoff;
            if !keep {
                by_id.remove(&job.id);
            }
            keep
        });
        before - self.jobs.len()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.jobs.len() >= self.max_jobs
    }
}
