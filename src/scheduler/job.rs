use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MonitorError, Result};
use crate::services::SummaryId;

/// Repository identifier in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryRef {
    owner: String,
    name: String,
}

impl RepositoryRef {
    pub fn new(owner: &str, name: &str) -> Result<Self> {
        let valid = |part: &str| {
            !part.is_empty() && !part.contains('/') && !part.chars().any(char::is_whitespace)
        };
        if !valid(owner) || !valid(name) {
            return Err(MonitorError::InvalidRepository(format!("{}/{}", owner, name)));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryRef {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((owner, name)) => Self::new(owner, name),
            None => Err(MonitorError::InvalidRepository(s.to_string())),
        }
    }
}

impl TryFrom<String> for RepositoryRef {
    type Error = MonitorError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RepositoryRef> for String {
    fn from(value: RepositoryRef) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Running => write!(f, "running"),
            JobState::Completed => write!(f, "completed"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// Sub-steps of a running job, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    FetchingCommits,
    GeneratingSummary,
    SavingSummary,
}

impl JobPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            JobPhase::FetchingCommits => "fetching_commits",
            JobPhase::GeneratingSummary => "generating_summary",
            JobPhase::SavingSummary => "saving_summary",
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution of the weekly summary workflow for a repository.
///
/// State changes go through [`start`](Self::start), [`advance`](Self::advance),
/// [`complete`](Self::complete) and [`fail`](Self::fail), which reject any
/// move that would send a job backwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub repository: RepositoryRef,
    pub state: JobState,
    pub phase: Option<JobPhase>,
    pub error: Option<String>,
    pub result: Option<SummaryId>,
    pub commit_count: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(repository: RepositoryRef) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            repository,
            state: JobState::Pending,
            phase: None,
            error: None,
            result: None,
            commit_count: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Pending -> Running, entering the first phase.
    pub fn start(&mut self) -> Result<()> {
        if self.state != JobState::Pending {
            return Err(self.invalid(JobState::Running.to_string()));
        }
        self.state = JobState::Running;
        self.phase = Some(JobPhase::FetchingCommits);
        self.touch();
        Ok(())
    }

    /// Move to a later phase. Staying in the current phase is a no-op.
    pub fn advance(&mut self, phase: JobPhase) -> Result<()> {
        if self.state != JobState::Running {
            return Err(self.invalid(phase.to_string()));
        }
        match self.phase {
            Some(current) if phase < current => return Err(self.invalid(phase.to_string())),
            Some(current) if phase == current => return Ok(()),
            _ => {}
        }
        self.phase = Some(phase);
        self.touch();
        Ok(())
    }

    pub fn complete(&mut self, result: SummaryId) -> Result<()> {
        if self.state != JobState::Running {
            return Err(self.invalid(JobState::Completed.to_string()));
        }
        self.state = JobState::Completed;
        self.result = Some(result);
        self.touch();
        Ok(())
    }

    /// Pending or Running -> Failed. The phase stays where the failure happened.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        if self.is_terminal() {
            return Err(self.invalid(JobState::Failed.to_string()));
        }
        self.state = JobState::Failed;
        self.error = Some(error.into());
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        let now = Utc::now();
        // keep updated_at monotonic even if the wall clock steps back
        self.updated_at = if now > self.updated_at { now } else { self.updated_at };
    }

    fn invalid(&self, to: String) -> MonitorError {
        let from = match self.phase {
            Some(phase) if self.state == JobState::Running => format!("running({})", phase),
            _ => self.state.to_string(),
        };
        MonitorError::InvalidTransition { from, to }
    }
}
