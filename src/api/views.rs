use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::health::{CompositeHealth, HealthDetails, HealthReport, HealthStatus, ReadinessReport};
use crate::scheduler::{JobPhase, JobRecord, JobState, RepositoryRef, StartOutcome};
use crate::services::SummaryId;

/// Job status as polling clients see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireJobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl WireJobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, WireJobStatus::Completed | WireJobStatus::Failed)
    }
}

impl From<JobState> for WireJobStatus {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Pending => WireJobStatus::Pending,
            JobState::Running => WireJobStatus::InProgress,
            JobState::Completed => WireJobStatus::Completed,
            JobState::Failed => WireJobStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub job_id: Uuid,
    pub accepted: bool,
    pub repository: RepositoryRef,
}

impl GenerateResponse {
    pub fn new(outcome: StartOutcome, repository: RepositoryRef) -> Self {
        Self {
            job_id: outcome.job_id,
            accepted: outcome.accepted,
            repository,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusView {
    pub job_id: Uuid,
    pub repository: RepositoryRef,
    pub status: WireJobStatus,
    /// Phase label while running, error text when failed.
    pub message: String,
    pub phase: Option<JobPhase>,
    pub result: Option<SummaryId>,
    pub commit_count: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&JobRecord> for JobStatusView {
    fn from(job: &JobRecord) -> Self {
        let message = match job.state {
            JobState::Pending => "queued".to_string(),
            JobState::Running => job
                .phase
                .map(|p| p.as_str().to_string())
                .unwrap_or_else(|| "running".to_string()),
            JobState::Completed => "completed".to_string(),
            JobState::Failed => job
                .error
                .clone()
                .unwrap_or_else(|| "failed".to_string()),
        };

        Self {
            job_id: job.id,
            repository: job.repository.clone(),
            status: job.state.into(),
            message,
            phase: job.phase,
            result: job.result,
            commit_count: job.commit_count,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealthView {
    pub status: HealthStatus,
    /// Milliseconds
    pub response_time: f64,
    pub details: HealthDetails,
}

impl From<&HealthReport> for ServiceHealthView {
    fn from(report: &HealthReport) -> Self {
        Self {
            status: report.status,
            response_time: report.response_time_ms,
            details: report.details.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub services: BTreeMap<String, ServiceHealthView>,
    /// Seconds since startup
    pub uptime: f64,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl From<&CompositeHealth> for HealthResponse {
    fn from(health: &CompositeHealth) -> Self {
        Self {
            status: health.status,
            services: health
                .services
                .iter()
                .map(|(name, report)| (name.clone(), ServiceHealthView::from(report)))
                .collect(),
            uptime: health.uptime_seconds,
            timestamp: health.checked_at,
            version: health.version.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealthResponse {
    pub service: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub health: ServiceHealthView,
}

impl From<&HealthReport> for ServiceHealthResponse {
    fn from(report: &HealthReport) -> Self {
        Self {
            service: report.service.clone(),
            timestamp: report.checked_at,
            health: ServiceHealthView::from(report),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub services: BTreeMap<String, ServiceHealthView>,
}

impl From<&ReadinessReport> for ReadinessResponse {
    fn from(report: &ReadinessReport) -> Self {
        Self {
            status: if report.ready { "ready" } else { "not_ready" }.to_string(),
            timestamp: report.checked_at,
            services: report
                .services
                .iter()
                .map(|(name, r)| (name.clone(), ServiceHealthView::from(r)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
