//! HTTP surface for summary jobs and health checks.

pub mod views;

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::MonitorError;
use crate::health::{HealthAggregator, HealthStatus};
use crate::scheduler::{JobManager, RepositoryRef};
use crate::services::{StoredSummary, SummaryRepository};

pub use views::{
    ErrorResponse, GenerateResponse, HealthResponse, JobStatusView, LivenessResponse,
    ReadinessResponse, ServiceHealthResponse, ServiceHealthView, WireJobStatus,
};

#[derive(Clone)]
pub struct ApiState {
    pub jobs: JobManager,
    pub health: Arc<HealthAggregator>,
    pub summaries: Arc<dyn SummaryRepository>,
}

/// Maps [`MonitorError`] onto an HTTP status and `{"error": ..}` body.
#[derive(Debug)]
pub struct ApiError(MonitorError);

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            MonitorError::JobNotFound(_)
            | MonitorError::NoJobForRepository(_)
            | MonitorError::ServiceNotFound(_) => StatusCode::NOT_FOUND,
            MonitorError::InvalidRepository(_) => StatusCode::BAD_REQUEST,
            MonitorError::StoreFull | MonitorError::Draining => StatusCode::SERVICE_UNAVAILABLE,
            MonitorError::Collaborator(_) => StatusCode::BAD_GATEWAY,
            MonitorError::InvalidTransition { .. } | MonitorError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/repositories/:owner/:name/summaries/generate-weekly",
            post(generate_weekly_handler),
        )
        .route(
            "/repositories/:owner/:name/summaries/weekly-status",
            get(weekly_status_handler),
        )
        .route(
            "/repositories/:owner/:name/summaries",
            get(list_summaries_handler),
        )
        .route("/jobs", get(list_jobs_handler))
        .route("/jobs/:job_id", get(job_status_handler))
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/health/:service", get(service_health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn generate_weekly_handler(
    State(state): State<ApiState>,
    Path((owner, name)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let repository = RepositoryRef::new(&owner, &name)?;
    let outcome = state.jobs.start_job(repository.clone()).await?;
    let status = if outcome.accepted {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(GenerateResponse::new(outcome, repository))))
}

async fn weekly_status_handler(
    State(state): State<ApiState>,
    Path((owner, name)): Path<(String, String)>,
) -> ApiResult<Json<JobStatusView>> {
    let repository = RepositoryRef::new(&owner, &name)?;
    let job = state.jobs.latest_for_repository(&repository).await?;
    Ok(Json(JobStatusView::from(&job)))
}

async fn list_summaries_handler(
    State(state): State<ApiState>,
    Path((owner, name)): Path<(String, String)>,
) -> ApiResult<Json<Vec<StoredSummary>>> {
    let repository = RepositoryRef::new(&owner, &name)?;
    let summaries = state
        .summaries
        .list_summaries(&repository)
        .await
        .map_err(MonitorError::from)?;
    Ok(Json(summaries))
}

async fn list_jobs_handler(State(state): State<ApiState>) -> Json<Vec<JobStatusView>> {
    let jobs = state.jobs.list_jobs().await;
    Json(jobs.iter().map(JobStatusView::from).collect())
}

async fn job_status_handler(
    State(state): State<ApiState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobStatusView>> {
    let job = state.jobs.get_status(job_id).await?;
    Ok(Json(JobStatusView::from(&job)))
}

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let health = state.health.check_all().await;
    let status = if health.status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(HealthResponse::from(&health)))
}

async fn service_health_handler(
    State(state): State<ApiState>,
    Path(service): Path<String>,
) -> ApiResult<Json<ServiceHealthResponse>> {
    let report = state.health.check_one(&service).await?;
    Ok(Json(ServiceHealthResponse::from(&report)))
}

async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

async fn readiness_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let mut report = state.health.check_ready().await;
    if state.jobs.is_draining() {
        report.ready = false;
    }
    let status = if report.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(ReadinessResponse::from(&report)))
}
