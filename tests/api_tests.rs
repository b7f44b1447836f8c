mod test_harness;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use repo_monitor::app::App;
use repo_monitor::health::{HealthProbe, HealthStatus, SummaryStoreProbe};
use test_harness::*;

fn test_app(collab: &TestCollaborators, probes: Vec<Arc<dyn HealthProbe>>) -> App {
    App::with_collaborators(test_server_config(), collab.collaborators(), probes)
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri).await
}

async fn post(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::POST, uri).await
}

const GENERATE: &str = "/repositories/acme/demo/summaries/generate-weekly";
const STATUS: &str = "/repositories/acme/demo/summaries/weekly-status";

#[tokio::test]
async fn test_generate_then_duplicate_returns_same_job() {
    let gate = Gate::new();
    let collab = TestCollaborators::new(
        MockFetcher::returning(vec![commit("aaa", "one")]).gated(&gate),
        MockSummarizer::ok(),
        MockSummaryStore::ok(),
    );
    let app = test_app(&collab, vec![]);
    let router = app.router();

    let (status, first) = post(&router, GENERATE).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(first["accepted"], true);
    assert_eq!(first["repository"], "acme/demo");

    let (status, second) = post(&router, GENERATE).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["accepted"], false);
    assert_eq!(second["job_id"], first["job_id"]);

    let (status, view) = get(&router, STATUS).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["job_id"], first["job_id"]);
    assert!(
        view["status"] == "pending" || view["status"] == "in_progress",
        "unexpected status {}",
        view["status"]
    );

    gate.open();
}

#[tokio::test]
async fn test_weekly_status_reports_completion_and_summary() {
    let collab = TestCollaborators::happy();
    let app = test_app(&collab, vec![]);
    let router = app.router();

    let (_, started) = post(&router, GENERATE).await;
    let job_id: uuid::Uuid = serde_json::from_value(started["job_id"].clone()).unwrap();
    wait_for_terminal(&app.jobs, job_id).await;

    let (status, view) = get(&router, STATUS).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"], "completed");
    assert_eq!(view["message"], "completed");
    assert_eq!(view["phase"], "saving_summary");
    assert_eq!(view["result"], 1);
    assert_eq!(view["commit_count"], 2);

    let (status, by_id) = get(&router, &format!("/jobs/{}", job_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_id["job_id"], view["job_id"]);

    let (status, summaries) = get(&router, "/repositories/acme/demo/summaries").await;
    assert_eq!(status, StatusCode::OK);
    let summaries = summaries.as_array().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0]["id"], 1);
    assert_eq!(summaries[0]["summary_type"], "weekly");
    assert_eq!(summaries[0]["commit_count"], 2);

    let (status, jobs) = get(&router, "/jobs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(jobs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_job_reports_error_message() {
    let collab = TestCollaborators::new(
        MockFetcher::failing("upstream exploded"),
        MockSummarizer::ok(),
        MockSummaryStore::ok(),
    );
    let app = test_app(&collab, vec![]);
    let router = app.router();

    let (_, started) = post(&router, GENERATE).await;
    let job_id: uuid::Uuid = serde_json::from_value(started["job_id"].clone()).unwrap();
    wait_for_terminal(&app.jobs, job_id).await;

    let (status, view) = get(&router, STATUS).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"], "failed");
    assert_eq!(view["phase"], "fetching_commits");
    assert!(view["message"]
        .as_str()
        .unwrap()
        .contains("upstream exploded"));
    assert!(view["result"].is_null());
}

#[tokio::test]
async fn test_not_found_responses() {
    let collab = TestCollaborators::happy();
    let app = test_app(&collab, vec![]);
    let router = app.router();

    let (status, body) = get(&router, STATUS).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("acme/demo"));

    let (status, _) = get(&router, &format!("/jobs/{}", uuid::Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&router, "/health/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_repository_is_bad_request() {
    let collab = TestCollaborators::happy();
    let app = test_app(&collab, vec![]);
    let router = app.router();

    let (status, body) = post(
        &router,
        "/repositories/acme/bad%20name/summaries/generate-weekly",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid repository"));
    assert!(app.jobs.list_jobs().await.is_empty());
}

#[tokio::test]
async fn test_health_is_503_when_a_service_is_unhealthy() {
    let collab = TestCollaborators::happy();
    let probes: Vec<Arc<dyn HealthProbe>> = vec![
        Arc::new(StaticProbe::new("database", HealthStatus::Healthy)),
        Arc::new(StaticProbe::new("github_api", HealthStatus::Healthy)),
        Arc::new(
            StaticProbe::new("summarizer", HealthStatus::Healthy)
                .with_delay(Duration::from_secs(10)),
        ),
    ];
    let app = test_app(&collab, probes);
    let router = app.router();

    let (status, health) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
    assert_eq!(health["version"], "test");
    assert_eq!(health["services"]["database"]["status"], "healthy");
    assert_eq!(health["services"]["summarizer"]["status"], "unhealthy");
    assert!(health["services"]["summarizer"]["details"]["error"]
        .as_str()
        .unwrap()
        .contains("timed out"));
    assert!(health["uptime"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_health_is_200_when_degraded() {
    let collab = TestCollaborators::happy();
    let probes: Vec<Arc<dyn HealthProbe>> = vec![
        Arc::new(StaticProbe::new("database", HealthStatus::Healthy)),
        Arc::new(StaticProbe::new("github_api", HealthStatus::Degraded)),
    ];
    let app = test_app(&collab, probes);
    let router = app.router();

    let (status, health) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");

    let (status, one) = get(&router, "/health/github_api").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["service"], "github_api");
    assert_eq!(one["status"], "degraded");
    assert!(one["response_time"].as_f64().is_some());
}

#[tokio::test]
async fn test_liveness_and_readiness() {
    let collab = TestCollaborators::happy();
    let probes: Vec<Arc<dyn HealthProbe>> =
        vec![Arc::new(SummaryStoreProbe::new(collab.store.clone()))];
    let app = test_app(&collab, probes);
    let router = app.router();

    let (status, live) = get(&router, "/health/live").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(live["status"], "ok");

    let (status, ready) = get(&router, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ready["status"], "ready");
    assert_eq!(ready["services"]["summary_store"]["status"], "healthy");

    // Draining servers stop reporting ready and refuse new jobs
    assert!(app.jobs.shutdown(Duration::from_millis(100)).await);
    let (status, ready) = get(&router, "/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ready["status"], "not_ready");

    let (status, _) = post(&router, GENERATE).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_readiness_fails_when_store_is_down() {
    let collab = TestCollaborators::new(
        MockFetcher::returning(vec![]),
        MockSummarizer::ok(),
        MockSummaryStore::failing("database is down"),
    );
    let probes: Vec<Arc<dyn HealthProbe>> =
        vec![Arc::new(SummaryStoreProbe::new(collab.store.clone()))];
    let app = test_app(&collab, probes);
    let router = app.router();

    let (status, ready) = get(&router, "/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ready["status"], "not_ready");
}
