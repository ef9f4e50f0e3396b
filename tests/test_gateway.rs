//! Gateway behavior through the axum router

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use pagesmith::gateway::{GatewayState, HealthResponse, TaskResponse, router};
use pagesmith_config::Secret;
use pagesmith_engine::{QueueError, TaskSink};
use pagesmith_utils::types::TaskRequest;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const SECRET: &str = "correct-horse";

#[derive(Default)]
struct RecordingSink {
    submitted: Mutex<Vec<TaskRequest>>,
    closed: AtomicBool,
}

impl TaskSink for RecordingSink {
    fn submit(&self, task: TaskRequest) -> Result<(), QueueError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Closed);
        }
        self.submitted.lock().unwrap().push(task);
        Ok(())
    }
}

fn app(sink: &Arc<RecordingSink>) -> axum::Router {
    router(GatewayState::new(sink.clone(), Secret::new(SECRET)))
}

fn task_body(secret: &str, round: u32) -> Value {
    json!({
        "email": "student@example.com",
        "secret": secret,
        "task": "calc",
        "round": round,
        "nonce": "7",
        "brief": "Build a calculator",
        "checks": ["Has a README"],
        "evaluation_url": "https://eval.example.com/notify",
        "attachments": []
    })
}

async fn post(app: axum::Router, body: String) -> (StatusCode, TaskResponse) {
    let request = Request::builder()
        .method("POST")
        .uri("/handle_task")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_valid_round_one_is_queued() {
    let sink = Arc::new(RecordingSink::default());

    let (status, body) = post(app(&sink), task_body(SECRET, 1).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, TaskResponse::success("Round 1 tasks queued"));
    let submitted = sink.submitted.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].repo_name(), "calc_7");
}

#[tokio::test]
async fn test_valid_round_two_is_queued() {
    let sink = Arc::new(RecordingSink::default());

    let (status, body) = post(app(&sink), task_body(SECRET, 2).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.message, "Round 2 tasks queued");
}

#[tokio::test]
async fn test_invalid_secret_answers_200_with_error_body() {
    let sink = Arc::new(RecordingSink::default());

    let (status, body) = post(app(&sink), task_body("wrong", 1).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, TaskResponse::error("Invalid secret"));
    assert!(sink.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_secret_comparison_is_exact() {
    let sink = Arc::new(RecordingSink::default());

    let (_, body) = post(app(&sink), task_body(" correct-horse", 1).to_string()).await;

    assert_eq!(body.message, "Invalid secret");
    assert!(sink.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_secret_answers_invalid_secret() {
    let sink = Arc::new(RecordingSink::default());
    let body = json!({"task": "calc", "nonce": "7", "round": 1});

    let (status, response) = post(app(&sink), body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, TaskResponse::error("Invalid secret"));
    assert!(sink.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_wrong_secret_hides_schema_errors() {
    let sink = Arc::new(RecordingSink::default());

    for body in [
        json!({"secret": "wrong", "nonce": "7", "round": 1}),
        json!({"secret": "wrong", "task": "calc", "nonce": [7], "round": "one"}),
        json!({"secret": 42}),
    ] {
        let (status, response) = post(app(&sink), body.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response, TaskResponse::error("Invalid secret"));
    }
    assert!(sink.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_numeric_nonce_is_accepted() {
    let sink = Arc::new(RecordingSink::default());
    let mut body = task_body(SECRET, 1);
    body["nonce"] = json!(7);

    let (status, response) = post(app(&sink), body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response.message, "Round 1 tasks queued");
    assert_eq!(sink.submitted.lock().unwrap()[0].repo_name(), "calc_7");
}

#[tokio::test]
async fn test_unsupported_round_is_rejected() {
    let sink = Arc::new(RecordingSink::default());

    for round in [0, 3] {
        let (status, body) = post(app(&sink), task_body(SECRET, round).to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, TaskResponse::error("Invalid round"));
    }
    assert!(sink.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let sink = Arc::new(RecordingSink::default());

    let (status, body) = post(app(&sink), "{not json".to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.status, "error");
    assert!(sink.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_required_field_is_rejected() {
    let sink = Arc::new(RecordingSink::default());
    let mut body = task_body(SECRET, 1);
    body.as_object_mut().unwrap().remove("nonce");

    let (status, response) = post(app(&sink), body.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response.status, "error");
    assert!(response.message.contains("nonce"), "{}", response.message);
    assert!(sink.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_closed_queue_answers_503() {
    let sink = Arc::new(RecordingSink::default());
    sink.closed.store(true, Ordering::SeqCst);

    let (status, body) = post(app(&sink), task_body(SECRET, 1).to_string()).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body.status, "error");
}

#[tokio::test]
async fn test_health_reports_service_and_version() {
    let sink = Arc::new(RecordingSink::default());
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app(&sink).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.service, "pagesmith");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}
