//! HTTP handlers

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use pagesmith_config::Secret;
use pagesmith_engine::TaskSink;
use pagesmith_utils::types::TaskRequest;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::error::ApiError;
use super::responses::{HealthResponse, TaskResponse};

/// State shared by the handlers.
#[derive(Clone)]
pub struct GatewayState {
    tasks: Arc<dyn TaskSink>,
    secret: Secret,
}

impl GatewayState {
    pub fn new(tasks: Arc<dyn TaskSink>, secret: Secret) -> Self {
        Self { tasks, secret }
    }
}

/// `POST /handle_task`
///
/// # Errors
///
/// The secret is compared before the rest of the body is looked at, so a
/// caller without it learns nothing about the request schema.
///
/// - 400 for a body that is not JSON
/// - 200 with status `"error"` for a missing or mismatched secret
/// - 400 for a body that is not a task request or a round other than 1 or 2
/// - 503 once the queue has shut down
pub async fn handle_task(
    State(state): State<GatewayState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TaskResponse>, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected malformed task request");
        ApiError::bad_request(rejection.body_text())
    })?;

    let secret = body.get("secret").and_then(Value::as_str);
    if secret != Some(state.secret.expose()) {
        warn!(present = secret.is_some(), "Rejected task request with invalid secret");
        return Err(ApiError::invalid_secret());
    }

    let task: TaskRequest = serde_json::from_value(body).map_err(|e| {
        warn!(error = %e, "Rejected task request with invalid fields");
        ApiError::bad_request(format!("Invalid task request: {e}"))
    })?;

    if task.round_kind().is_none() {
        warn!(task = %task.task, nonce = %task.nonce, round = task.round, "Rejected task request with invalid round");
        return Err(ApiError::bad_request("Invalid round"));
    }

    let round = task.round;
    let (name, nonce) = (task.task.clone(), task.nonce.clone());
    state
        .tasks
        .submit(task)
        .map_err(|e| ApiError::unavailable(e.to_string()))?;
    info!(task = %name, nonce = %nonce, round, "Round queued");

    Ok(Json(TaskResponse::success(format!(
        "Round {round} tasks queued"
    ))))
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}
