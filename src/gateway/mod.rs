//! Request gateway
//!
//! `POST /handle_task` authenticates a task request, validates its round and
//! hands it to the task queue without waiting for the round to run.
//! `GET /health` reports liveness.

mod error;
mod handlers;
mod responses;

pub use error::ApiError;
pub use handlers::{GatewayState, handle_task, health};
pub use responses::{HealthResponse, TaskResponse};

use axum::Router;
use axum::routing::{get, post};

/// Build the gateway router over `state`.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/handle_task", post(handle_task))
        .route("/health", get(health))
        .with_state(state)
}
