//! Gateway error responses

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::responses::TaskResponse;

/// Rejection of a task request, rendered as a `TaskResponse` with status
/// `"error"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{status}] {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 Bad Request
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Shared secret mismatch. Answered with 200 so callers read the body.
    pub fn invalid_secret() -> Self {
        Self::new(StatusCode::OK, "Invalid secret")
    }

    /// 503 Service Unavailable
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(TaskResponse::error(self.message))).into_response()
    }
}
