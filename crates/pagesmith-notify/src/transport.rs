use async_trait::async_trait;
use pagesmith_utils::error::NotifyError;
use pagesmith_utils::http::build_client;
use pagesmith_utils::redaction::redact_error_message;
use pagesmith_utils::types::NotificationPayload;
use reqwest::Client;
use std::time::Duration;

/// One delivery attempt of a notification.
#[async_trait]
pub trait CallbackTransport: Send + Sync {
    /// Deliver `payload` to `url` once. Any non-2xx answer is an error.
    async fn deliver(&self, url: &str, payload: &NotificationPayload) -> Result<(), NotifyError>;
}

/// JSON `POST` delivery over a pooled HTTP client.
#[derive(Debug, Clone)]
pub struct HttpCallbackTransport {
    client: Client,
}

impl HttpCallbackTransport {
    /// # Errors
    ///
    /// Returns `NotifyError::Transport` if the HTTP client cannot be constructed.
    pub fn new(request_timeout: Duration) -> Result<Self, NotifyError> {
        let client = build_client(request_timeout)
            .map_err(|e| NotifyError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CallbackTransport for HttpCallbackTransport {
    async fn deliver(&self, url: &str, payload: &NotificationPayload) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(redact_error_message(&e.to_string())))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};

    type Received = Arc<Mutex<Vec<NotificationPayload>>>;

    fn payload() -> NotificationPayload {
        NotificationPayload {
            email: "student@example.com".to_string(),
            task: "calc".to_string(),
            round: 1,
            nonce: "7".to_string(),
            repo_url: "https://github.com/octo/calc_7".to_string(),
            commit_sha: "abc123".to_string(),
            pages_url: "https://octo.github.io/calc_7/".to_string(),
        }
    }

    async fn accept(State(received): State<Received>, Json(body): Json<NotificationPayload>) {
        received.lock().unwrap().push(body);
    }

    async fn accept_later(Json(_): Json<NotificationPayload>) -> StatusCode {
        StatusCode::ACCEPTED
    }

    async fn fail() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Serve the evaluation endpoint stub on an ephemeral port.
    async fn spawn_evaluator(received: Received) -> String {
        let app = Router::new()
            .route("/notify", post(accept))
            .route("/queued", post(accept_later))
            .route("/broken", post(fail))
            .with_state(received);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn transport() -> HttpCallbackTransport {
        HttpCallbackTransport::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_success_status_delivers_json_payload() {
        let received = Received::default();
        let base = spawn_evaluator(received.clone()).await;

        transport()
            .deliver(&format!("{base}/notify"), &payload())
            .await
            .unwrap();

        assert_eq!(*received.lock().unwrap(), vec![payload()]);
    }

    #[tokio::test]
    async fn test_any_2xx_status_is_success() {
        let base = spawn_evaluator(Received::default()).await;

        let result = transport().deliver(&format!("{base}/queued"), &payload()).await;

        assert!(result.is_ok(), "{:?}", result);
    }

    #[tokio::test]
    async fn test_error_status_fails_attempt() {
        let base = spawn_evaluator(Received::default()).await;

        for (path, expected) in [("broken", 500), ("missing", 404)] {
            match transport()
                .deliver(&format!("{base}/{path}"), &payload())
                .await
            {
                Err(NotifyError::Status(status)) => assert_eq!(status, expected),
                other => panic!("Expected Status error, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        match transport()
            .deliver(&format!("http://{addr}/notify"), &payload())
            .await
        {
            Err(NotifyError::Transport(_)) => {}
            other => panic!("Expected Transport error, got {:?}", other),
        }
    }
}
