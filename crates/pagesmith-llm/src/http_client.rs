//! Shared HTTP client infrastructure for HTTP-based generation providers
//!
//! Generation failures are fatal to a round, so this client performs exactly one
//! attempt per call and maps the outcome onto `LlmError` variants.

use pagesmith_utils::http::{body_snippet, build_client};
use pagesmith_utils::redaction::redact_error_message;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::LlmError;

/// Default maximum HTTP timeout (5 minutes)
const DEFAULT_MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// HTTP client for generation providers
///
/// Configured once per process and reused across invocations for connection reuse.
#[derive(Clone)]
pub(crate) struct HttpClient {
    client: Client,
    max_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn new() -> Result<Self, LlmError> {
        Self::with_max_timeout(DEFAULT_MAX_HTTP_TIMEOUT)
    }

    /// Create a new HTTP client with a custom maximum timeout
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn with_max_timeout(max_timeout: Duration) -> Result<Self, LlmError> {
        let client = build_client(max_timeout).map_err(|e| {
            LlmError::Misconfiguration(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            max_timeout,
        })
    }

    /// Start a POST request on the pooled client
    pub fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.post(url)
    }

    /// Execute a single HTTP request and classify the outcome
    ///
    /// Per-request timeout is `min(request_timeout, max_timeout)`.
    ///
    /// # Errors
    ///
    /// - `LlmError::ProviderAuth` for 401/403
    /// - `LlmError::ProviderQuota` for 429
    /// - `LlmError::ProviderOutage` for 5xx
    /// - `LlmError::Timeout` for timeouts
    /// - `LlmError::Transport` for other 4xx and network errors
    pub async fn execute(
        &self,
        request_builder: reqwest::RequestBuilder,
        request_timeout: Duration,
        provider_name: &str,
    ) -> Result<Response, LlmError> {
        let effective_timeout = request_timeout.min(self.max_timeout);

        debug!(
            provider = provider_name,
            timeout_secs = effective_timeout.as_secs(),
            "Executing HTTP request"
        );

        let response = request_builder
            .timeout(effective_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        duration: effective_timeout,
                    }
                } else {
                    LlmError::Transport(format!(
                        "{} request failed: {}",
                        provider_name,
                        redact_error_message(&e.to_string())
                    ))
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_error_status(status, provider_name, &body))
    }
}

/// Map non-success HTTP status codes to LlmError variants
///
/// - 401/403 → `LlmError::ProviderAuth`
/// - 429 → `LlmError::ProviderQuota`
/// - 5xx → `LlmError::ProviderOutage`
/// - Other → `LlmError::Transport`
fn map_error_status(status: StatusCode, provider_name: &str, body: &str) -> LlmError {
    let detail = redact_error_message(&body_snippet(body));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::ProviderAuth(format!(
            "{} authentication failed: {} {}",
            provider_name, status, detail
        )),
        StatusCode::TOO_MANY_REQUESTS => LlmError::ProviderQuota(format!(
            "{} rate limit exceeded: {} {}",
            provider_name, status, detail
        )),
        s if s.is_server_error() => LlmError::ProviderOutage(format!(
            "{} returned server error: {} {}",
            provider_name, status, detail
        )),
        _ => LlmError::Transport(format!(
            "{} returned client error: {} {}",
            provider_name, status, detail
        )),
    }
}
