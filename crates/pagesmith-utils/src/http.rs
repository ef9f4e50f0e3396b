//! Shared outbound HTTP client construction.
//!
//! Every outbound concern (repository host, generation backend, callback
//! delivery) builds its `reqwest::Client` here so connection pooling, connect
//! timeouts and the user agent stay consistent across the process.

use reqwest::Client;
use std::time::Duration;

/// Default connect timeout (30 seconds)
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent on every outbound request. GitHub rejects requests without one.
pub const USER_AGENT: &str = concat!("pagesmith/", env!("CARGO_PKG_VERSION"));

/// Maximum characters of an upstream error body kept for logs
const MAX_BODY_SNIPPET: usize = 300;

/// Build a pooled client with the given whole-request timeout.
///
/// # Errors
///
/// Returns the underlying `reqwest::Error` if the TLS backend cannot be initialized.
pub fn build_client(request_timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(request_timeout))
        .timeout(request_timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .build()
}

/// Trim an upstream response body to a loggable snippet.
#[must_use]
pub fn body_snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_BODY_SNIPPET {
        return trimmed.to_string();
    }
    let mut snippet: String = trimmed.chars().take(MAX_BODY_SNIPPET).collect();
    snippet.push('…');
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client() {
        let client = build_client(Duration::from_secs(10));
        assert!(client.is_ok(), "Should construct HTTP client successfully");
    }

    #[test]
    fn test_body_snippet_truncates_long_bodies() {
        let long = "x".repeat(1000);
        let snippet = body_snippet(&long);
        assert_eq!(snippet.chars().count(), MAX_BODY_SNIPPET + 1);
        assert!(snippet.ends_with('…'));
        assert_eq!(body_snippet("  short  "), "short");
    }
}
