//! Error taxonomy shared across pagesmith crates.
//!
//! Each external concern gets its own `thiserror` enum so callers can match on
//! the failure class: configuration, generation backend, repository host, and
//! callback delivery. The round workflow wraps these with stage context.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for log grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Authentication,
    Upstream,
    ResourceLimits,
    Network,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Authentication => write!(f, "authentication"),
            Self::Upstream => write!(f, "upstream"),
            Self::ResourceLimits => write!(f, "resource_limits"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file {path}: {reason}")]
    InvalidFile { path: String, reason: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile { path, reason } => {
                format!("Could not read configuration file '{path}': {reason}")
            }
            Self::MissingRequired(what) => format!("Required setting is missing: {what}"),
            Self::InvalidValue { key, reason } => format!("Setting '{key}' is invalid: {reason}"),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile { .. } => vec![
                "Check the TOML syntax of the configuration file".to_string(),
                "Run 'pagesmith config' to see the effective configuration".to_string(),
            ],
            Self::MissingRequired(_) => vec![
                "Export the credential environment variables before starting the server"
                    .to_string(),
                "Set the repository owner with --owner or PAGESMITH_GITHUB_OWNER".to_string(),
            ],
            Self::InvalidValue { .. } => {
                vec!["Review the value against the documented range".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Generation-capability errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// HTTP connectivity failure or unusable response envelope
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403, missing API key)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider quota/rate limit exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Configuration error
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("Generation transport error: {msg}"),
            Self::ProviderAuth(msg) => format!("Generation provider rejected credentials: {msg}"),
            Self::ProviderQuota(msg) => format!("Generation provider quota exceeded: {msg}"),
            Self::ProviderOutage(msg) => format!("Generation provider outage: {msg}"),
            Self::Timeout { duration } => format!("Generation timed out after {duration:?}"),
            Self::Misconfiguration(msg) => format!("Generation backend misconfigured: {msg}"),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ProviderAuth(_) | Self::Misconfiguration(_) => {
                vec!["Check the generation API key environment variable".to_string()]
            }
            Self::ProviderQuota(_) | Self::ProviderOutage(_) => {
                vec!["Resubmit the task once the provider recovers".to_string()]
            }
            Self::Timeout { .. } => vec!["Raise [llm] timeout_secs".to_string()],
            Self::Transport(_) => vec!["Verify network connectivity to the provider".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => ErrorCategory::Network,
            Self::ProviderAuth(_) => ErrorCategory::Authentication,
            Self::ProviderQuota(_) => ErrorCategory::ResourceLimits,
            Self::ProviderOutage(_) => ErrorCategory::Upstream,
            Self::Misconfiguration(_) => ErrorCategory::Configuration,
        }
    }
}

/// Repository-host errors.
///
/// Lookups that can miss return `Option` instead of a not-found variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// Network failure or timeout talking to the host
    #[error("Host transport error: {0}")]
    Transport(String),

    /// Credential rejected (401/403)
    #[error("Host authentication error: {0}")]
    Auth(String),

    /// Host refused the operation
    #[error("Host rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Failed to decode host response: {0}")]
    Decode(String),
}

impl HostError {
    /// HTTP status of a rejection, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl UserFriendlyError for HostError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Auth(_) => vec!["Check the repository host token and its scopes".to_string()],
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) => ErrorCategory::Network,
            Self::Auth(_) => ErrorCategory::Authentication,
            Self::Rejected { status: 429, .. } => ErrorCategory::ResourceLimits,
            Self::Rejected { .. } | Self::Decode(_) => ErrorCategory::Upstream,
        }
    }
}

/// Single callback delivery attempt failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Callback transport error: {0}")]
    Transport(String),

    #[error("Callback answered with status {0}")]
    Status(u16),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_categories() {
        assert_eq!(
            LlmError::ProviderAuth("401".into()).category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            LlmError::ProviderQuota("429".into()).category(),
            ErrorCategory::ResourceLimits
        );
        assert_eq!(
            LlmError::Timeout {
                duration: Duration::from_secs(5)
            }
            .category(),
            ErrorCategory::Network
        );
    }

    #[test]
    fn test_host_error_status() {
        let err = HostError::Rejected {
            status: 422,
            message: "sha wasn't supplied".into(),
        };
        assert_eq!(err.status(), Some(422));
        assert_eq!(HostError::Transport("reset".into()).status(), None);
        assert!(err.to_string().contains("422"));
    }

    #[test]
    fn test_config_error_user_message_mentions_key() {
        let err = ConfigError::InvalidValue {
            key: "github.probe_attempts".into(),
            reason: "must be at least 1".into(),
        };
        assert!(err.user_message().contains("github.probe_attempts"));
        assert!(!err.suggestions().is_empty());
    }
}
