//! Core types for the generation backend abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::LlmError;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions
    System,
    /// User input
    User,
    /// Assistant response
    Assistant,
}

impl Role {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new message
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Input to a backend invocation
#[derive(Debug, Clone)]
pub struct LlmInvocation {
    /// Unit of work this call belongs to, for log correlation
    pub unit_of_work: String,
    /// Model to use; empty means the backend default
    pub model: String,
    /// Timeout for this invocation
    pub timeout: Duration,
    /// Ordered list of messages in the conversation
    pub messages: Vec<Message>,
    /// Ask the provider to constrain output to a JSON object
    pub json_output: bool,
}

impl LlmInvocation {
    /// Create a new invocation
    #[must_use]
    pub fn new(unit_of_work: impl Into<String>, timeout: Duration, messages: Vec<Message>) -> Self {
        Self {
            unit_of_work: unit_of_work.into(),
            model: String::new(),
            timeout,
            messages,
            json_output: false,
        }
    }

    /// Override the backend's default model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Request JSON-object output mode
    #[must_use]
    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// Result from a backend invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResult {
    /// Raw response text from the model
    pub raw_response: String,
    /// Provider name (e.g., "openai")
    pub provider: String,
    /// Model that was actually used
    pub model_used: String,
    /// Input tokens consumed (if available)
    pub tokens_input: Option<u64>,
    /// Output tokens generated (if available)
    pub tokens_output: Option<u64>,
}

impl LlmResult {
    /// Create a new result
    #[must_use]
    pub fn new(
        raw_response: impl Into<String>,
        provider: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            raw_response: raw_response.into(),
            provider: provider.into(),
            model_used: model_used.into(),
            tokens_input: None,
            tokens_output: None,
        }
    }

    /// Set token counts
    #[must_use]
    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.tokens_input = Some(input);
        self.tokens_output = Some(output);
        self
    }
}

/// Trait for generation backend implementations
///
/// The generation adapter only ever talks to this trait, so tests can substitute
/// scripted backends for the HTTP provider.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Invoke the model with the given invocation parameters
    ///
    /// # Errors
    ///
    /// Returns `LlmError` for any failure during invocation, including:
    /// - Transport failures (network errors, malformed envelopes)
    /// - Provider errors (auth, quota, outages)
    /// - Timeouts
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError>;

    /// Provider name used in logs
    fn provider(&self) -> &str;
}
