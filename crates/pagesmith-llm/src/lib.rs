//! Generation backend abstraction
//!
//! Every provider implements [`LlmBackend`], so the generation adapter can build
//! prompts and decode output without knowing which endpoint produced the text.
//! The only production provider is an OpenAI-compatible chat-completions API.

pub(crate) mod http_client;
mod openai_backend;
mod types;

pub use types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};
pub use pagesmith_utils::error::LlmError;

pub(crate) use openai_backend::OpenAiBackend;

use pagesmith_config::{LlmConfig, Secret};
use std::sync::Arc;

/// Construct the configured generation backend.
///
/// # Errors
///
/// Returns `LlmError::Misconfiguration` if the API key is empty or the HTTP
/// client cannot be built.
pub fn from_config(llm: &LlmConfig, api_key: &Secret) -> Result<Arc<dyn LlmBackend>, LlmError> {
    let backend = OpenAiBackend::new_from_config(llm, api_key)?;
    tracing::debug!(
        provider = backend.provider(),
        model = %llm.model,
        "Constructed generation backend"
    );
    Ok(Arc::new(backend))
}
