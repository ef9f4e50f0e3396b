//! Generation adapter
//!
//! Turns a task brief (plus, in revise mode, the currently published files) into
//! a set of site files with exactly one call to the generation backend.

pub mod attachments;
pub mod decode;
pub mod prompt;

pub use decode::{DecodeStrategy, Decoded, decode_response};
pub use prompt::{GenerationRequest, build_messages};

use pagesmith_config::LlmConfig;
use pagesmith_llm::{LlmBackend, LlmError, LlmInvocation};
use pagesmith_utils::types::FileSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Files produced by one generation, with decoding diagnostics.
#[derive(Debug, Clone)]
pub struct Generation {
    pub files: FileSet,
    pub strategy: DecodeStrategy,
    pub repaired_files: usize,
    pub skipped_entries: usize,
    pub provider: String,
    pub model_used: String,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
}

/// Site generator over an [`LlmBackend`].
#[derive(Clone)]
pub struct Generator {
    backend: Arc<dyn LlmBackend>,
    model: String,
    timeout: Duration,
}

impl Generator {
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>, timeout: Duration) -> Self {
        Self {
            backend,
            model: String::new(),
            timeout,
        }
    }

    #[must_use]
    pub fn from_config(backend: Arc<dyn LlmBackend>, config: &LlmConfig) -> Self {
        Self {
            backend,
            model: config.model.clone(),
            timeout: config.timeout,
        }
    }

    /// Generate site files for `request`.
    ///
    /// # Errors
    ///
    /// Returns the backend's `LlmError` unchanged; there is no retry. Decoding
    /// never fails: unstructured output becomes a single `index.html`.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Generation, LlmError> {
        let mut invocation = LlmInvocation::new(
            request.unit_of_work.clone(),
            self.timeout,
            build_messages(request),
        )
        .with_json_output();
        if !self.model.is_empty() {
            invocation = invocation.with_model(self.model.clone());
        }

        let result = self.backend.invoke(invocation).await?;
        let decoded = decode_response(&result.raw_response);

        if decoded.strategy == DecodeStrategy::Fallback {
            warn!(
                unit_of_work = %request.unit_of_work,
                response_chars = result.raw_response.len(),
                "Response was not structured; publishing it as a single page"
            );
        }
        info!(
            unit_of_work = %request.unit_of_work,
            revise = request.is_revision(),
            strategy = %decoded.strategy,
            files = decoded.files.len(),
            repaired = decoded.repaired,
            skipped = decoded.skipped,
            "Decoded generated files"
        );

        Ok(Generation {
            files: decoded.files,
            strategy: decoded.strategy,
            repaired_files: decoded.repaired,
            skipped_entries: decoded.skipped,
            provider: result.provider,
            model_used: result.model_used,
            tokens_input: result.tokens_input,
            tokens_output: result.tokens_output,
        })
    }
}
