//! Errors raised while starting or running the service

use pagesmith_utils::error::{ConfigError, HostError, LlmError, NotifyError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Repository host setup failed: {0}")]
    Host(#[from] HostError),

    #[error("Generation backend setup failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Callback client setup failed: {0}")]
    Notify(#[from] NotifyError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server error: {0}")]
    Serve(#[source] std::io::Error),
}
