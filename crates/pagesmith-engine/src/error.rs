use pagesmith_llm::LlmError;
use pagesmith_utils::error::{ErrorCategory, HostError, UserFriendlyError};
use thiserror::Error;

/// Step of a round that talks to the repository host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStage {
    CreateRepository,
    FetchFiles,
    EnableHosting,
    ReadHead,
}

impl std::fmt::Display for HostStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CreateRepository => "create repository",
            Self::FetchFiles => "fetch files",
            Self::EnableHosting => "enable hosting",
            Self::ReadHead => "read branch head",
        };
        f.write_str(name)
    }
}

/// Error that aborts the remainder of a round.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("{stage} failed: {source}")]
    Host {
        stage: HostStage,
        #[source]
        source: HostError,
    },

    #[error("Generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("Unsupported round {0}")]
    UnsupportedRound(u32),
}

impl WorkflowError {
    pub(crate) fn host(stage: HostStage) -> impl FnOnce(HostError) -> Self {
        move |source| Self::Host { stage, source }
    }
}

impl UserFriendlyError for WorkflowError {
    fn user_message(&self) -> String {
        match self {
            Self::Host { stage, source } => {
                format!("Could not {stage}: {}", source.user_message())
            }
            Self::Generation(e) => e.user_message(),
            Self::UnsupportedRound(round) => format!("Round {round} is not supported"),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Host { source, .. } => source.suggestions(),
            Self::Generation(e) => e.suggestions(),
            Self::UnsupportedRound(_) => vec!["Send round 1 or round 2".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Host { source, .. } => source.category(),
            Self::Generation(e) => e.category(),
            Self::UnsupportedRound(_) => ErrorCategory::Configuration,
        }
    }
}
