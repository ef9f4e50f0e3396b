//! Process exit codes for the pagesmith binary

use crate::error::StartupError;
use pagesmith_utils::error::LlmError;

/// Exit status returned by [`crate::cli::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - runtime, logging or server failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// Configuration missing or invalid
    pub const CONFIG: ExitCode = ExitCode(2);

    /// A client or listener could not be set up
    pub const STARTUP: ExitCode = ExitCode(3);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl StartupError {
    /// Exit code reported when startup or serving fails with this error.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) | Self::Llm(LlmError::Misconfiguration(_)) => ExitCode::CONFIG,
            Self::Host(_) | Self::Llm(_) | Self::Notify(_) | Self::Bind { .. } => {
                ExitCode::STARTUP
            }
            Self::Serve(_) => ExitCode::INTERNAL,
        }
    }
}
