//! pagesmith: webhook service that generates static sites and publishes them
//! to GitHub Pages.
//!
//! The binary wires [`app::App`] from configuration and serves the
//! [`gateway`] router. Round execution lives in `pagesmith-engine`.

pub mod app;
pub mod cli;
pub mod error;
pub mod exit_codes;
pub mod gateway;
pub mod server;

pub use app::{App, build_workflow};
pub use error::StartupError;
pub use exit_codes::ExitCode;
pub use gateway::{GatewayState, router};

pub use pagesmith_config::Config;
