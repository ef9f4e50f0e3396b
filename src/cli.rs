//! Command-line interface for pagesmith
//!
//! `serve` runs the webhook service; `config` prints the effective
//! configuration with credentials redacted.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pagesmith_config::{CliOverrides, Config};
use pagesmith_utils::error::UserFriendlyError;
use pagesmith_utils::logging::init_tracing;
use std::path::PathBuf;

use crate::error::StartupError;
use crate::exit_codes::ExitCode;
use crate::server;

/// pagesmith - generate static sites from task briefs and publish them to GitHub Pages
#[derive(Parser, Debug)]
#[command(name = "pagesmith")]
#[command(about = "Webhook service that builds and publishes static sites from task briefs")]
#[command(long_about = r#"
pagesmith accepts task requests over HTTP, generates a static site for each
with an LLM, commits it to a GitHub repository and enables GitHub Pages.
Round 2 requests revise the previously published site.

EXAMPLES:
  # Run the service on the default address
  pagesmith serve

  # Run with an explicit config file and owner
  pagesmith serve --config ./pagesmith.toml --owner my-org

  # Show the effective configuration
  pagesmith config

CONFIGURATION:
  Precedence: CLI flags > environment > config file > defaults
  The config file defaults to ./pagesmith.toml when present
  Credentials come from GITHUB_TOKEN, OPENAI_API_KEY and PAGESMITH_SECRET
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Listen address, e.g. 0.0.0.0:8080
        #[arg(long)]
        bind: Option<String>,

        /// Account that owns generated repositories
        #[arg(long)]
        owner: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let (bind, owner) = match &self.command {
            Commands::Serve { bind, owner } => (bind.clone(), owner.clone()),
            Commands::Config => (None, None),
        };
        CliOverrides {
            config_path: self.config.clone(),
            bind,
            owner,
        }
    }
}

/// Main CLI entry point.
///
/// Handles all output including errors; `main` only maps the returned code to
/// the process exit status.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose, cli.json_logs) {
        eprintln!("✗ Failed to initialize logging: {e}");
        return Err(ExitCode::INTERNAL);
    }

    let config = match Config::load(&cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            report(&e);
            return Err(ExitCode::CONFIG);
        }
    };

    match cli.command {
        Commands::Config => {
            print!("{}", config.render());
            Ok(())
        }
        Commands::Serve { .. } => run_serve(config).map_err(|e| {
            eprintln!("✗ {e:#}");
            e.downcast_ref::<StartupError>()
                .map_or(ExitCode::INTERNAL, StartupError::exit_code)
        }),
    }
}

fn run_serve(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
    runtime.block_on(server::serve(config))?;
    Ok(())
}

fn report(error: &impl UserFriendlyError) {
    eprintln!("✗ {}", error.user_message());
    for suggestion in error.suggestions() {
        eprintln!("  → {suggestion}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "pagesmith",
            "serve",
            "--bind",
            "127.0.0.1:9000",
            "--owner",
            "octo",
            "--config",
            "custom.toml",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.bind.as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(overrides.owner.as_deref(), Some("octo"));
        assert_eq!(overrides.config_path, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn test_config_command_has_no_serve_overrides() {
        let cli = Cli::try_parse_from(["pagesmith", "config", "--json-logs"]).unwrap();
        assert!(cli.json_logs);

        let overrides = cli.overrides();
        assert!(overrides.bind.is_none());
        assert!(overrides.owner.is_none());
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["pagesmith"]).is_err());
    }
}
