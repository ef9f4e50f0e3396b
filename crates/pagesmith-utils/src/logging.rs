//! Tracing setup and structured span helpers.

use std::io::IsTerminal;
use tracing::{Level, span};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Check if colored output should be used.
///
/// Returns true only if stderr is a terminal and `NO_COLOR` is not set.
fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Default filter directive when `RUST_LOG` is not set
fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "pagesmith=debug,info"
    } else {
        "pagesmith=info,warn"
    }
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the built-in filter. With `json` set, events
/// are emitted as one JSON object per line for log shippers; otherwise a compact
/// human-readable format is used.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(verbose: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(verbose)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(verbose)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_ansi(use_color())
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span wrapping one background round for a unit of work.
pub fn round_span(task: &str, nonce: &str, round: u32) -> tracing::Span {
    span!(
        Level::INFO,
        "round",
        task = %task,
        nonce = %nonce,
        round = round,
    )
}
