//! HTTP server lifecycle

use pagesmith_config::Config;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::app::App;
use crate::error::StartupError;

/// Serve the gateway until Ctrl-C or SIGTERM, then drain the task queue.
///
/// # Errors
///
/// Returns `StartupError` if wiring fails, the address cannot be bound, or the
/// server stops with an I/O error.
pub async fn serve(config: Config) -> Result<(), StartupError> {
    let app = App::start(config)?;
    let addr = app.config().server.bind.clone();

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!(addr = %addr, "Listening for task requests");

    let served = axum::serve(listener, app.router())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Waiting for in-flight rounds");
    app.shutdown().await;
    served.map_err(StartupError::Serve)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C"),
            Err(e) => {
                error!(error = %e, "Failed to install Ctrl-C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
                info!("Received SIGTERM");
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
