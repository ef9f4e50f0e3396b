//! Component wiring
//!
//! Builds the production collaborators from a [`Config`] and owns the task
//! queue the gateway submits to.

use axum::Router;
use pagesmith_config::Config;
use pagesmith_engine::{RoundRunner, RoundWorkflow, TaskQueue};
use pagesmith_generation::Generator;
use pagesmith_host::{GitHubHost, RepoHost};
use pagesmith_notify::Notifier;
use pagesmith_publisher::{ContentPublisher, ProbePolicy};
use std::sync::Arc;
use tracing::info;

use crate::error::StartupError;
use crate::gateway::{self, GatewayState};

/// Build the round workflow against GitHub, the configured generation backend
/// and the HTTP callback transport.
///
/// # Errors
///
/// Returns `StartupError` if any client cannot be constructed.
pub fn build_workflow(config: &Config) -> Result<RoundWorkflow, StartupError> {
    let host: Arc<dyn RepoHost> = Arc::new(GitHubHost::new(
        &config.github,
        config.credentials.github_token.clone(),
    )?);
    let backend = pagesmith_llm::from_config(&config.llm, &config.credentials.llm_api_key)?;

    Ok(RoundWorkflow::new(
        host.clone(),
        Generator::from_config(backend, &config.llm),
        ContentPublisher::new(host, ProbePolicy::from_config(&config.github)),
        Notifier::from_config(&config.notify)?,
        config.github.branch.clone(),
    ))
}

/// Running service state: configuration plus the background queue.
pub struct App {
    config: Arc<Config>,
    queue: Arc<TaskQueue>,
}

impl App {
    /// Wire production components and start the queue.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `StartupError` if a client cannot be constructed.
    pub fn start(config: Config) -> Result<Self, StartupError> {
        let workflow = build_workflow(&config)?;
        Ok(Self::with_runner(config, Arc::new(workflow)))
    }

    /// Start the queue over an arbitrary runner.
    #[must_use]
    pub fn with_runner(config: Config, runner: Arc<dyn RoundRunner>) -> Self {
        let queue = Arc::new(TaskQueue::start(runner, config.server.max_concurrent_rounds));
        info!(
            owner = %config.github.owner,
            max_concurrent_rounds = config.server.max_concurrent_rounds,
            "Task queue started"
        );
        Self {
            config: Arc::new(config),
            queue,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// HTTP router bound to this app's queue and shared secret.
    #[must_use]
    pub fn router(&self) -> Router {
        gateway::router(GatewayState::new(
            self.queue.clone(),
            self.config.credentials.shared_secret.clone(),
        ))
    }

    /// Stop intake and wait for in-flight rounds.
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }
}
