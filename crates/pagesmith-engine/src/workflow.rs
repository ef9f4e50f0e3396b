//! Round workflows
//!
//! Round 1: `Created -> Generated -> Published -> Hosted -> Notified`.
//! Round 2: `Fetched -> Generated -> Published -> Notified`.
//!
//! Stages run strictly in order. A host or generation failure aborts the rest
//! of the round with nothing rolled back; a partial publish is logged and the
//! round still notifies.

use pagesmith_generation::{DecodeStrategy, GenerationRequest, Generator};
use pagesmith_host::{RepoCreation, RepoHost};
use pagesmith_notify::{Notifier, NotifyOutcome};
use pagesmith_publisher::{ContentPublisher, PublishReport};
use pagesmith_utils::redaction::redact_error_message;
use pagesmith_utils::types::{
    FileContent, FileSet, GeneratedFile, NotificationPayload, Round, TaskRequest,
};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{HostStage, WorkflowError};

/// Stage reached by a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    Created,
    Fetched,
    Generated,
    Published,
    Hosted,
    Notified,
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Fetched => "fetched",
            Self::Generated => "generated",
            Self::Published => "published",
            Self::Hosted => "hosted",
            Self::Notified => "notified",
        };
        f.write_str(name)
    }
}

/// What a completed round did.
#[derive(Debug, Clone)]
pub struct RoundSummary {
    pub repo: String,
    pub round: Round,
    /// States visited, in order
    pub states: Vec<RoundState>,
    /// Round 1 only
    pub creation: Option<RepoCreation>,
    /// Round 2 only: files retrieved as generation context
    pub fetched_files: usize,
    pub strategy: DecodeStrategy,
    pub publish: PublishReport,
    pub commit_sha: String,
    pub notify: NotifyOutcome,
}

/// Ordered record of visited states.
#[derive(Debug, Default)]
struct Progress {
    states: Vec<RoundState>,
}

impl Progress {
    fn advance(&mut self, repo: &str, state: RoundState) {
        info!(repo, state = %state, "Round advanced");
        self.states.push(state);
    }
}

/// Runs rounds end to end against injected collaborators.
#[derive(Clone)]
pub struct RoundWorkflow {
    host: Arc<dyn RepoHost>,
    generator: Generator,
    publisher: ContentPublisher,
    notifier: Notifier,
    branch: String,
}

impl RoundWorkflow {
    #[must_use]
    pub fn new(
        host: Arc<dyn RepoHost>,
        generator: Generator,
        publisher: ContentPublisher,
        notifier: Notifier,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            host,
            generator,
            publisher,
            notifier,
            branch: branch.into(),
        }
    }

    /// Run the round named by `task.round`.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::UnsupportedRound` for rounds other than 1 and 2,
    /// otherwise the error of the stage that failed.
    pub async fn run(&self, task: &TaskRequest) -> Result<RoundSummary, WorkflowError> {
        match task.round_kind() {
            Some(Round::Create) => self.run_create(task).await,
            Some(Round::Revise) => self.run_revise(task).await,
            None => Err(WorkflowError::UnsupportedRound(task.round)),
        }
    }

    /// Round 1: create the repository, generate, publish, enable hosting, notify.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing host or generation stage.
    pub async fn run_create(&self, task: &TaskRequest) -> Result<RoundSummary, WorkflowError> {
        let repo = task.repo_name();
        let mut progress = Progress::default();

        let creation = self
            .host
            .create_repository(&repo)
            .await
            .map_err(WorkflowError::host(HostStage::CreateRepository))?;
        if creation == RepoCreation::AlreadyExists {
            info!(repo = %repo, "Repository already exists; reusing it");
        }
        progress.advance(&repo, RoundState::Created);

        let generation = self
            .generator
            .generate(&GenerationRequest::from_task(task))
            .await?;
        progress.advance(&repo, RoundState::Generated);

        let publish = self
            .publisher
            .publish(&repo, &generation.files, &self.branch)
            .await;
        warn_partial(&repo, &publish);
        progress.advance(&repo, RoundState::Published);

        let pages = self
            .host
            .enable_pages(&repo, &self.branch)
            .await
            .map_err(WorkflowError::host(HostStage::EnableHosting))?;
        info!(repo = %repo, status = ?pages, url = %self.host.pages_url(&repo), "Static hosting ready");
        progress.advance(&repo, RoundState::Hosted);

        let (commit_sha, notify) = self.notify(task, &repo).await?;
        progress.advance(&repo, RoundState::Notified);

        Ok(RoundSummary {
            repo,
            round: Round::Create,
            states: progress.states,
            creation: Some(creation),
            fetched_files: 0,
            strategy: generation.strategy,
            publish,
            commit_sha,
            notify,
        })
    }

    /// Round 2: fetch published files, regenerate with them as context, publish,
    /// notify.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing host or generation stage.
    pub async fn run_revise(&self, task: &TaskRequest) -> Result<RoundSummary, WorkflowError> {
        let repo = task.repo_name();
        let mut progress = Progress::default();

        let previous = self.fetch_files(&repo).await?;
        let fetched_files = previous.len();
        progress.advance(&repo, RoundState::Fetched);

        let request = GenerationRequest::from_task(task).with_previous_files(previous);
        let generation = self.generator.generate(&request).await?;
        progress.advance(&repo, RoundState::Generated);

        let publish = self
            .publisher
            .publish(&repo, &generation.files, &self.branch)
            .await;
        warn_partial(&repo, &publish);
        progress.advance(&repo, RoundState::Published);

        let (commit_sha, notify) = self.notify(task, &repo).await?;
        progress.advance(&repo, RoundState::Notified);

        Ok(RoundSummary {
            repo,
            round: Round::Revise,
            states: progress.states,
            creation: None,
            fetched_files,
            strategy: generation.strategy,
            publish,
            commit_sha,
            notify,
        })
    }

    /// Top-level plain files of the repository. Unreadable files are skipped.
    async fn fetch_files(&self, repo: &str) -> Result<FileSet, WorkflowError> {
        let entries = self
            .host
            .list_directory(repo, "", &self.branch)
            .await
            .map_err(WorkflowError::host(HostStage::FetchFiles))?;

        let mut files = FileSet::new();
        for entry in entries {
            if !entry.is_file() {
                info!(repo, path = %entry.path, kind = ?entry.kind, "Skipping non-file entry");
                continue;
            }
            match self.host.fetch_raw(repo, &entry.path, &self.branch).await {
                Ok(bytes) => {
                    files.insert(GeneratedFile::new(
                        entry.path,
                        FileContent::from_bytes(bytes),
                    ));
                }
                Err(e) => {
                    warn!(
                        repo,
                        path = %entry.path,
                        error = %redact_error_message(&e.to_string()),
                        "Skipping file that could not be downloaded"
                    );
                }
            }
        }

        info!(repo, files = files.len(), "Fetched published files");
        Ok(files)
    }

    async fn notify(
        &self,
        task: &TaskRequest,
        repo: &str,
    ) -> Result<(String, NotifyOutcome), WorkflowError> {
        let commit_sha = self
            .host
            .branch_head(repo, &self.branch)
            .await
            .map_err(WorkflowError::host(HostStage::ReadHead))?;

        let payload = NotificationPayload {
            email: task.email.clone(),
            task: task.task.clone(),
            round: task.round,
            nonce: task.nonce.clone(),
            repo_url: self.host.repo_url(repo),
            commit_sha: commit_sha.clone(),
            pages_url: self.host.pages_url(repo),
        };
        let outcome = self.notifier.notify(task.callback_url(), &payload).await;
        info!(repo, outcome = %outcome, "Notification finished");
        Ok((commit_sha, outcome))
    }
}

fn warn_partial(repo: &str, report: &PublishReport) {
    if !report.is_complete() {
        warn!(
            repo,
            failed = ?report.failed_paths(),
            summary = %report,
            "Publish incomplete; continuing to notify"
        );
    }
}
