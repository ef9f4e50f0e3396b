//! Content publisher
//!
//! Writes a set of files to one branch of a repository, one commit per file.
//! Each path is probed for its revision marker first; the host's read-after-write
//! lag means a fresh "not found" is not trusted until it has been seen
//! `attempts` times. Files are published independently: a rejected write is
//! recorded and the remaining files continue.

mod report;

pub use report::{FileOutcome, FileResult, PublishReport};

use pagesmith_config::GithubConfig;
use pagesmith_host::{HostError, PutFile, RemoteFile, RepoHost};
use pagesmith_utils::redaction::redact_error_message;
use pagesmith_utils::types::{FileSet, GeneratedFile};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often and how patiently a path is probed before it is treated as new.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl ProbePolicy {
    #[must_use]
    pub fn from_config(github: &GithubConfig) -> Self {
        Self {
            attempts: github.probe_attempts.max(1),
            delay: github.probe_delay,
        }
    }
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            attempts: pagesmith_config::DEFAULT_PROBE_ATTEMPTS,
            delay: Duration::from_millis(pagesmith_config::DEFAULT_PROBE_DELAY_MS),
        }
    }
}

/// Publishes file sets through a [`RepoHost`].
#[derive(Clone)]
pub struct ContentPublisher {
    host: Arc<dyn RepoHost>,
    policy: ProbePolicy,
}

impl ContentPublisher {
    #[must_use]
    pub fn new(host: Arc<dyn RepoHost>, policy: ProbePolicy) -> Self {
        Self { host, policy }
    }

    #[must_use]
    pub fn policy(&self) -> ProbePolicy {
        self.policy
    }

    /// Publish every file in `files` to `branch`, in order.
    ///
    /// Never fails as a whole; inspect the returned report for per-path results.
    pub async fn publish(&self, repo: &str, files: &FileSet, branch: &str) -> PublishReport {
        let mut report = PublishReport::default();

        for file in files {
            let result = self.publish_one(repo, file, branch).await;
            match &result {
                FileResult::Created { commit } => {
                    info!(repo, path = %file.path, commit = %commit, "Created file");
                }
                FileResult::Updated { commit } => {
                    info!(repo, path = %file.path, commit = %commit, "Updated file");
                }
                FileResult::Failed { reason } => {
                    warn!(repo, path = %file.path, reason = %reason, "Failed to publish file");
                }
            }
            report.push(file.path.clone(), result);
        }

        info!(repo, branch, summary = %report, "Publish finished");
        report
    }

    async fn publish_one(&self, repo: &str, file: &GeneratedFile, branch: &str) -> FileResult {
        let existing = match self.probe(repo, &file.path, branch).await {
            Ok(existing) => existing,
            Err(e) => {
                return FileResult::Failed {
                    reason: format!(
                        "existence probe failed: {}",
                        redact_error_message(&e.to_string())
                    ),
                };
            }
        };

        let (message, sha) = match existing {
            Some(remote) => (format!("Update {}", file.path), Some(remote.sha)),
            None => (format!("Add {}", file.path), None),
        };
        let is_update = sha.is_some();

        let put = PutFile {
            path: file.path.clone(),
            content: file.content.as_bytes().to_vec(),
            message,
            branch: branch.to_string(),
            sha,
        };

        match self.host.put_file(repo, put).await {
            Ok(receipt) if is_update => FileResult::Updated {
                commit: receipt.commit,
            },
            Ok(receipt) => FileResult::Created {
                commit: receipt.commit,
            },
            Err(e) => FileResult::Failed {
                reason: redact_error_message(&e.to_string()),
            },
        }
    }

    /// Look up the current marker of `path`.
    ///
    /// Returns `Ok(None)` only after `attempts` probes in a row reported the path
    /// missing or failed; if the final probe failed, its error is returned so the
    /// caller never writes without knowing whether the path exists.
    async fn probe(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<RemoteFile>, HostError> {
        let attempts = self.policy.attempts.max(1);
        let mut last = Ok(None);

        for attempt in 1..=attempts {
            match self.host.get_file(repo, path, branch).await {
                Ok(Some(remote)) => return Ok(Some(remote)),
                Ok(None) => {
                    debug!(repo, path, attempt, attempts, "Path not found");
                    last = Ok(None);
                }
                Err(e) => {
                    debug!(repo, path, attempt, attempts, error = %e, "Existence probe failed");
                    last = Err(e);
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.policy.delay).await;
            }
        }

        last
    }
}
