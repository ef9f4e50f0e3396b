use async_trait::async_trait;
use pagesmith_utils::error::HostError;
use serde::{Deserialize, Serialize};

/// Outcome of a repository creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoCreation {
    Created,
    /// The name was taken; the existing repository is reused.
    AlreadyExists,
}

/// Outcome of enabling static hosting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagesStatus {
    Enabled,
    AlreadyEnabled,
}

/// Revision marker and metadata of a file that exists on the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteFile {
    pub path: String,
    /// Content revision marker; required to overwrite the file.
    pub sha: String,
    #[serde(default)]
    pub size: u64,
}

/// Kind of a directory listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub sha: String,
    #[serde(default)]
    pub size: u64,
}

impl DirEntry {
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// A single-file write.
///
/// `sha` must carry the current marker when the path exists and must be absent
/// when it does not; the host rejects any other combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutFile {
    pub path: String,
    pub content: Vec<u8>,
    pub message: String,
    pub branch: String,
    pub sha: Option<String>,
}

/// Result of an accepted write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    /// Commit created by the write
    pub commit: String,
    /// New content marker of the path
    pub content_sha: String,
}

/// Remote repository host operations used by the round workflow.
///
/// All repositories live under a single owner fixed at construction, so
/// operations take only the repository name.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Account that owns every repository this host touches
    fn owner(&self) -> &str;

    /// Create a public, auto-initialized repository with an MIT licence.
    async fn create_repository(&self, name: &str) -> Result<RepoCreation, HostError>;

    /// Commit id at the head of `branch`.
    async fn branch_head(&self, repo: &str, branch: &str) -> Result<String, HostError>;

    /// Current marker for `path`, `None` when the host reports it missing.
    async fn get_file(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<RemoteFile>, HostError>;

    /// Create or update one file as a single commit.
    async fn put_file(&self, repo: &str, file: PutFile) -> Result<WriteReceipt, HostError>;

    /// Entries directly under `path` (empty string for the repository root).
    async fn list_directory(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Vec<DirEntry>, HostError>;

    /// Raw bytes of a file.
    async fn fetch_raw(&self, repo: &str, path: &str, branch: &str) -> Result<Vec<u8>, HostError>;

    /// Serve `branch` root as a static site.
    async fn enable_pages(&self, repo: &str, branch: &str) -> Result<PagesStatus, HostError>;

    /// Browsable repository URL.
    fn repo_url(&self, repo: &str) -> String {
        format!("https://github.com/{}/{}", self.owner(), repo)
    }

    /// Public URL of the hosted site.
    fn pages_url(&self, repo: &str) -> String {
        format!("https://{}.github.io/{}/", self.owner(), repo)
    }
}
