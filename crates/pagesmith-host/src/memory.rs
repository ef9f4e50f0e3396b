//! In-memory repository host for tests
//!
//! Enforces the same create-vs-update marker rules as the real host, can hide
//! existing files from a number of probes to mimic read-after-write lag, records
//! every call, and fails operations on demand.

use async_trait::async_trait;
use pagesmith_utils::error::HostError;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::types::{
    DirEntry, EntryKind, PagesStatus, PutFile, RemoteFile, RepoCreation, RepoHost, WriteReceipt,
};

/// Operation selector for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOp {
    CreateRepository,
    BranchHead,
    GetFile,
    PutFile,
    ListDirectory,
    FetchRaw,
    EnablePages,
}

/// One recorded call against the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    CreateRepository { name: String },
    BranchHead { repo: String, branch: String },
    GetFile { repo: String, path: String },
    PutFile {
        repo: String,
        path: String,
        sha: Option<String>,
        message: String,
    },
    ListDirectory { repo: String, path: String },
    FetchRaw { repo: String, path: String },
    EnablePages { repo: String, branch: String },
}

impl HostCall {
    #[must_use]
    pub fn op(&self) -> HostOp {
        match self {
            Self::CreateRepository { .. } => HostOp::CreateRepository,
            Self::BranchHead { .. } => HostOp::BranchHead,
            Self::GetFile { .. } => HostOp::GetFile,
            Self::PutFile { .. } => HostOp::PutFile,
            Self::ListDirectory { .. } => HostOp::ListDirectory,
            Self::FetchRaw { .. } => HostOp::FetchRaw,
            Self::EnablePages { .. } => HostOp::EnablePages,
        }
    }

    fn path(&self) -> Option<&str> {
        match self {
            Self::GetFile { path, .. }
            | Self::PutFile { path, .. }
            | Self::ListDirectory { path, .. }
            | Self::FetchRaw { path, .. } => Some(path),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredFile {
    content: Vec<u8>,
    sha: String,
}

#[derive(Debug, Default)]
struct MemoryRepo {
    files: BTreeMap<String, StoredFile>,
    head: String,
    commits: u64,
    pages: bool,
}

#[derive(Debug)]
struct InjectedFailure {
    op: HostOp,
    path: Option<String>,
    error: HostError,
}

#[derive(Debug, Default)]
struct MemoryState {
    repos: BTreeMap<String, MemoryRepo>,
    calls: Vec<HostCall>,
    failures: Vec<InjectedFailure>,
    /// Remaining probes for which `(repo, path)` reads as missing
    hidden: BTreeMap<(String, String), u32>,
}

/// Single-branch in-memory [`RepoHost`].
#[derive(Debug)]
pub struct MemoryHost {
    owner: String,
    state: Mutex<MemoryState>,
}

fn content_sha(content: &[u8]) -> String {
    blake3::hash(content).to_hex()[..40].to_string()
}

fn not_found(what: &str) -> HostError {
    HostError::Rejected {
        status: 404,
        message: format!("{what} not found"),
    }
}

impl MemoryRepo {
    fn commit(&mut self, repo: &str, path: &str) -> String {
        self.commits += 1;
        let seed = format!("{repo}:{}:{path}", self.commits);
        self.head = content_sha(seed.as_bytes());
        self.head.clone()
    }

    fn write(&mut self, repo: &str, path: &str, content: Vec<u8>) -> WriteReceipt {
        let sha = content_sha(&content);
        self.files.insert(
            path.to_string(),
            StoredFile {
                content,
                sha: sha.clone(),
            },
        );
        WriteReceipt {
            commit: self.commit(repo, path),
            content_sha: sha,
        }
    }
}

impl MemoryHost {
    #[must_use]
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next call to `op` (any path) with `error`.
    pub fn fail_next(&self, op: HostOp, error: HostError) {
        self.lock().failures.push(InjectedFailure {
            op,
            path: None,
            error,
        });
    }

    /// Fail the next call to `op` that targets `path` with `error`.
    pub fn fail_path(&self, op: HostOp, path: impl Into<String>, error: HostError) {
        self.lock().failures.push(InjectedFailure {
            op,
            path: Some(path.into()),
            error,
        });
    }

    /// Make a path read as missing for the next `probes` lookups, whether or
    /// not it exists yet.
    pub fn hide_from_probes(&self, repo: &str, path: &str, probes: u32) {
        self.lock()
            .hidden
            .insert((repo.to_string(), path.to_string()), probes);
    }

    /// Create a repository with the given files without recording calls.
    pub fn seed_repository<'a>(
        &self,
        repo: &str,
        files: impl IntoIterator<Item = (&'a str, &'a [u8])>,
    ) {
        let mut state = self.lock();
        let entry = state.repos.entry(repo.to_string()).or_default();
        for (path, content) in files {
            entry.write(repo, path, content.to_vec());
        }
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<HostCall> {
        self.lock().calls.clone()
    }

    #[must_use]
    pub fn call_count(&self, op: HostOp) -> usize {
        self.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    #[must_use]
    pub fn repository_exists(&self, repo: &str) -> bool {
        self.lock().repos.contains_key(repo)
    }

    #[must_use]
    pub fn file(&self, repo: &str, path: &str) -> Option<Vec<u8>> {
        self.lock()
            .repos
            .get(repo)
            .and_then(|r| r.files.get(path))
            .map(|f| f.content.clone())
    }

    #[must_use]
    pub fn file_text(&self, repo: &str, path: &str) -> Option<String> {
        self.file(repo, path)
            .and_then(|bytes| String::from_utf8(bytes).ok())
    }

    /// Current content marker of a path.
    #[must_use]
    pub fn file_sha(&self, repo: &str, path: &str) -> Option<String> {
        self.lock()
            .repos
            .get(repo)
            .and_then(|r| r.files.get(path))
            .map(|f| f.sha.clone())
    }

    #[must_use]
    pub fn paths(&self, repo: &str) -> Vec<String> {
        self.lock()
            .repos
            .get(repo)
            .map(|r| r.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn head(&self, repo: &str) -> Option<String> {
        self.lock().repos.get(repo).map(|r| r.head.clone())
    }

    #[must_use]
    pub fn commit_count(&self, repo: &str) -> u64 {
        self.lock().repos.get(repo).map_or(0, |r| r.commits)
    }

    #[must_use]
    pub fn pages_enabled(&self, repo: &str) -> bool {
        self.lock().repos.get(repo).is_some_and(|r| r.pages)
    }

    /// Record `call` and return the injected failure for it, if any.
    fn enter(&self, state: &mut MemoryState, call: HostCall) -> Result<(), HostError> {
        let op = call.op();
        let position = state.failures.iter().position(|f| {
            f.op == op && f.path.as_deref().is_none_or(|p| Some(p) == call.path())
        });
        state.calls.push(call);
        match position {
            Some(index) => Err(state.failures.remove(index).error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RepoHost for MemoryHost {
    fn owner(&self) -> &str {
        &self.owner
    }

    async fn create_repository(&self, name: &str) -> Result<RepoCreation, HostError> {
        let mut state = self.lock();
        self.enter(
            &mut state,
            HostCall::CreateRepository {
                name: name.to_string(),
            },
        )?;
        if state.repos.contains_key(name) {
            return Ok(RepoCreation::AlreadyExists);
        }

        let mut repo = MemoryRepo::default();
        repo.write(name, "README.md", format!("# {name}\n").into_bytes());
        repo.write(name, "LICENSE", b"MIT License\n".to_vec());
        state.repos.insert(name.to_string(), repo);
        Ok(RepoCreation::Created)
    }

    async fn branch_head(&self, repo: &str, branch: &str) -> Result<String, HostError> {
        let mut state = self.lock();
        self.enter(
            &mut state,
            HostCall::BranchHead {
                repo: repo.to_string(),
                branch: branch.to_string(),
            },
        )?;
        state
            .repos
            .get(repo)
            .map(|r| r.head.clone())
            .ok_or_else(|| not_found("Branch"))
    }

    async fn get_file(
        &self,
        repo: &str,
        path: &str,
        _branch: &str,
    ) -> Result<Option<RemoteFile>, HostError> {
        let mut state = self.lock();
        self.enter(
            &mut state,
            HostCall::GetFile {
                repo: repo.to_string(),
                path: path.to_string(),
            },
        )?;
        let state = &mut *state;
        let key = (repo.to_string(), path.to_string());
        if let Some(remaining) = state.hidden.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(None);
            }
        }
        Ok(state
            .repos
            .get(repo)
            .and_then(|r| r.files.get(path))
            .map(|f| RemoteFile {
                path: path.to_string(),
                sha: f.sha.clone(),
                size: f.content.len() as u64,
            }))
    }

    async fn put_file(&self, repo: &str, file: PutFile) -> Result<WriteReceipt, HostError> {
        let mut state = self.lock();
        self.enter(
            &mut state,
            HostCall::PutFile {
                repo: repo.to_string(),
                path: file.path.clone(),
                sha: file.sha.clone(),
                message: file.message.clone(),
            },
        )?;
        let entry = state
            .repos
            .get_mut(repo)
            .ok_or_else(|| not_found("Repository"))?;

        let current = entry.files.get(&file.path).map(|f| f.sha.as_str());
        match (current, file.sha.as_deref()) {
            (None, Some(_)) => {
                return Err(HostError::Rejected {
                    status: 422,
                    message: format!("sha supplied for new path {}", file.path),
                });
            }
            (Some(_), None) => {
                return Err(HostError::Rejected {
                    status: 422,
                    message: "\"sha\" wasn't supplied.".to_string(),
                });
            }
            (Some(current), Some(given)) if current != given => {
                return Err(HostError::Rejected {
                    status: 409,
                    message: format!("{} does not match {}", file.path, given),
                });
            }
            _ => {}
        }

        Ok(entry.write(repo, &file.path, file.content))
    }

    async fn list_directory(
        &self,
        repo: &str,
        path: &str,
        _branch: &str,
    ) -> Result<Vec<DirEntry>, HostError> {
        let mut state = self.lock();
        self.enter(
            &mut state,
            HostCall::ListDirectory {
                repo: repo.to_string(),
                path: path.to_string(),
            },
        )?;
        let entry = state.repos.get(repo).ok_or_else(|| not_found("Repository"))?;

        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path.trim_end_matches('/'))
        };
        let mut listing: BTreeMap<String, DirEntry> = BTreeMap::new();
        for (file_path, stored) in &entry.files {
            let Some(rest) = file_path.strip_prefix(&prefix) else {
                continue;
            };
            let (name, kind) = match rest.split_once('/') {
                Some((dir, _)) => (dir, EntryKind::Dir),
                None => (rest, EntryKind::File),
            };
            listing.entry(name.to_string()).or_insert_with(|| DirEntry {
                name: name.to_string(),
                path: format!("{prefix}{name}"),
                kind,
                sha: if kind == EntryKind::File {
                    stored.sha.clone()
                } else {
                    content_sha(name.as_bytes())
                },
                size: if kind == EntryKind::File {
                    stored.content.len() as u64
                } else {
                    0
                },
            });
        }
        Ok(listing.into_values().collect())
    }

    async fn fetch_raw(&self, repo: &str, path: &str, _branch: &str) -> Result<Vec<u8>, HostError> {
        let mut state = self.lock();
        self.enter(
            &mut state,
            HostCall::FetchRaw {
                repo: repo.to_string(),
                path: path.to_string(),
            },
        )?;
        state
            .repos
            .get(repo)
            .and_then(|r| r.files.get(path))
            .map(|f| f.content.clone())
            .ok_or_else(|| not_found("File"))
    }

    async fn enable_pages(&self, repo: &str, branch: &str) -> Result<PagesStatus, HostError> {
        let mut state = self.lock();
        self.enter(
            &mut state,
            HostCall::EnablePages {
                repo: repo.to_string(),
                branch: branch.to_string(),
            },
        )?;
        let entry = state
            .repos
            .get_mut(repo)
            .ok_or_else(|| not_found("Repository"))?;
        if entry.pages {
            Ok(PagesStatus::AlreadyEnabled)
        } else {
            entry.pages = true;
            Ok(PagesStatus::Enabled)
        }
    }
}
