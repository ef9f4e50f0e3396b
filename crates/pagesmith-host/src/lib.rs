//! Repository host abstraction
//!
//! The round workflow and the content publisher talk to the remote repository
//! host only through [`RepoHost`]. [`GitHubHost`] is the production REST client;
//! with the `test-utils` feature, [`MemoryHost`] provides an in-memory host with
//! the same marker semantics for tests.

mod github;
#[cfg(any(test, feature = "test-utils"))]
mod memory;
mod types;

pub use github::GitHubHost;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{HostCall, HostOp, MemoryHost};
pub use pagesmith_utils::error::HostError;
pub use types::{
    DirEntry, EntryKind, PagesStatus, PutFile, RemoteFile, RepoCreation, RepoHost, WriteReceipt,
};
