//! # svnfs-ra
//!
//! Repository access for svnfs.
//!
//! A [`RepositorySession`] is one live connection to a Subversion repository
//! that can answer four questions about any committed revision: what is the
//! latest revision, what kind of node lives at a path, what a directory
//! contains, and what a file's bytes are.
//!
//! Sessions are *not* required to support overlapping calls on the wire.
//! Callers decide which calls may run together (see `svnfs-vfs`'s arbiter);
//! implementations only have to be memory-safe when shared across threads.
//!
//! ## Implementations
//!
//! - [`RaSvnSession`]: native `svn://` protocol client over TCP
//! - [`memory::MemoryRepository`]: in-memory repository for tests

pub mod item;
pub mod memory;
pub mod session;
pub mod url;

pub use session::{Connect, RaSvnSession, RepositoryInfo, TcpConnector};
pub use url::RepositoryUrl;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::SystemTime;

use thiserror::Error;

/// Subversion revision number.
pub type Revnum = u64;

/// `SVN_ERR_FS_NO_SUCH_REVISION`
pub const SVN_ERR_FS_NO_SUCH_REVISION: u64 = 160006;
/// `SVN_ERR_FS_NOT_FOUND`
pub const SVN_ERR_FS_NOT_FOUND: u64 = 160013;
/// `SVN_ERR_FS_NOT_DIRECTORY`
pub const SVN_ERR_FS_NOT_DIRECTORY: u64 = 160016;
/// `SVN_ERR_FS_NOT_FILE`
pub const SVN_ERR_FS_NOT_FILE: u64 = 160017;

/// Server error codes that mean "nothing lives there".
const NOT_FOUND_CODES: [u64; 2] = [SVN_ERR_FS_NOT_FOUND, SVN_ERR_FS_NO_SUCH_REVISION];

/// Errors that can occur while talking to a repository
#[derive(Error, Debug)]
pub enum RaError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Writing fetched content into the caller's sink failed. The session
    /// itself is still usable.
    #[error("Failed to write file content: {0}")]
    Sink(#[source] io::Error),

    #[error("Malformed server response: {0}")]
    Malformed(String),

    #[error("Path not found: {path}@{revision}")]
    NotFound { path: String, revision: Revnum },

    #[error("Server error {code}: {message}")]
    Server { code: u64, message: String },

    #[error("Unsupported repository URL: {0}")]
    UnsupportedUrl(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Unsupported protocol version: server speaks {min}..={max}, client speaks 2")]
    Version { min: u64, max: u64 },
}

pub type Result<T> = std::result::Result<T, RaError>;

impl RaError {
    /// True when the repository reported the path (or revision) absent.
    pub fn is_not_found(&self) -> bool {
        match self {
            RaError::NotFound { .. } => true,
            RaError::Server { code, .. } => NOT_FOUND_CODES.contains(code),
            _ => false,
        }
    }

    /// Whether the connection that produced this error can still be used.
    ///
    /// Transport and framing failures leave the wire in an unknown state;
    /// server-reported failures and sink failures do not.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            RaError::Io(_) | RaError::Malformed(_) | RaError::Auth(_) | RaError::Version { .. }
        )
    }

    /// Attach the path/revision to a not-found error.
    pub(crate) fn at(self, path: &str, revision: Revnum) -> Self {
        if self.is_not_found() {
            RaError::NotFound {
                path: path.to_string(),
                revision,
            }
        } else {
            self
        }
    }
}

/// Node kind as reported by the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
    /// Anything else the server reports (`unknown`, `symlink`, ...)
    Other,
}

impl NodeKind {
    /// Map a protocol kind word (`file`, `dir`, ...).
    pub fn from_word(word: &str) -> Self {
        match word {
            "file" => NodeKind::File,
            "dir" => NodeKind::Directory,
            _ => NodeKind::Other,
        }
    }
}

/// Metadata for one node at one revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub kind: NodeKind,
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Revision in which the node last changed
    pub created_rev: Option<Revnum>,
    /// Commit date of `created_rev`
    pub last_changed: Option<SystemTime>,
}

/// One child of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub stat: Stat,
}

/// A single connection to a versioned repository.
///
/// Paths are repository-absolute (`/`, `/trunk/README`). Every call may
/// block on network I/O.
pub trait RepositorySession: Send + Sync {
    /// Youngest committed revision.
    fn latest_revision(&self) -> Result<Revnum>;

    /// Kind and size of `path` as of `revision`.
    fn stat(&self, path: &str, revision: Revnum) -> Result<Stat>;

    /// Children of the directory `path` as of `revision`.
    fn list_directory(&self, path: &str, revision: Revnum) -> Result<Vec<DirEntry>>;

    /// Stream the full content of `path` as of `revision` into `sink`.
    /// Returns the number of bytes written.
    fn fetch_file(&self, path: &str, revision: Revnum, sink: &mut dyn Write) -> Result<u64>;
}

impl<S: RepositorySession + ?Sized> RepositorySession for Arc<S> {
    fn latest_revision(&self) -> Result<Revnum> {
        (**self).latest_revision()
    }

    fn stat(&self, path: &str, revision: Revnum) -> Result<Stat> {
        (**self).stat(path, revision)
    }

    fn list_directory(&self, path: &str, revision: Revnum) -> Result<Vec<DirEntry>> {
        (**self).list_directory(path, revision)
    }

    fn fetch_file(&self, path: &str, revision: Revnum, sink: &mut dyn Write) -> Result<u64> {
        (**self).fetch_file(path, revision, sink)
    }
}

/// Canonical repository-absolute form of `path`: leading `/`, no empty
/// segments, no trailing `/` (except for the root itself).
pub fn canonical_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}
