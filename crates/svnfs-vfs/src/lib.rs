//! # svnfs-vfs
//!
//! Revision-addressed virtual filesystem core.
//!
//! `/{rev}/{path}` resolves to `{path}` as it existed at revision `{rev}`;
//! `/` lists the revisions. This crate holds everything between the raw
//! repository session and the kernel binding:
//!
//! - [`path`]: virtual path codec
//! - [`arbiter`]: shared/exclusive access to the one session
//! - [`cache`]: read-through spool files
//! - [`adapter`]: the filesystem operations built from the above
//!
//! Errors map to errno values only at the boundary, via [`VfsError::errno`].

pub mod adapter;
pub mod arbiter;
pub mod cache;
pub mod error;
pub mod path;

pub use adapter::{Attributes, DirectoryEntry, FileKind, RevisionFs, DIR_PERM, FILE_PERM};
pub use arbiter::{Arbiter, ExclusiveSession, SharedSession};
pub use cache::{CacheEntry, CacheStats, SpoolCache};
pub use error::{Result, VfsError};
pub use path::{split, PathError, RevisionPath, VirtualPath};
