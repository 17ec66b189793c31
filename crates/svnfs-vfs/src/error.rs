use std::io;

use svnfs_ra::RaError;
use thiserror::Error;

use crate::path::PathError;

/// Errors that can occur during filesystem operations
#[derive(Error, Debug)]
pub enum VfsError {
    #[error("Malformed path: {0}")]
    Malformed(#[from] PathError),

    #[error("No such entry: {0}")]
    NoSuchEntry(String),

    #[error("Backend communication failure: {0}")]
    Backend(#[source] RaError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Not opened: {0}")]
    NotOpened(String),

    #[error("Cannot allocate spool file: {0}")]
    ResourceExhausted(#[source] io::Error),

    #[error("Backend lock unavailable")]
    LockUnavailable,
}

pub type Result<T> = std::result::Result<T, VfsError>;

impl VfsError {
    /// Classify a backend failure for `virtual_path`.
    pub fn from_backend(err: RaError, virtual_path: &str) -> Self {
        match err {
            e if e.is_not_found() => VfsError::NoSuchEntry(virtual_path.to_string()),
            RaError::Sink(e) => VfsError::Io(e),
            e => VfsError::Backend(e),
        }
    }

    /// errno reported to the kernel.
    pub fn errno(&self) -> i32 {
        match self {
            VfsError::Malformed(_) | VfsError::NoSuchEntry(_) => libc::ENOENT,
            VfsError::Backend(_) => libc::EPIPE,
            VfsError::Io(_) | VfsError::NotOpened(_) => libc::EIO,
            VfsError::ResourceExhausted(_) => libc::ENOMEM,
            VfsError::LockUnavailable => libc::EBUSY,
        }
    }
}
