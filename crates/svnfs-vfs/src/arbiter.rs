//! Reader/writer arbitration over the single repository session.
//!
//! Metadata calls (`stat`, `list_directory`, `latest_revision`) run under
//! [`Arbiter::shared`] and may overlap each other. A cache fill runs under
//! [`Arbiter::exclusive`] for its whole fetch-then-publish sequence. Guards
//! release the lock when dropped, early returns included.

use std::ops::Deref;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use svnfs_config::log_vfs_warn;

use crate::error::{Result, VfsError};

pub struct Arbiter<S> {
    session: RwLock<S>,
}

/// Session access in shared mode
pub struct SharedSession<'a, S>(RwLockReadGuard<'a, S>);

/// Session access in exclusive mode
pub struct ExclusiveSession<'a, S>(RwLockWriteGuard<'a, S>);

impl<S> Arbiter<S> {
    pub fn new(session: S) -> Self {
        Self {
            session: RwLock::new(session),
        }
    }

    /// Block until no exclusive holder remains.
    pub fn shared(&self) -> Result<SharedSession<'_, S>> {
        self.session.read().map(SharedSession).map_err(|_| {
            log_vfs_warn!("Session lock poisoned", mode = "shared");
            VfsError::LockUnavailable
        })
    }

    /// Block until every other holder is gone.
    pub fn exclusive(&self) -> Result<ExclusiveSession<'_, S>> {
        self.session.write().map(ExclusiveSession).map_err(|_| {
            log_vfs_warn!("Session lock poisoned", mode = "exclusive");
            VfsError::LockUnavailable
        })
    }
}

impl<S> Deref for SharedSession<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.0
    }
}

impl<S> Deref for ExclusiveSession<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.0
    }
}
