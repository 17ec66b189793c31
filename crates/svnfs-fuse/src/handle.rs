//! Open directory handles.
//!
//! `opendir` takes one listing from the backend and parks it here; the
//! `readdir` calls that follow page through that snapshot by offset.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use svnfs_vfs::DirectoryEntry;

pub struct DirHandles {
    open: DashMap<u64, Arc<Vec<DirectoryEntry>>>,
    next: AtomicU64,
}

impl Default for DirHandles {
    fn default() -> Self {
        Self::new()
    }
}

impl DirHandles {
    pub fn new() -> Self {
        Self {
            open: DashMap::new(),
            next: AtomicU64::new(1),
        }
    }

    /// Park a listing and return its handle.
    pub fn insert(&self, entries: Vec<DirectoryEntry>) -> u64 {
        let fh = self.next.fetch_add(1, Ordering::Relaxed);
        self.open.insert(fh, Arc::new(entries));
        fh
    }

    pub fn get(&self, fh: u64) -> Option<Arc<Vec<DirectoryEntry>>> {
        self.open.get(&fh).map(|entries| Arc::clone(entries.value()))
    }

    pub fn remove(&self, fh: u64) {
        self.open.remove(&fh);
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}
