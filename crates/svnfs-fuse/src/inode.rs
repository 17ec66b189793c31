//! Inode numbers for virtual paths.
//!
//! The kernel addresses everything by inode. Paths get a number the first
//! time they are looked up or listed and keep it for the life of the mount.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

pub const ROOT_INODE: u64 = 1;

struct Tables {
    by_path: HashMap<String, u64>,
    by_ino: HashMap<u64, String>,
    next: u64,
}

pub struct InodeTable {
    tables: Mutex<Tables>,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    pub fn new() -> Self {
        let mut by_path = HashMap::new();
        let mut by_ino = HashMap::new();
        by_path.insert("/".to_string(), ROOT_INODE);
        by_ino.insert(ROOT_INODE, "/".to_string());
        Self {
            tables: Mutex::new(Tables {
                by_path,
                by_ino,
                next: ROOT_INODE + 1,
            }),
        }
    }

    /// Virtual path behind `ino`, if it was ever handed out.
    pub fn path_of(&self, ino: u64) -> Option<String> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables.by_ino.get(&ino).cloned()
    }

    /// Inode for `path`, assigning the next free number on first use.
    pub fn inode_for(&self, path: &str) -> u64 {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(&ino) = tables.by_path.get(path) {
            return ino;
        }
        let ino = tables.next;
        tables.next += 1;
        tables.by_path.insert(path.to_string(), ino);
        tables.by_ino.insert(ino, path.to_string());
        ino
    }

    pub fn len(&self) -> usize {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables.by_ino.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Path of `name` inside the directory `parent`.
pub fn child_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Path of the directory containing `path` (`/` for the root itself).
pub fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}
