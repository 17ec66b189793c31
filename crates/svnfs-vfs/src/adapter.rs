//! Filesystem operations over revision paths.
//!
//! [`RevisionFs`] owns the session (behind the arbiter) and the spool cache
//! and answers the four operations a mount needs: attributes, open, read
//! and directory listing. It keeps no per-call state of its own.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::time::SystemTime;

use svnfs_config::{log_vfs_debug, log_vfs_warn};
use svnfs_ra::{NodeKind, RepositorySession, Stat};

use crate::arbiter::Arbiter;
use crate::cache::{CacheStats, SpoolCache};
use crate::error::{Result, VfsError};
use crate::path::{self, VirtualPath};

/// Mode bits for directories: rwxr-xr-x
pub const DIR_PERM: u16 = 0o755;
/// Mode bits for files: rw-r--r--
pub const FILE_PERM: u16 = 0o644;

/// What a path is, as far as the mount is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    pub kind: FileKind,
    pub perm: u16,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl Attributes {
    fn directory(modified: Option<SystemTime>) -> Self {
        Self {
            kind: FileKind::Directory,
            perm: DIR_PERM,
            size: 0,
            modified,
        }
    }

    fn from_stat(stat: &Stat) -> Self {
        match stat.kind {
            NodeKind::File => Self {
                kind: FileKind::File,
                perm: FILE_PERM,
                size: stat.size,
                modified: stat.last_changed,
            },
            NodeKind::Directory => Self::directory(stat.last_changed),
            // Present but unreadable
            NodeKind::Other => Self {
                kind: FileKind::File,
                perm: 0,
                size: 0,
                modified: stat.last_changed,
            },
        }
    }
}

/// One name in a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: FileKind,
}

impl DirectoryEntry {
    fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FileKind::Directory,
        }
    }
}

pub struct RevisionFs<S> {
    arbiter: Arbiter<S>,
    cache: SpoolCache,
}

impl<S: RepositorySession> RevisionFs<S> {
    /// Serve `session`, spooling file content into `spool_dir`.
    pub fn new(session: S, spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            arbiter: Arbiter::new(session),
            cache: SpoolCache::new(spool_dir),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Delete all spooled content; see [`SpoolCache::purge`].
    pub fn purge_spool(&self) -> (usize, u64) {
        self.cache.purge()
    }

    /// Attributes of `path`.
    pub fn get_attributes(&self, path: &str) -> Result<Attributes> {
        let target = match VirtualPath::parse(path)? {
            VirtualPath::Root => return Ok(Attributes::directory(None)),
            VirtualPath::Revision(target) => target,
        };

        let stat = self
            .arbiter
            .shared()?
            .stat(target.repo_path, target.revision)
            .map_err(|e| backend_failure("getattr", path, e))?;
        Ok(Attributes::from_stat(&stat))
    }

    /// Make the content of `path` readable, fetching it on first use.
    pub fn open(&self, path: &str) -> Result<()> {
        let target = path::split(path)?;

        if self.cache.probe(path) {
            log_vfs_debug!("Cache hit", path = path);
            return Ok(());
        }

        let session = self.arbiter.exclusive()?;
        self.cache
            .populate(path, &target, &session)
            .map_err(|e| {
                if !matches!(e, VfsError::NoSuchEntry(_)) {
                    let error = e.to_string();
                    log_vfs_warn!("open failed", path = path, error = error.as_str());
                }
                e
            })?;
        Ok(())
    }

    /// Read up to `buf.len()` bytes of an opened file starting at `offset`.
    ///
    /// Returns fewer bytes only at end of file; zero at or past it.
    pub fn read(&self, path: &str, buf: &mut [u8], offset: u64) -> Result<usize> {
        let spool = self
            .cache
            .lookup(path)
            .ok_or_else(|| VfsError::NotOpened(path.to_string()))?;

        let mut file = File::open(&spool)?;
        file.seek(SeekFrom::Start(offset))?;

        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    /// Entries of the directory `path`, starting with `.` and `..`.
    ///
    /// The root lists revisions from the latest down to 1.
    pub fn read_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>> {
        let mut entries = vec![DirectoryEntry::directory("."), DirectoryEntry::directory("..")];

        match VirtualPath::parse(path)? {
            VirtualPath::Root => {
                let latest = self
                    .arbiter
                    .shared()?
                    .latest_revision()
                    .map_err(|e| backend_failure("readdir", path, e))?;
                entries.extend((1..=latest).rev().map(|r| DirectoryEntry::directory(r.to_string())));
            }
            VirtualPath::Revision(target) => {
                let children = self
                    .arbiter
                    .shared()?
                    .list_directory(target.repo_path, target.revision)
                    .map_err(|e| backend_failure("readdir", path, e))?;
                entries.extend(children.into_iter().map(|child| DirectoryEntry {
                    kind: Attributes::from_stat(&child.stat).kind,
                    name: child.name,
                }));
            }
        }
        Ok(entries)
    }

    /// Names in the directory `path`, starting with `.` and `..`.
    pub fn list_directory(&self, path: &str) -> Result<Vec<String>> {
        Ok(self
            .read_directory(path)?
            .into_iter()
            .map(|entry| entry.name)
            .collect())
    }
}

fn backend_failure(op: &str, path: &str, err: svnfs_ra::RaError) -> VfsError {
    let err = VfsError::from_backend(err, path);
    if !matches!(err, VfsError::NoSuchEntry(_)) {
        let error = err.to_string();
        log_vfs_warn!("Backend call failed", op = op, path = path, error = error.as_str());
    }
    err
}
