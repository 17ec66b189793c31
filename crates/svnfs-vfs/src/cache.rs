//! Read-through spool cache.
//!
//! Maps an exact virtual path (`/3/trunk/README`) to a local file holding
//! that path's complete content. Revisions never change once committed, so
//! entries are never refreshed or evicted. Spool files live as long as the
//! cache and are deleted when it is dropped.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use svnfs_config::{log_cache_debug, log_cache_info};
use svnfs_ra::RepositorySession;
use tempfile::TempPath;

use crate::arbiter::ExclusiveSession;
use crate::error::{Result, VfsError};
use crate::path::RevisionPath;

/// Spool file names are `svnfs.` plus six random characters.
const SPOOL_PREFIX: &str = "svnfs.";
const SPOOL_RAND_LEN: usize = 6;

/// A fully written spool file
#[derive(Debug)]
pub struct CacheEntry {
    spool: TempPath,
    size: u64,
}

impl CacheEntry {
    pub fn spool_path(&self) -> &Path {
        &self.spool
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    /// Opens served without a fetch
    pub hits: u64,
    /// Fetches performed
    pub misses: u64,
}

pub struct SpoolCache {
    dir: PathBuf,
    entries: DashMap<String, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SpoolCache {
    /// Cache whose spool files are created in `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Spool file for `key`, if one has been published.
    pub fn lookup(&self, key: &str) -> Option<PathBuf> {
        self.entries
            .get(key)
            .map(|entry| entry.spool_path().to_path_buf())
    }

    /// Like [`lookup`](Self::lookup), counting a hit when present.
    pub fn probe(&self, key: &str) -> bool {
        let present = self.entries.contains_key(key);
        if present {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        present
    }

    /// Fetch `target` into a new spool file and publish it under `key`.
    ///
    /// Requires exclusive session access. If `key` was published while the
    /// caller waited for the lock, the existing file is returned and nothing
    /// is fetched. On failure nothing is published and the partial spool
    /// file is removed.
    pub fn populate<S: RepositorySession>(
        &self,
        key: &str,
        target: &RevisionPath<'_>,
        session: &ExclusiveSession<'_, S>,
    ) -> Result<PathBuf> {
        if let Some(existing) = self.lookup(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(existing);
        }

        // Created with O_EXCL; removed again if `spool` drops before publish
        let (file, spool) = tempfile::Builder::new()
            .prefix(SPOOL_PREFIX)
            .rand_bytes(SPOOL_RAND_LEN)
            .tempfile_in(&self.dir)
            .map_err(VfsError::ResourceExhausted)?
            .into_parts();

        let mut writer = BufWriter::new(file);
        let size = session
            .fetch_file(target.repo_path, target.revision, &mut writer)
            .map_err(|e| VfsError::from_backend(e, key))?;
        writer.flush()?;
        drop(writer.into_inner().map_err(|e| e.into_error())?);

        let path = spool.to_path_buf();
        self.misses.fetch_add(1, Ordering::Relaxed);
        let spool_name = path.display().to_string();
        log_cache_debug!(
            "Spooled file",
            path = key,
            bytes = size,
            spool = spool_name.as_str()
        );
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                spool,
                size,
            },
        );
        Ok(path)
    }

    /// Delete every spool file now. Returns the number of entries removed
    /// and their total size; later opens fetch again.
    pub fn purge(&self) -> (usize, u64) {
        let mut removed = 0;
        let mut bytes = 0;
        self.entries.retain(|_, entry| {
            removed += 1;
            bytes += entry.size();
            false
        });
        if removed > 0 {
            log_cache_info!("Removed spool files", entries = removed, bytes = bytes);
        }
        (removed, bytes)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Drop for SpoolCache {
    fn drop(&mut self) {
        let stats = self.stats();
        if stats.entries > 0 {
            log_cache_info!(
                "Removing spool files",
                entries = stats.entries,
                hits = stats.hits,
                misses = stats.misses
            );
        }
    }
}
