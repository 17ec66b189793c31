//! In-memory repository for tests.
//!
//! Revisions are full snapshots, so any revision can be queried after later
//! commits. The repository also records how often each operation ran and
//! whether any call overlapped a content fetch, which lets callers assert
//! on caching and locking behavior without a server.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::{canonical_path, DirEntry, NodeKind, RaError, RepositorySession, Result, Revnum, Stat};

/// Commit timestamp of revision 0; revision `n` is `n` minutes later.
const EPOCH_OFFSET_SECS: u64 = 1_600_000_000;

/// One change in a commit
#[derive(Debug, Clone, Copy)]
pub enum Change<'a> {
    /// Add or replace a file
    File(&'a str, &'a [u8]),
    /// Add a directory
    Dir(&'a str),
    /// Remove a node and everything under it
    Delete(&'a str),
}

#[derive(Debug, Clone)]
enum Content {
    File(Arc<Vec<u8>>),
    Directory,
}

#[derive(Debug, Clone)]
struct Node {
    content: Content,
    changed_in: Revnum,
}

type Tree = BTreeMap<String, Node>;

/// Per-operation call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub latest_revision: usize,
    pub stat: usize,
    pub list_directory: usize,
    pub fetch_file: usize,
}

#[derive(Default)]
struct Counters {
    latest_revision: AtomicUsize,
    stat: AtomicUsize,
    list_directory: AtomicUsize,
    fetch_file: AtomicUsize,
}

/// Tracks calls in flight to detect overlap with a fetch.
#[derive(Default)]
struct Activity {
    in_flight: AtomicUsize,
    fetching: AtomicBool,
    overlapped: AtomicBool,
}

struct CallGuard<'a> {
    activity: &'a Activity,
    fetch: bool,
}

impl<'a> CallGuard<'a> {
    fn enter(activity: &'a Activity, fetch: bool) -> Self {
        let others = activity.in_flight.fetch_add(1, Ordering::SeqCst);
        if activity.fetching.load(Ordering::SeqCst) || (fetch && others > 0) {
            activity.overlapped.store(true, Ordering::SeqCst);
        }
        if fetch {
            activity.fetching.store(true, Ordering::SeqCst);
        }
        Self { activity, fetch }
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        if self.fetch {
            self.activity.fetching.store(false, Ordering::SeqCst);
        }
        self.activity.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Repository held entirely in memory
pub struct MemoryRepository {
    revisions: Vec<Tree>,
    fetch_delay: Duration,
    counters: Counters,
    activity: Activity,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    /// Repository with only revision 0 (an empty root directory).
    pub fn new() -> Self {
        let mut root = Tree::new();
        root.insert(
            "/".to_string(),
            Node {
                content: Content::Directory,
                changed_in: 0,
            },
        );
        Self {
            revisions: vec![root],
            fetch_delay: Duration::ZERO,
            counters: Counters::default(),
            activity: Activity::default(),
        }
    }

    /// Make every `fetch_file` take at least `delay`.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Apply `changes` as a new revision and return its number.
    ///
    /// Missing parent directories are created along the way.
    pub fn commit(&mut self, changes: &[Change<'_>]) -> Revnum {
        let revision = self.revisions.len() as Revnum;
        let mut tree = self.revisions[self.revisions.len() - 1].clone();

        for change in changes {
            match *change {
                Change::File(path, bytes) => {
                    let path = canonical_path(path);
                    Self::ensure_parents(&mut tree, &path, revision);
                    tree.insert(
                        path,
                        Node {
                            content: Content::File(Arc::new(bytes.to_vec())),
                            changed_in: revision,
                        },
                    );
                }
                Change::Dir(path) => {
                    let path = canonical_path(path);
                    Self::ensure_parents(&mut tree, &path, revision);
                    tree.entry(path).or_insert(Node {
                        content: Content::Directory,
                        changed_in: revision,
                    });
                }
                Change::Delete(path) => {
                    let path = canonical_path(path);
                    let prefix = format!("{path}/");
                    tree.retain(|k, _| *k != path && !k.starts_with(&prefix));
                }
            }
        }

        self.revisions.push(tree);
        revision
    }

    fn ensure_parents(tree: &mut Tree, path: &str, revision: Revnum) {
        let mut end = 0;
        while let Some(i) = path[end + 1..].find('/') {
            end += i + 1;
            tree.entry(path[..end].to_string()).or_insert(Node {
                content: Content::Directory,
                changed_in: revision,
            });
        }
    }

    /// How many times each operation has been called so far.
    pub fn calls(&self) -> CallCounts {
        CallCounts {
            latest_revision: self.counters.latest_revision.load(Ordering::SeqCst),
            stat: self.counters.stat.load(Ordering::SeqCst),
            list_directory: self.counters.list_directory.load(Ordering::SeqCst),
            fetch_file: self.counters.fetch_file.load(Ordering::SeqCst),
        }
    }

    /// True if any call ever ran while a `fetch_file` was in progress.
    pub fn overlap_detected(&self) -> bool {
        self.activity.overlapped.load(Ordering::SeqCst)
    }

    fn date_of(revision: Revnum) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(EPOCH_OFFSET_SECS + revision * 60)
    }

    fn node(&self, path: &str, revision: Revnum) -> Result<(&Tree, &Node)> {
        let not_found = || RaError::NotFound {
            path: path.to_string(),
            revision,
        };
        let tree = usize::try_from(revision)
            .ok()
            .and_then(|r| self.revisions.get(r))
            .ok_or_else(not_found)?;
        let node = tree.get(&canonical_path(path)).ok_or_else(not_found)?;
        Ok((tree, node))
    }

    fn stat_of(node: &Node) -> Stat {
        let (kind, size) = match &node.content {
            Content::File(bytes) => (NodeKind::File, bytes.len() as u64),
            Content::Directory => (NodeKind::Directory, 0),
        };
        Stat {
            kind,
            size,
            created_rev: Some(node.changed_in),
            last_changed: Some(Self::date_of(node.changed_in)),
        }
    }
}

fn parent_of(path: &str) -> Option<&str> {
    match path.rfind('/') {
        _ if path == "/" => None,
        Some(0) => Some("/"),
        Some(i) => Some(&path[..i]),
        None => None,
    }
}

impl RepositorySession for MemoryRepository {
    fn latest_revision(&self) -> Result<Revnum> {
        let _call = CallGuard::enter(&self.activity, false);
        self.counters.latest_revision.fetch_add(1, Ordering::SeqCst);
        Ok(self.revisions.len() as Revnum - 1)
    }

    fn stat(&self, path: &str, revision: Revnum) -> Result<Stat> {
        let _call = CallGuard::enter(&self.activity, false);
        self.counters.stat.fetch_add(1, Ordering::SeqCst);
        let (_, node) = self.node(path, revision)?;
        Ok(Self::stat_of(node))
    }

    fn list_directory(&self, path: &str, revision: Revnum) -> Result<Vec<DirEntry>> {
        let _call = CallGuard::enter(&self.activity, false);
        self.counters.list_directory.fetch_add(1, Ordering::SeqCst);
        let (tree, node) = self.node(path, revision)?;
        if !matches!(node.content, Content::Directory) {
            return Err(RaError::Server {
                code: crate::SVN_ERR_FS_NOT_DIRECTORY,
                message: format!("'{path}' is not a directory"),
            });
        }
        let dir = canonical_path(path);
        Ok(tree
            .iter()
            .filter(|(k, _)| parent_of(k) == Some(dir.as_str()))
            .map(|(k, node)| DirEntry {
                name: k.rsplit('/').next().unwrap_or_default().to_string(),
                stat: Self::stat_of(node),
            })
            .collect())
    }

    fn fetch_file(&self, path: &str, revision: Revnum, sink: &mut dyn Write) -> Result<u64> {
        let _call = CallGuard::enter(&self.activity, true);
        self.counters.fetch_file.fetch_add(1, Ordering::SeqCst);
        let (_, node) = self.node(path, revision)?;
        let Content::File(bytes) = &node.content else {
            return Err(RaError::Server {
                code: crate::SVN_ERR_FS_NOT_FILE,
                message: format!("'{path}' is not a file"),
            });
        };
        if !self.fetch_delay.is_zero() {
            std::thread::sleep(self.fetch_delay);
        }
        sink.write_all(bytes).map_err(RaError::Sink)?;
        Ok(bytes.len() as u64)
    }
}
