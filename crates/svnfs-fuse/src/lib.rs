//! # svnfs-fuse
//!
//! Kernel binding for the revision filesystem.
//!
//! - Inodes are handed out lazily as paths are looked up or listed.
//! - Requests that may touch the repository run on a worker pool, so slow
//!   fetches do not stall metadata requests.
//! - The mount is read-only; file content is immutable per revision, so
//!   opened files keep the kernel page cache.

pub mod handle;
pub mod inode;

pub use handle::DirHandles;
pub use inode::{child_path, parent_path, InodeTable, ROOT_INODE};

use std::time::Duration;

use svnfs_config::{log_fuse_warn, FuseConfig};

/// Why a mount stopped serving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// SIGINT/SIGTERM reached the process
    Signal,
    /// The kernel tore the mount down (`fusermount -u`, `umount`)
    Unmounted,
}

impl Shutdown {
    pub fn as_str(self) -> &'static str {
        match self {
            Shutdown::Signal => "signal",
            Shutdown::Unmounted => "unmounted",
        }
    }
}

/// Everything that shapes the mount besides the filesystem itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountConfig {
    pub fsname: String,
    pub subtype: Option<String>,
    pub allow_other: bool,
    pub auto_unmount: bool,
    /// Worker threads (None = one per CPU)
    pub threads: Option<usize>,
    /// How long the kernel may cache attributes and lookups
    pub attr_ttl: Duration,
    /// Options passed to the kernel verbatim
    pub custom: Vec<String>,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self::from_config(&FuseConfig::default())
    }
}

impl MountConfig {
    pub fn from_config(config: &FuseConfig) -> Self {
        Self {
            fsname: config.fsname.clone(),
            subtype: Some("svnfs".to_string()),
            allow_other: config.allow_other,
            auto_unmount: config.auto_unmount,
            threads: config.threads,
            attr_ttl: Duration::from_secs(config.attr_ttl_secs),
            custom: Vec::new(),
        }
    }

    /// Apply a comma-separated `-o` option list.
    pub fn apply_options(&mut self, options: &str) {
        for opt in options.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            match opt {
                "ro" => {}
                "rw" => log_fuse_warn!("Ignoring mount option, mount is read-only", option = opt),
                "allow_other" => self.allow_other = true,
                "auto_unmount" => self.auto_unmount = true,
                _ => {
                    if let Some(name) = opt.strip_prefix("fsname=") {
                        self.fsname = name.to_string();
                    } else if let Some(name) = opt.strip_prefix("subtype=") {
                        self.subtype = Some(name.to_string());
                    } else {
                        self.custom.push(opt.to_string());
                    }
                }
            }
        }
    }
}

#[cfg(all(feature = "fuse", target_os = "linux"))]
mod imp {
    use std::ffi::OsStr;
    use std::path::Path;
    use std::sync::mpsc::Sender;
    use std::sync::Arc;
    use std::time::UNIX_EPOCH;

    use fuser::{
        FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyData, ReplyDirectory,
        ReplyEmpty, ReplyEntry, ReplyOpen, Request,
    };
    use libc::{c_int, EBADF, EINVAL, ENOENT, EROFS};
    use svnfs_config::{log_fuse_debug, log_fuse_warn};
    use svnfs_ra::RepositorySession;
    use svnfs_vfs::{Attributes, FileKind, RevisionFs};

    use crate::{child_path, parent_path, DirHandles, InodeTable, MountConfig, Shutdown, ROOT_INODE};

    const BLOCK_SIZE: u32 = 4096;

    struct Shared<S> {
        vfs: Arc<RevisionFs<S>>,
        inodes: InodeTable,
        dirs: DirHandles,
        config: MountConfig,
        uid: u32,
        gid: u32,
    }

    impl<S> Shared<S> {
        fn file_attr(&self, ino: u64, attrs: &Attributes) -> FileAttr {
            let mtime = attrs.modified.unwrap_or(UNIX_EPOCH);
            let (kind, nlink) = match attrs.kind {
                FileKind::Directory => (FileType::Directory, 2),
                FileKind::File => (FileType::RegularFile, 1),
            };
            FileAttr {
                ino,
                size: attrs.size,
                blocks: attrs.size.div_ceil(512),
                atime: mtime,
                mtime,
                ctime: mtime,
                crtime: mtime,
                kind,
                perm: attrs.perm,
                nlink,
                uid: self.uid,
                gid: self.gid,
                rdev: 0,
                flags: 0,
                blksize: BLOCK_SIZE,
            }
        }
    }

    fn file_type(kind: FileKind) -> FileType {
        match kind {
            FileKind::Directory => FileType::Directory,
            FileKind::File => FileType::RegularFile,
        }
    }

    pub struct SvnFs<S> {
        shared: Arc<Shared<S>>,
        pool: rayon::ThreadPool,
        on_destroy: Option<Sender<Shutdown>>,
    }

    /// A live mount served from a background thread. Dropping it unmounts.
    pub struct MountedFs {
        _session: fuser::BackgroundSession,
    }

    impl<S: RepositorySession + 'static> SvnFs<S> {
        pub fn new(vfs: Arc<RevisionFs<S>>, config: MountConfig) -> anyhow::Result<Self> {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.threads.unwrap_or(0))
                .thread_name(|i| format!("svnfs-worker-{i}"))
                .build()?;
            // SAFETY: getuid/getgid cannot fail
            let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
            Ok(Self {
                shared: Arc::new(Shared {
                    vfs,
                    inodes: InodeTable::new(),
                    dirs: DirHandles::new(),
                    config,
                    uid,
                    gid,
                }),
                pool,
                on_destroy: None,
            })
        }

        /// Send [`Shutdown::Unmounted`] on `tx` when the kernel ends the session.
        pub fn notify_on_unmount(mut self, tx: Sender<Shutdown>) -> Self {
            self.on_destroy = Some(tx);
            self
        }

        /// Mount at `mountpoint` and serve from a background thread.
        pub fn spawn(self, mountpoint: &Path) -> anyhow::Result<MountedFs> {
            let config = &self.shared.config;
            let mut opts = vec![
                MountOption::RO,
                MountOption::FSName(config.fsname.clone()),
            ];
            if let Some(subtype) = &config.subtype {
                opts.push(MountOption::Subtype(subtype.clone()));
            }
            if config.allow_other {
                opts.push(MountOption::AllowOther);
            }
            if config.auto_unmount {
                opts.push(MountOption::AutoUnmount);
            }
            opts.extend(config.custom.iter().cloned().map(MountOption::CUSTOM));

            let session = fuser::spawn_mount2(self, mountpoint, &opts)?;
            Ok(MountedFs { _session: session })
        }

        fn path_of(&self, ino: u64) -> Option<String> {
            self.shared.inodes.path_of(ino)
        }
    }

    impl<S: RepositorySession + 'static> Filesystem for SvnFs<S> {
        fn destroy(&mut self) {
            let stats = self.shared.vfs.cache_stats();
            log_fuse_debug!(
                "Unmounting",
                inodes = self.shared.inodes.len(),
                spooled = stats.entries,
                hits = stats.hits,
                misses = stats.misses
            );
            if let Some(tx) = self.on_destroy.take() {
                // The receiver may already be gone after a signal
                let _ = tx.send(Shutdown::Unmounted);
            }
        }

        fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
            let (Some(parent), Some(name)) = (self.path_of(parent), name.to_str()) else {
                reply.error(ENOENT);
                return;
            };
            let path = child_path(&parent, name);
            let shared = Arc::clone(&self.shared);
            self.pool.spawn(move || match shared.vfs.get_attributes(&path) {
                Ok(attrs) => {
                    let ino = shared.inodes.inode_for(&path);
                    reply.entry(&shared.config.attr_ttl, &shared.file_attr(ino, &attrs), 0);
                }
                Err(e) => reply.error(e.errno()),
            });
        }

        fn getattr(&mut self, _req: &Request, ino: u64, reply: ReplyAttr) {
            let Some(path) = self.path_of(ino) else {
                reply.error(ENOENT);
                return;
            };
            let shared = Arc::clone(&self.shared);
            self.pool.spawn(move || match shared.vfs.get_attributes(&path) {
                Ok(attrs) => reply.attr(&shared.config.attr_ttl, &shared.file_attr(ino, &attrs)),
                Err(e) => reply.error(e.errno()),
            });
        }

        fn open(&mut self, _req: &Request, ino: u64, flags: c_int, reply: ReplyOpen) {
            if flags & libc::O_ACCMODE != libc::O_RDONLY {
                reply.error(EROFS);
                return;
            }
            let Some(path) = self.path_of(ino) else {
                reply.error(ENOENT);
                return;
            };
            let shared = Arc::clone(&self.shared);
            self.pool.spawn(move || match shared.vfs.open(&path) {
                Ok(()) => reply.opened(0, fuser::consts::FOPEN_KEEP_CACHE),
                Err(e) => reply.error(e.errno()),
            });
        }

        fn read(
            &mut self,
            _req: &Request,
            ino: u64,
            _fh: u64,
            offset: i64,
            size: u32,
            _flags: c_int,
            _lock_owner: Option<u64>,
            reply: ReplyData,
        ) {
            let Ok(offset) = u64::try_from(offset) else {
                reply.error(EINVAL);
                return;
            };
            let Some(path) = self.path_of(ino) else {
                reply.error(ENOENT);
                return;
            };
            let shared = Arc::clone(&self.shared);
            self.pool.spawn(move || {
                let mut buf = vec![0u8; size as usize];
                match shared.vfs.read(&path, &mut buf, offset) {
                    Ok(n) => reply.data(&buf[..n]),
                    Err(e) => reply.error(e.errno()),
                }
            });
        }

        fn release(
            &mut self,
            _req: &Request,
            _ino: u64,
            _fh: u64,
            _flags: c_int,
            _lock_owner: Option<u64>,
            _flush: bool,
            reply: ReplyEmpty,
        ) {
            // Spool files outlive handles
            reply.ok();
        }

        fn opendir(&mut self, _req: &Request, ino: u64, _flags: c_int, reply: ReplyOpen) {
            let Some(path) = self.path_of(ino) else {
                reply.error(ENOENT);
                return;
            };
            let shared = Arc::clone(&self.shared);
            self.pool.spawn(move || match shared.vfs.read_directory(&path) {
                Ok(entries) => {
                    let fh = shared.dirs.insert(entries);
                    reply.opened(fh, 0);
                }
                Err(e) => reply.error(e.errno()),
            });
        }

        fn readdir(
            &mut self,
            _req: &Request,
            ino: u64,
            fh: u64,
            offset: i64,
            mut reply: ReplyDirectory,
        ) {
            let (Some(path), Some(entries)) = (self.path_of(ino), self.shared.dirs.get(fh)) else {
                log_fuse_warn!("readdir on unknown handle", ino = ino, fh = fh);
                reply.error(EBADF);
                return;
            };
            let Ok(skip) = usize::try_from(offset) else {
                reply.error(EINVAL);
                return;
            };

            let inodes = &self.shared.inodes;
            for (i, entry) in entries.iter().enumerate().skip(skip) {
                let child_ino = match entry.name.as_str() {
                    "." => ino,
                    ".." if ino == ROOT_INODE => ROOT_INODE,
                    ".." => inodes.inode_for(parent_path(&path)),
                    name => inodes.inode_for(&child_path(&path, name)),
                };
                // Offset of the *next* entry
                if reply.add(child_ino, (i + 1) as i64, file_type(entry.kind), &entry.name) {
                    break;
                }
            }
            reply.ok();
        }

        fn releasedir(
            &mut self,
            _req: &Request,
            _ino: u64,
            fh: u64,
            _flags: c_int,
            reply: ReplyEmpty,
        ) {
            self.shared.dirs.remove(fh);
            reply.ok();
        }
    }
}

#[cfg(not(all(feature = "fuse", target_os = "linux")))]
mod imp {
    use std::path::Path;
    use std::sync::mpsc::Sender;
    use std::sync::Arc;

    use svnfs_ra::RepositorySession;
    use svnfs_vfs::RevisionFs;

    use crate::{MountConfig, Shutdown};

    /// Placeholder for builds without FUSE support
    pub struct SvnFs<S> {
        _vfs: Arc<RevisionFs<S>>,
    }

    /// Never constructed without FUSE support
    pub struct MountedFs {
        _private: (),
    }

    impl<S: RepositorySession + 'static> SvnFs<S> {
        pub fn new(vfs: Arc<RevisionFs<S>>, _config: MountConfig) -> anyhow::Result<Self> {
            Ok(Self { _vfs: vfs })
        }

        pub fn notify_on_unmount(self, _tx: Sender<Shutdown>) -> Self {
            self
        }

        pub fn spawn(self, _mountpoint: &Path) -> anyhow::Result<MountedFs> {
            #[cfg(not(target_os = "linux"))]
            anyhow::bail!(
                "FUSE support is only available on Linux (current: {})",
                std::env::consts::OS
            );
            #[cfg(target_os = "linux")]
            anyhow::bail!("svnfs was built without FUSE support; rebuild with --features fuse");
        }
    }
}

pub use imp::{MountedFs, SvnFs};
