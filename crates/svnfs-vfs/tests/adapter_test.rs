//! Integration tests for the filesystem operations, run against the
//! in-memory repository.

use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use svnfs_ra::memory::{Change, MemoryRepository};
use svnfs_ra::{DirEntry, RaError, RepositorySession, Revnum, Stat};
use svnfs_vfs::{split, FileKind, PathError, RevisionFs, VfsError};
use tempfile::{tempdir, TempDir};

fn five_revisions() -> MemoryRepository {
    let mut repo = MemoryRepository::new();
    repo.commit(&[Change::Dir("/trunk")]);
    repo.commit(&[Change::File("/foo", b"hi")]);
    repo.commit(&[Change::File("/foo", b"hello")]);
    repo.commit(&[Change::File("/trunk/big.bin", &[7u8; 100_000])]);
    repo.commit(&[Change::Delete("/foo")]);
    repo
}

fn mount(repo: MemoryRepository) -> (Arc<MemoryRepository>, RevisionFs<Arc<MemoryRepository>>, TempDir) {
    let spool = tempdir().unwrap();
    let repo = Arc::new(repo);
    let fs = RevisionFs::new(Arc::clone(&repo), spool.path());
    (repo, fs, spool)
}

#[test]
fn test_root_lists_revisions_newest_first() {
    let (_repo, fs, _spool) = mount(five_revisions());
    assert_eq!(
        fs.list_directory("/").unwrap(),
        vec![".", "..", "5", "4", "3", "2", "1"]
    );
}

#[test]
fn test_root_listing_of_empty_repository() {
    let (_repo, fs, _spool) = mount(MemoryRepository::new());
    assert_eq!(fs.list_directory("/").unwrap(), vec![".", ".."]);
}

#[test]
fn test_open_and_read_file() {
    let (_repo, fs, _spool) = mount(five_revisions());
    fs.open("/3/foo").unwrap();

    let mut buf = [0u8; 5];
    assert_eq!(fs.read("/3/foo", &mut buf, 0).unwrap(), 5);
    assert_eq!(&buf, b"hello");

    assert_eq!(fs.read("/3/foo", &mut buf, 5).unwrap(), 0);
    assert_eq!(fs.read("/3/foo", &mut buf, 500).unwrap(), 0);
}

#[test]
fn test_each_revision_keeps_its_content() {
    let (_repo, fs, _spool) = mount(five_revisions());
    fs.open("/2/foo").unwrap();
    fs.open("/3/foo").unwrap();

    let mut buf = [0u8; 16];
    let n = fs.read("/2/foo", &mut buf, 0).unwrap();
    assert_eq!(&buf[..n], b"hi");
    let n = fs.read("/3/foo", &mut buf, 0).unwrap();
    assert_eq!(&buf[..n], b"hello");

    assert!(matches!(fs.open("/5/foo"), Err(VfsError::NoSuchEntry(_))));
}

#[test]
fn test_missing_path_is_no_such_entry() {
    let (_repo, fs, _spool) = mount(five_revisions());
    let err = fs.get_attributes("/3/does-not-exist").unwrap_err();
    assert!(matches!(err, VfsError::NoSuchEntry(_)));
    assert_eq!(err.errno(), libc::ENOENT);
}

#[test]
fn test_malformed_paths() {
    let (repo, fs, _spool) = mount(five_revisions());

    assert_eq!(split("/abc"), Err(PathError::MissingRevision));
    let zero = split("/0").unwrap();
    assert_eq!((zero.revision, zero.repo_path), (0, "/"));

    for bad in ["/abc", "/3x/foo", "relative"] {
        let err = fs.get_attributes(bad).unwrap_err();
        assert_eq!(err.errno(), libc::ENOENT, "{bad}");
        assert_eq!(fs.open(bad).unwrap_err().errno(), libc::ENOENT, "{bad}");
        assert_eq!(fs.list_directory(bad).unwrap_err().errno(), libc::ENOENT, "{bad}");
    }
    // Rejected before reaching the backend
    assert_eq!(repo.calls().stat, 0);
    assert_eq!(repo.calls().fetch_file, 0);
}

#[test]
fn test_open_twice_fetches_once() {
    let (repo, fs, _spool) = mount(five_revisions());
    fs.open("/3/foo").unwrap();
    fs.open("/3/foo").unwrap();

    assert_eq!(repo.calls().fetch_file, 1);
    let stats = fs.cache_stats();
    assert_eq!((stats.entries, stats.hits, stats.misses), (1, 1, 1));
}

#[test]
fn test_read_round_trip_large_file() {
    let (_repo, fs, _spool) = mount(five_revisions());
    fs.open("/4/trunk/big.bin").unwrap();

    let mut expected = Vec::new();
    five_revisions()
        .fetch_file("/trunk/big.bin", 4, &mut expected)
        .unwrap();

    let mut buf = vec![0u8; 200_000];
    let n = fs.read("/4/trunk/big.bin", &mut buf, 0).unwrap();
    assert_eq!(n, expected.len());
    assert_eq!(&buf[..n], &expected[..]);

    // Out-of-order ranged reads
    let mut tail = [0u8; 10];
    assert_eq!(fs.read("/4/trunk/big.bin", &mut tail, 99_995).unwrap(), 5);
    let mut head = [0u8; 10];
    assert_eq!(fs.read("/4/trunk/big.bin", &mut head, 0).unwrap(), 10);
}

#[test]
fn test_read_without_open_is_io_error() {
    let (_repo, fs, _spool) = mount(five_revisions());
    let err = fs.read("/3/foo", &mut [0u8; 4], 0).unwrap_err();
    assert!(matches!(err, VfsError::NotOpened(_)));
    assert_eq!(err.errno(), libc::EIO);
}

#[test]
fn test_attributes() {
    let (_repo, fs, _spool) = mount(five_revisions());

    let file = fs.get_attributes("/3/foo").unwrap();
    assert_eq!((file.kind, file.perm, file.size), (FileKind::File, 0o644, 5));
    assert!(file.modified.is_some());

    let dir = fs.get_attributes("/4/trunk").unwrap();
    assert_eq!((dir.kind, dir.perm), (FileKind::Directory, 0o755));
}

#[test]
fn test_list_revision_directory() {
    let (_repo, fs, _spool) = mount(five_revisions());
    let names = fs.list_directory("/4/trunk").unwrap();
    assert_eq!(names, vec![".", "..", "big.bin"]);
}

#[test]
fn test_concurrent_opens_never_overlap_fetches() {
    let mut repo = MemoryRepository::new();
    let names: Vec<String> = (0..6).map(|i| format!("/f{i}")).collect();
    let contents: Vec<Vec<u8>> = (0..6).map(|i| vec![b'a' + i as u8; 1000 + i]).collect();
    let changes: Vec<Change<'_>> = names
        .iter()
        .zip(&contents)
        .map(|(n, c)| Change::File(n, c))
        .collect();
    repo.commit(&changes);

    let (repo, fs, _spool) = mount(repo.with_fetch_delay(Duration::from_millis(20)));
    let fs = Arc::new(fs);

    thread::scope(|s| {
        for name in &names {
            let open_fs = Arc::clone(&fs);
            s.spawn(move || {
                let path = format!("/1{name}");
                open_fs.open(&path).unwrap();
            });
            // Metadata calls race with the fetches
            let meta_fs = Arc::clone(&fs);
            s.spawn(move || {
                meta_fs.get_attributes("/1").unwrap();
                meta_fs.list_directory("/1").unwrap();
            });
        }
    });

    assert!(!repo.overlap_detected());
    assert_eq!(repo.calls().fetch_file, names.len());

    for (name, content) in names.iter().zip(&contents) {
        let mut buf = vec![0u8; 4096];
        let n = fs.read(&format!("/1{name}"), &mut buf, 0).unwrap();
        assert_eq!(&buf[..n], &content[..]);
    }
}

#[test]
fn test_racing_opens_of_same_path_fetch_once() {
    let mut repo = MemoryRepository::new();
    repo.commit(&[Change::File("/shared", b"same bytes")]);
    let (repo, fs, _spool) = mount(repo.with_fetch_delay(Duration::from_millis(50)));
    let fs = Arc::new(fs);

    thread::scope(|s| {
        for _ in 0..4 {
            let fs = Arc::clone(&fs);
            s.spawn(move || fs.open("/1/shared").unwrap());
        }
    });

    assert_eq!(repo.calls().fetch_file, 1);
}

/// Session whose every call fails at the transport level.
struct BrokenSession;

impl RepositorySession for BrokenSession {
    fn latest_revision(&self) -> svnfs_ra::Result<Revnum> {
        Err(RaError::Io(io::ErrorKind::ConnectionReset.into()))
    }

    fn stat(&self, _path: &str, _revision: Revnum) -> svnfs_ra::Result<Stat> {
        Err(RaError::Io(io::ErrorKind::ConnectionReset.into()))
    }

    fn list_directory(&self, _path: &str, _revision: Revnum) -> svnfs_ra::Result<Vec<DirEntry>> {
        Err(RaError::Malformed("unexpected byte 0x00".into()))
    }

    fn fetch_file(&self, _path: &str, _revision: Revnum, sink: &mut dyn Write) -> svnfs_ra::Result<u64> {
        // Partial content before the failure
        sink.write_all(b"partial").map_err(RaError::Sink)?;
        Err(RaError::Io(io::ErrorKind::UnexpectedEof.into()))
    }
}

#[test]
fn test_backend_failures_are_communication_errors() {
    let spool = tempdir().unwrap();
    let fs = RevisionFs::new(BrokenSession, spool.path());

    assert_eq!(fs.get_attributes("/1/x").unwrap_err().errno(), libc::EPIPE);
    assert_eq!(fs.list_directory("/").unwrap_err().errno(), libc::EPIPE);
    assert_eq!(fs.list_directory("/1").unwrap_err().errno(), libc::EPIPE);

    let err = fs.open("/1/x").unwrap_err();
    assert!(matches!(err, VfsError::Backend(_)));
    assert_eq!(err.errno(), libc::EPIPE);

    // Nothing published, nothing left behind
    assert_eq!(fs.cache_stats().entries, 0);
    assert_eq!(std::fs::read_dir(spool.path()).unwrap().count(), 0);
    assert!(matches!(
        fs.read("/1/x", &mut [0u8; 4], 0),
        Err(VfsError::NotOpened(_))
    ));

    // Root attributes never touch the backend
    assert!(fs.get_attributes("/").is_ok());
}

#[test]
fn test_purge_spool_deletes_files_and_refetches() {
    let (repo, fs, spool) = mount(five_revisions());
    fs.open("/2/foo").unwrap();
    fs.open("/3/foo").unwrap();
    assert_eq!(std::fs::read_dir(spool.path()).unwrap().count(), 2);

    assert_eq!(fs.purge_spool(), (2, 7));
    assert_eq!(std::fs::read_dir(spool.path()).unwrap().count(), 0);
    assert!(matches!(
        fs.read("/3/foo", &mut [0u8; 4], 0),
        Err(VfsError::NotOpened(_))
    ));

    fs.open("/3/foo").unwrap();
    assert_eq!(repo.calls().fetch_file, 3);
}

/// Session whose fetch panics while the exclusive lock is held.
struct PanickingSession;

impl RepositorySession for PanickingSession {
    fn latest_revision(&self) -> svnfs_ra::Result<Revnum> {
        Ok(1)
    }

    fn stat(&self, path: &str, revision: Revnum) -> svnfs_ra::Result<Stat> {
        Err(RaError::NotFound {
            path: path.to_string(),
            revision,
        })
    }

    fn list_directory(&self, _path: &str, _revision: Revnum) -> svnfs_ra::Result<Vec<DirEntry>> {
        Ok(Vec::new())
    }

    fn fetch_file(&self, _path: &str, _revision: Revnum, _sink: &mut dyn Write) -> svnfs_ra::Result<u64> {
        panic!("fetch blew up");
    }
}

#[test]
fn test_poisoned_arbiter_reports_busy() {
    let spool = tempdir().unwrap();
    let fs = Arc::new(RevisionFs::new(PanickingSession, spool.path()));

    let opener = Arc::clone(&fs);
    assert!(thread::spawn(move || opener.open("/1/x")).join().is_err());

    let err = fs.get_attributes("/1/x").unwrap_err();
    assert!(matches!(err, VfsError::LockUnavailable));
    assert_eq!(err.errno(), libc::EBUSY);
    assert_eq!(fs.open("/1/y").unwrap_err().errno(), libc::EBUSY);
    assert_eq!(fs.list_directory("/").unwrap_err().errno(), libc::EBUSY);
    assert_eq!(fs.list_directory("/1").unwrap_err().errno(), libc::EBUSY);

    // The unwound fetch left no partial spool file behind
    assert_eq!(std::fs::read_dir(spool.path()).unwrap().count(), 0);
}
