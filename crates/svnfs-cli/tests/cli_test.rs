//! End-to-end tests for the svnfs binary.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

/// Run svnfs with `home` as the user's home directory.
fn svnfs(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_svnfs"))
        .args(args)
        .env("HOME", home)
        .env_remove("SVNFS_SPOOL_DIR")
        .env_remove("SVNFS_THREADS")
        .output()
        .expect("Failed to execute svnfs")
}

#[test]
fn test_help_lists_subcommands() {
    let home = tempdir().unwrap();
    let output = svnfs(home.path(), &["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("mount"));
    assert!(stdout.contains("config"));
}

#[test]
fn test_config_show_returns_valid_toml() {
    let home = tempdir().unwrap();
    let output = svnfs(home.path(), &["config", "show"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("[fuse]"), "Missing [fuse] section");

    let parsed: svnfs_config::Config = toml::from_str(&stdout).expect("config show should emit TOML");
    assert_eq!(parsed.fuse.attr_ttl_secs, svnfs_config::DEFAULT_ATTR_TTL_SECS);
}

#[test]
fn test_config_show_reads_global_file() {
    let home = tempdir().unwrap();
    std::fs::create_dir_all(home.path().join(".svnfs")).unwrap();
    std::fs::write(
        home.path().join(".svnfs/config.toml"),
        "[fuse]\nthreads = 3\nattr_ttl_secs = 5\n",
    )
    .unwrap();

    let output = svnfs(home.path(), &["config", "show"]);
    assert!(output.status.success());

    let parsed: svnfs_config::Config =
        toml::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(parsed.fuse.threads, Some(3));
    assert_eq!(parsed.fuse.attr_ttl_secs, 5);
}

#[test]
fn test_config_path_points_into_home() {
    let home = tempdir().unwrap();
    let output = svnfs(home.path(), &["config", "path"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.trim().ends_with(".svnfs/config.toml"), "{stdout}");
}

#[test]
fn test_mount_rejects_unsupported_url() {
    let home = tempdir().unwrap();
    let mountpoint = home.path().join("mnt");
    let output = svnfs(
        home.path(),
        &["mount", "http://example.com/repo", mountpoint.to_str().unwrap()],
    );
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Unsupported repository URL"), "{stderr}");
    // Fails before touching the filesystem
    assert!(!mountpoint.exists());
}

#[test]
fn test_mount_requires_mountpoint() {
    let home = tempdir().unwrap();
    let output = svnfs(home.path(), &["mount", "svn://localhost/repo"]);
    assert!(!output.status.success());
}
