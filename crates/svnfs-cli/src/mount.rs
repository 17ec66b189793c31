//! `svnfs mount`

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use svnfs_config::path::ensure_directory;
use svnfs_config::{log_cli_info, log_cli_warn, Config};
use svnfs_fuse::{MountConfig, Shutdown, SvnFs};
use svnfs_ra::{RaSvnSession, RepositorySession};
use svnfs_vfs::RevisionFs;

#[derive(Args, Debug)]
pub struct MountArgs {
    /// Repository URL (svn://host[:port]/path)
    #[arg(value_name = "REPOSITORY_URL")]
    pub url: String,

    /// Directory to mount on (created if missing)
    #[arg(value_name = "MOUNTPOINT")]
    pub mountpoint: PathBuf,

    /// Where fetched file content is spooled
    #[arg(long, value_name = "DIR")]
    pub spool_dir: Option<PathBuf>,

    /// Worker threads serving kernel requests
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Let other users access the mount
    #[arg(long)]
    pub allow_other: bool,

    /// Mount options, comma separated (may repeat)
    #[arg(short = 'o', long = "options", value_name = "OPTS")]
    pub options: Vec<String>,
}

pub fn run(args: MountArgs, config: &Config) -> Result<()> {
    let mut mount_config = MountConfig::from_config(&config.fuse);
    for opts in &args.options {
        mount_config.apply_options(opts);
    }
    if let Some(threads) = args.threads {
        mount_config.threads = Some(threads);
    }
    if args.allow_other {
        mount_config.allow_other = true;
    }

    log_cli_info!("Connecting", url = args.url.as_str());
    let session = RaSvnSession::connect(&args.url)
        .with_context(|| format!("Failed to connect to {}", args.url))?;
    let latest = session
        .latest_revision()
        .with_context(|| format!("Failed to query latest revision of {}", args.url))?;
    let root = session.info().root_url.clone();
    log_cli_info!("Connected", root = root.as_str(), latest = latest);

    let spool_dir = args.spool_dir.clone().unwrap_or_else(|| config.spool_dir());
    let spool_dir = ensure_directory(&spool_dir)
        .with_context(|| format!("Spool directory {} is unusable", spool_dir.display()))?;

    let mountpoint = ensure_directory(&args.mountpoint).with_context(|| {
        format!("Failed to create mountpoint {}", args.mountpoint.display())
    })?;
    let occupied = std::fs::read_dir(&mountpoint)
        .with_context(|| format!("Cannot read mountpoint {}", mountpoint.display()))?
        .next()
        .is_some();
    if occupied {
        let shown = mountpoint.display().to_string();
        log_cli_warn!("Mountpoint is not empty, its contents will be hidden", mountpoint = shown.as_str());
    }

    let shown_spool = spool_dir.display().to_string();
    let shown_mount = mountpoint.display().to_string();
    log_cli_info!(
        "Mounting",
        mountpoint = shown_mount.as_str(),
        spool = shown_spool.as_str(),
        revisions = latest
    );

    let vfs = Arc::new(RevisionFs::new(session, spool_dir));
    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let signal_tx = shutdown_tx.clone();
    ctrlc::set_handler(move || {
        let _ = signal_tx.send(Shutdown::Signal);
    })
    .context("Failed to install signal handler")?;

    let mounted = SvnFs::new(Arc::clone(&vfs), mount_config)?
        .notify_on_unmount(shutdown_tx)
        .spawn(&mountpoint)
        .with_context(|| format!("Failed to mount at {}", mountpoint.display()))?;
    log_cli_info!("Mounted, press Ctrl-C to unmount", mountpoint = shown_mount.as_str());

    // The signal handler keeps a sender alive, so this only returns on an event
    let reason = shutdown_rx.recv().unwrap_or(Shutdown::Unmounted);
    drop(mounted);

    let (removed, bytes) = vfs.purge_spool();
    log_cli_info!(
        "Unmounted",
        mountpoint = shown_mount.as_str(),
        reason = reason.as_str(),
        spool_files_removed = removed,
        spool_bytes_removed = bytes
    );
    Ok(())
}
