//! Path helpers shared by the config loader and the command line.
//!
//! Config values and flags may use `~/` to refer to the home directory;
//! everything handed to the filesystem layer goes through these helpers first.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Expand a leading `~` or `~/` to the current user's home directory.
///
/// Paths without a tilde prefix (or when no home directory is known) are
/// returned unchanged.
///
/// # Example
/// ```ignore
/// let spool = expand_home("~/.svnfs/spool");
/// assert!(spool.is_absolute());
/// ```
pub fn expand_home(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) if rest.as_os_str().is_empty() => home,
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Make sure `path` exists and is a directory, creating it (and parents)
/// when missing. Returns the canonical form.
pub fn ensure_directory(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = expand_home(path);
    if !path.exists() {
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }
    if !path.is_dir() {
        anyhow::bail!("Not a directory: {}", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("Failed to resolve directory: {}", path.display()))
}
