//! Virtual path codec.
//!
//! ```text
//! /                      root: one directory per revision
//! /{rev}                 repository root as of {rev}
//! /{rev}/{repo-path}     {repo-path} as of {rev}
//! ```

use svnfs_ra::Revnum;
use thiserror::Error;

/// Why a string is not a virtual path
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    #[error("path is not absolute")]
    NotAbsolute,
    #[error("no revision specified")]
    MissingRevision,
    #[error("garbage after revision number")]
    TrailingGarbage,
    #[error("revision number out of range")]
    RevisionOverflow,
}

/// A repository path pinned to a revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionPath<'a> {
    pub revision: Revnum,
    /// Repository-absolute path (`/` for the revision's root)
    pub repo_path: &'a str,
}

impl RevisionPath<'_> {
    /// True for `/{rev}` itself.
    pub fn is_revision_root(&self) -> bool {
        self.repo_path == "/"
    }
}

/// Parsed form of any path under the mount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualPath<'a> {
    Root,
    Revision(RevisionPath<'a>),
}

impl<'a> VirtualPath<'a> {
    pub fn parse(path: &'a str) -> Result<Self, PathError> {
        if path == "/" {
            return Ok(VirtualPath::Root);
        }
        split(path).map(VirtualPath::Revision)
    }
}

/// Split `/{rev}[/{repo-path}]` into its revision and repository path.
///
/// The revision is the run of digits right after the leading `/`. An empty
/// run is an error even though it would parse as zero, so `/0` is revision
/// 0 while `/abc` is rejected.
pub fn split(path: &str) -> Result<RevisionPath<'_>, PathError> {
    let rest = path.strip_prefix('/').ok_or(PathError::NotAbsolute)?;

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Err(PathError::MissingRevision);
    }

    let (number, remainder) = rest.split_at(digits);
    if !remainder.is_empty() && !remainder.starts_with('/') {
        return Err(PathError::TrailingGarbage);
    }
    let revision = number
        .parse::<Revnum>()
        .map_err(|_| PathError::RevisionOverflow)?;

    Ok(RevisionPath {
        revision,
        repo_path: if remainder.is_empty() { "/" } else { remainder },
    })
}
