//! `svn://` repository URLs.

use std::fmt;
use std::str::FromStr;

use crate::RaError;

/// Port svnserve listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 3690;

/// Parsed `svn://host[:port]/path` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryUrl {
    host: String,
    port: u16,
    /// Path on the server without leading or trailing `/` (may be empty)
    path: String,
}

impl RepositoryUrl {
    pub fn parse(url: &str) -> Result<Self, RaError> {
        let unsupported = || RaError::UnsupportedUrl(url.to_string());

        let rest = url.strip_prefix("svn://").ok_or_else(unsupported)?;
        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, ""),
        };
        // userinfo is not used by anonymous access
        let authority = authority.rsplit('@').next().unwrap_or(authority);

        let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
            let end = bracketed.find(']').ok_or_else(unsupported)?;
            let port = match &bracketed[end + 1..] {
                "" => None,
                p => Some(p.strip_prefix(':').ok_or_else(unsupported)?),
            };
            (&bracketed[..end], port)
        } else {
            match authority.rsplit_once(':') {
                Some((h, p)) => (h, Some(p)),
                None => (authority, None),
            }
        };

        if host.is_empty() {
            return Err(unsupported());
        }
        let port = match port {
            Some(p) => p.parse::<u16>().map_err(|_| unsupported())?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: host.to_string(),
            port,
            path: path.trim_matches('/').to_string(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Repository path on the server, without surrounding slashes
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl FromStr for RepositoryUrl {
    type Err = RaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RepositoryUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "svn://")?;
        if self.host.contains(':') {
            write!(f, "[{}]", self.host)?;
        } else {
            write!(f, "{}", self.host)?;
        }
        if self.port != DEFAULT_PORT {
            write!(f, ":{}", self.port)?;
        }
        if !self.path.is_empty() {
            write!(f, "/{}", self.path)?;
        }
        Ok(())
    }
}
