//! # svnfs-config
//!
//! Configuration management for svnfs.
//!
//! Loads configuration from:
//! 1. `~/.svnfs/config.toml` (global)
//! 2. Environment variables (highest priority)
//!
//! Command-line flags are applied on top by the binary.

pub mod logging;
pub mod path;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub use logging::{init_logging, Component, LogLevel};

/// Default attribute/entry cache lifetime handed to the kernel.
pub const DEFAULT_ATTR_TTL_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub spool: SpoolConfig,
    pub fuse: FuseConfig,
    pub log: LogConfig,
}

impl Config {
    /// Load config from the standard location plus environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::global_config_path() {
            Some(global_path) if global_path.exists() => Self::load_from(&global_path)?,
            _ => Config::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a single config file, without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading config from {:?}", path);
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Global config path: ~/.svnfs/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".svnfs/config.toml"))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("SVNFS_SPOOL_DIR") {
            if !dir.is_empty() {
                self.spool.dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(threads) = std::env::var("SVNFS_THREADS") {
            if let Ok(n) = threads.parse() {
                self.fuse.threads = Some(n);
            }
        }
    }

    /// Effective spool directory: configured value (tilde-expanded) or the
    /// system temporary-file area.
    pub fn spool_dir(&self) -> PathBuf {
        match &self.spool.dir {
            Some(dir) => path::expand_home(dir),
            None => std::env::temp_dir(),
        }
    }

    /// Configured log level, falling back to `warn` for unknown names.
    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse(&self.log.level).unwrap_or(LogLevel::Warn)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Spool (read-through cache) configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpoolConfig {
    /// Directory holding spool files (None = system temp dir)
    pub dir: Option<PathBuf>,
}

/// Mount configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuseConfig {
    /// Worker threads serving requests (None = one per CPU)
    pub threads: Option<usize>,
    /// Seconds the kernel may cache attributes and lookups
    pub attr_ttl_secs: u64,
    /// Filesystem name shown in mount tables
    pub fsname: String,
    /// Let users other than the mounting user access the mount
    pub allow_other: bool,
    /// Ask the kernel to unmount when the process exits
    pub auto_unmount: bool,
}

impl Default for FuseConfig {
    fn default() -> Self {
        Self {
            threads: None,
            attr_ttl_secs: DEFAULT_ATTR_TTL_SECS,
            fsname: "svnfs".to_string(),
            allow_other: false,
            auto_unmount: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter when neither SVNFS_LOG nor RUST_LOG is set
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}
