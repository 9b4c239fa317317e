//! Sync configuration for gitsync
//!
//! The sync file is a JSON document listing which branches to carry from a
//! source remote to a target remote. It may hold credentials-adjacent data
//! (remote names map to private hosts), so it must be owner-read-only
//! (`0400`) unless the caller explicitly accepts an insecure file.

pub mod settings;

pub use settings::{Settings, SettingsOverrides};

use serde::{Deserialize, Serialize};
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default sync file name, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = ".gitsync.conf";

/// The only permission mode accepted without `--insecure`
pub const REQUIRED_MODE: u32 = 0o400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {} does not exist", .path.display())]
    NotFound { path: PathBuf },

    #[error("could not stat config file {}", .path.display())]
    StatError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config file {} is not read only (r--------), found {found}", .path.display())]
    InsecurePermissions { path: PathBuf, found: String },

    #[error("could not read config file {}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not process config file {}, invalid JSON?", .path.display())]
    MalformedConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("sync entry {index} is invalid: {reason}")]
    InvalidRule { index: usize, reason: &'static str },
}

/// One declared intent: mirror `branches` from `source_remote` to `target_remote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRule {
    pub source_remote: String,
    pub target_remote: String,
    pub branches: Vec<String>,
}

impl SyncRule {
    pub fn new<I, S>(source_remote: &str, target_remote: &str, branches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source_remote: source_remote.to_string(),
            target_remote: target_remote.to_string(),
            branches: branches.into_iter().map(Into::into).collect(),
        }
    }

    /// Why this rule is not well-formed, if it isn't.
    pub fn shape_error(&self) -> Option<&'static str> {
        if self.source_remote.is_empty() {
            Some("source_remote is empty")
        } else if self.target_remote.is_empty() {
            Some("target_remote is empty")
        } else if self.branches.is_empty() {
            Some("no branches listed")
        } else {
            None
        }
    }
}

/// The full sync file, loaded once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfiguration {
    pub sync: Vec<SyncRule>,
}

impl SyncConfiguration {
    pub fn new(sync: Vec<SyncRule>) -> Self {
        Self { sync }
    }

    /// Load the sync file at `path`.
    ///
    /// The permission check runs before the file is read. The returned
    /// configuration has already passed [`SyncConfiguration::validate`].
    pub fn load(path: &Path, allow_insecure: bool) -> Result<Self, ConfigError> {
        match fs::metadata(path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            _ => {}
        }

        // lstat: a symlinked config is judged by the link, not its target
        let metadata = fs::symlink_metadata(path).map_err(|source| ConfigError::StatError {
            path: path.to_path_buf(),
            source,
        })?;

        if !is_owner_read_only(&metadata) {
            if !allow_insecure {
                return Err(ConfigError::InsecurePermissions {
                    path: path.to_path_buf(),
                    found: describe_mode(&metadata),
                });
            }
            debug!(
                "accepting insecure config file {} ({})",
                path.display(),
                describe_mode(&metadata)
            );
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let config: SyncConfiguration =
            serde_json::from_str(&content).map_err(|source| ConfigError::MalformedConfig {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        debug!("loaded {} sync entries from {}", config.sync.len(), path.display());
        Ok(config)
    }

    /// All-or-nothing shape gate: one malformed rule rejects the whole file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, rule) in self.sync.iter().enumerate() {
            if let Some(reason) = rule.shape_error() {
                return Err(ConfigError::InvalidRule { index, reason });
            }
        }
        Ok(())
    }

    pub fn rules(&self) -> &[SyncRule] {
        &self.sync
    }

    pub fn is_empty(&self) -> bool {
        self.sync.is_empty()
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(unix)]
fn is_owner_read_only(metadata: &Metadata) -> bool {
    metadata.file_type().is_file() && permission_bits(metadata) == REQUIRED_MODE
}

#[cfg(unix)]
fn describe_mode(metadata: &Metadata) -> String {
    if metadata.file_type().is_symlink() {
        return "a symlink".to_string();
    }
    format!("{:04o}", permission_bits(metadata))
}

// Only the read-only attribute is visible off unix
#[cfg(not(unix))]
fn is_owner_read_only(metadata: &Metadata) -> bool {
    metadata.file_type().is_file() && metadata.permissions().readonly()
}

#[cfg(not(unix))]
fn describe_mode(metadata: &Metadata) -> String {
    if metadata.permissions().readonly() {
        "read-only".to_string()
    } else {
        "writable".to_string()
    }
}
