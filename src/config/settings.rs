//! Runtime settings
//!
//! Resolved with figment, lowest priority first: built-in defaults,
//! `GITSYNC_*` environment variables, command-line flags.

use figment::{
    Figment, Provider,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::DEFAULT_CONFIG_FILE;

pub const ENV_PREFIX: &str = "GITSYNC_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Sync file path
    pub config: PathBuf,

    /// Working copy to operate on, the current directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repodir: Option<PathBuf>,

    pub debug: bool,

    /// Skip the sync file permission check
    pub insecure: bool,

    /// Continue past failed branches and fail at the end
    pub keep_going: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_CONFIG_FILE),
            repodir: None,
            debug: false,
            insecure: false,
            keep_going: false,
        }
    }
}

/// Values given explicitly on the command line. Unset fields leave lower
/// layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SettingsOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repodir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_going: Option<bool>,
}

impl Settings {
    pub fn resolve(overrides: &SettingsOverrides) -> Result<Self, figment::Error> {
        Self::layered(Env::prefixed(ENV_PREFIX), overrides)
    }

    /// Defaults, then `environment`, then `overrides`.
    pub fn layered(
        environment: impl Provider,
        overrides: &SettingsOverrides,
    ) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(environment)
            .merge(Serialized::defaults(overrides))
            .extract()
    }

    /// The working copy path, falling back to the current directory.
    pub fn repo_dir(&self) -> std::io::Result<PathBuf> {
        match &self.repodir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir(),
        }
    }
}
