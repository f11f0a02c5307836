//! Tracker service configuration

use serde::{Deserialize, Serialize};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Configuration failures
#[derive(Error, Debug)]
pub enum TrackerConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// File is not valid TOML for this schema
    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
    /// Bad environment override
    #[error("invalid value for {var}: {reason}")]
    InvalidEnv {
        /// Variable name
        var: &'static str,
        /// What was wrong
        reason: String,
    },
}

/// Tracker service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Listen address
    pub bind: SocketAddr,
    /// JSON snapshot of the counters; unset keeps them in memory only
    pub snapshot_path: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            snapshot_path: None,
        }
    }
}

impl TrackerConfig {
    /// Parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self, TrackerConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| TrackerConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply `TRACKER_BIND` and `TRACKER_SNAPSHOT` from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), TrackerConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("TRACKER_BIND") {
            self.bind = bind.parse().map_err(|e| TrackerConfigError::InvalidEnv {
                var: "TRACKER_BIND",
                reason: format!("{e}"),
            })?;
        }
        if let Some(path) = lookup("TRACKER_SNAPSHOT") {
            self.snapshot_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Load `path` if given, otherwise defaults, then apply the environment
    pub fn load(path: Option<&Path>) -> Result<Self, TrackerConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }
}
