//! Wire types shared by the tracker service and its clients

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};
use thiserror::Error;

/// Where a download was initiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadSource {
    /// Programmatic download through the SDK
    Sdk,
    /// Download from the web interface
    Ui,
}

impl DownloadSource {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadSource::Sdk => "sdk",
            DownloadSource::Ui => "ui",
        }
    }
}

impl fmt::Display for DownloadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized source name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown download source `{0}` (expected `sdk` or `ui`)")]
pub struct ParseSourceError(pub String);

impl FromStr for DownloadSource {
    type Err = ParseSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sdk" => Ok(DownloadSource::Sdk),
            "ui" => Ok(DownloadSource::Ui),
            other => Err(ParseSourceError(other.to_string())),
        }
    }
}

/// Download counters for one item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadStats {
    /// Downloads through the SDK
    pub sdk: u64,
    /// Downloads from the web interface
    pub ui: u64,
    /// `sdk + ui`
    pub total: u64,
}

impl DownloadStats {
    /// Count one download from `source`
    pub fn record(&mut self, source: DownloadSource) {
        match source {
            DownloadSource::Sdk => self.sdk += 1,
            DownloadSource::Ui => self.ui += 1,
        }
        self.total = self.sdk + self.ui;
    }
}

/// Longest accepted item name, in bytes
pub const MAX_ITEM_NAME_LEN: usize = 256;

/// Stats for every tracked item, keyed by item name
pub type StatsTable = BTreeMap<String, DownloadStats>;

/// Form body of `POST /track/download`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDownload {
    /// Dataset or model name
    pub item_name: String,
    /// Origin of the download
    pub source: DownloadSource,
}
