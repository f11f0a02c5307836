//! Download tracker client
//!
//! Tracking never breaks a download: failures are logged and swallowed.

use dehug_tracker::{DownloadSource, DownloadStats, StatsTable};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Tracker request failures
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Transport or status failure
    #[error("tracker request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct TrackReply {
    stats: DownloadStats,
}

/// Client of the download tracker service
#[derive(Debug, Clone)]
pub struct TrackerClient {
    http: reqwest::Client,
    base_url: String,
    gateway_url: String,
}

impl TrackerClient {
    /// Client for the tracker at `base_url`, resolving content through `gateway_url`
    pub fn new(
        base_url: impl Into<String>,
        gateway_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TrackerError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Record a download and return the item's updated counters
    pub async fn try_track_download(
        &self,
        item_name: &str,
        source: DownloadSource,
    ) -> Result<DownloadStats, TrackerError> {
        let reply: TrackReply = self
            .http
            .post(format!("{}/track/download", self.base_url))
            .form(&[("item_name", item_name), ("source", source.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(reply.stats)
    }

    /// Record a download, logging instead of failing
    #[instrument(skip(self))]
    pub async fn track_download(&self, item_name: &str, source: DownloadSource) {
        match self.try_track_download(item_name, source).await {
            Ok(stats) => debug!(total = stats.total, "download tracked"),
            Err(e) => warn!("Error tracking download: {}", e),
        }
    }

    /// Counters for every item, empty when the tracker is unreachable
    pub async fn download_stats(&self) -> StatsTable {
        match self.fetch_stats().await {
            Ok(table) => table,
            Err(e) => {
                warn!("Error fetching download stats: {}", e);
                StatsTable::new()
            }
        }
    }

    /// Counters for one item
    pub async fn item_stats(&self, item_name: &str) -> Option<DownloadStats> {
        self.download_stats().await.remove(item_name)
    }

    /// Gateway URL serving `cid`
    pub fn gateway_url(&self, cid: &str) -> String {
        format!("{}/{}", self.gateway_url, cid)
    }

    /// Track a download of `item_name`, then return where to fetch it
    pub async fn download_url(&self, item_name: &str, cid: &str, source: DownloadSource) -> String {
        self.track_download(item_name, source).await;
        self.gateway_url(cid)
    }

    async fn fetch_stats(&self) -> Result<StatsTable, TrackerError> {
        Ok(self
            .http
            .get(format!("{}/track/stats", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}
