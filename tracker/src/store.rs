//! Download counters with optional JSON snapshot persistence

use crate::model::{DownloadSource, DownloadStats, StatsTable};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Store failures
#[derive(Error, Debug)]
pub enum StoreError {
    /// Snapshot file could not be read or written
    #[error("snapshot I/O on {path}: {source}")]
    Io {
        /// Snapshot path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// Snapshot file is not a valid stats table
    #[error("corrupt snapshot {path}: {source}")]
    Corrupt {
        /// Snapshot path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
}

/// Per-item download counters shared across requests
#[derive(Debug, Default)]
pub struct DownloadStore {
    counts: RwLock<StatsTable>,
    snapshot: Option<PathBuf>,
    // one snapshot writer at a time so files land in update order
    writer: Mutex<()>,
}

impl DownloadStore {
    /// Volatile store
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Store persisted to `path`, reloading it when present
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let counts = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let table: StatsTable =
                    serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                        path: path.clone(),
                        source,
                    })?;
                info!(items = table.len(), path = %path.display(), "loaded download snapshot");
                table
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StatsTable::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self {
            counts: RwLock::new(counts),
            snapshot: Some(path),
            writer: Mutex::new(()),
        })
    }

    /// Count one download of `item` and return its updated stats.
    ///
    /// With a snapshot configured the count only sticks once the snapshot is
    /// written; on a failed write it is rolled back.
    pub async fn record(
        &self,
        item: &str,
        source: DownloadSource,
    ) -> Result<DownloadStats, StoreError> {
        let Some(path) = &self.snapshot else {
            let mut counts = self.counts.write().await;
            let stats = counts.entry(item.to_string()).or_default();
            stats.record(source);
            debug!(item, %source, total = stats.total, "download recorded");
            return Ok(*stats);
        };

        let _writer = self.writer.lock().await;
        let (updated, previous, encoded) = {
            let mut counts = self.counts.write().await;
            let previous = counts.get(item).copied();
            let mut updated = previous.unwrap_or_default();
            updated.record(source);
            counts.insert(item.to_string(), updated);
            (updated, previous, serde_json::to_vec_pretty(&*counts))
        };

        // table lock is released before file I/O
        let written = match encoded {
            Ok(bytes) => write_snapshot(path, bytes).await,
            Err(source) => Err(StoreError::Corrupt {
                path: path.clone(),
                source,
            }),
        };
        if let Err(e) = written {
            let mut counts = self.counts.write().await;
            match previous {
                Some(stats) => {
                    counts.insert(item.to_string(), stats);
                }
                None => {
                    counts.remove(item);
                }
            }
            return Err(e);
        }

        debug!(item, %source, total = updated.total, "download recorded");
        Ok(updated)
    }

    /// Stats for every item
    pub async fn stats(&self) -> StatsTable {
        self.counts.read().await.clone()
    }

    /// Stats for one item
    pub async fn item(&self, item: &str) -> Option<DownloadStats> {
        self.counts.read().await.get(item).copied()
    }
}

async fn write_snapshot(path: &Path, bytes: Vec<u8>) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)
}
