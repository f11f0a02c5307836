//! DeHug Download Tracker - per-item download counters split by source
//!
//! The `model` module is always available so clients can share the wire
//! types; the HTTP service lives behind the `server` feature.

#![forbid(unsafe_code)]
#![warn(missing_docs, unused_qualifications)]

pub mod model;

#[cfg(feature = "server")]
pub mod config;
#[cfg(feature = "server")]
pub mod routes;
#[cfg(feature = "server")]
pub mod store;

pub use model::{
    DownloadSource, DownloadStats, ParseSourceError, StatsTable, TrackDownload, MAX_ITEM_NAME_LEN,
};

#[cfg(feature = "server")]
pub use config::{TrackerConfig, TrackerConfigError};
#[cfg(feature = "server")]
pub use routes::build_router;
#[cfg(feature = "server")]
pub use store::{DownloadStore, StoreError};
