//! DeHug SDK - on-chain registration, download tracking and retrieval for
//! decentralized datasets and AI models

#![deny(unsafe_code, unstable_features, unused_import_braces)]
#![warn(missing_docs, unused_qualifications)]
#![cfg_attr(not(test), forbid(clippy::unwrap_used))]

pub mod abi;
pub mod api;
pub mod config;
pub mod ledger;
pub mod notify;
pub mod repository;
pub mod retry;
pub mod tracker;
pub mod upload;

pub use api::{ClientError, DeHugClient, RegistryRpcClient, RpcClientConfig, RpcWalletSession};
pub use config::{ConfigError, DeHugConfig};
pub use ledger::{LedgerError, Receipt, RegistryLedger, StaticSession, WalletSession};
pub use notify::{Notice, NoticeLevel, Notifier, TracingNotifier};
pub use repository::{DatasetContent, Repository, RepositoryError};
pub use retry::{Backoff, RetryPolicy};
pub use tracker::{TrackerClient, TrackerError};
pub use upload::{
    ContentUploadResult, ContentUploader, RequiredField, UploadError, UploadReceipt,
};

pub use dehug_registry::{
    Address, ContentId, ContentKind, ContentUploadRequest, ContentUploadedEvent, InMemoryRegistry,
    TxHash, FILECOIN_CALIBRATION_CHAIN_ID,
};
pub use dehug_tracker::{DownloadSource, DownloadStats, StatsTable};
