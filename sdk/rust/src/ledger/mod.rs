//! Ledger boundary - the narrow surface the upload workflow talks to
//!
//! Two seams: [`RegistryLedger`] for the registry contract and
//! [`WalletSession`] for the identity and chain context of the caller.

use crate::abi::AbiError;
use async_trait::async_trait;
use dehug_registry::{Address, ContentId, ContentUploadRequest, ContentUploadedEvent, TxHash};
use thiserror::Error;

mod memory;

pub use memory::StaticSession;

/// Failures reported by a ledger backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Execution reverted with a reason string
    #[error("transaction rejected: {reason}")]
    Rejected {
        /// Revert reason as reported by the node
        reason: String,
    },
    /// Transaction was mined with a failed status
    #[error("transaction {tx} reverted")]
    Reverted {
        /// Failed transaction
        tx: TxHash,
    },
    /// Node has no record of the transaction
    #[error("unknown transaction {0}")]
    UnknownTransaction(TxHash),
    /// HTTP-level failure
    #[error("transport error: {0}")]
    Transport(String),
    /// JSON-RPC error object
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message
        message: String,
    },
    /// Response could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
    /// Gave up waiting
    #[error("timed out waiting for {0}")]
    Timeout(String),
    /// Wallet refused or failed to change chain
    #[error("chain switch refused: {0}")]
    SwitchRefused(String),
}

impl From<AbiError> for LedgerError {
    fn from(e: AbiError) -> Self {
        LedgerError::Decode(e.to_string())
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        LedgerError::Transport(e.to_string())
    }
}

/// Confirmation that a transaction was included in a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    /// Included transaction
    pub transaction_hash: TxHash,
    /// Including block
    pub block_number: u64,
    /// Execution status
    pub success: bool,
}

/// Registry contract operations used by the upload workflow
#[async_trait]
pub trait RegistryLedger: Send + Sync {
    /// Send the `uploadContent` write from `from`
    async fn submit_upload(
        &self,
        from: Address,
        request: &ContentUploadRequest,
    ) -> Result<TxHash, LedgerError>;

    /// Block until the transaction has a receipt
    async fn wait_for_receipt(&self, tx: TxHash) -> Result<Receipt, LedgerError>;

    /// `ContentUploaded` events in `from_block..=to_block`
    async fn content_uploaded_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ContentUploadedEvent>, LedgerError>;

    /// Registry lookup, `ContentId::UNREGISTERED` when absent
    async fn lookup_identifier(&self, content_locator: &str) -> Result<ContentId, LedgerError>;
}

/// Identity and chain context of the caller
#[async_trait]
pub trait WalletSession: Send + Sync {
    /// Connected account, if any
    fn active_account(&self) -> Option<Address>;

    /// Chain the session currently points at
    async fn chain_id(&self) -> Result<u64, LedgerError>;

    /// Ask the wallet to move to `chain_id`
    async fn switch_chain(&self, chain_id: u64) -> Result<(), LedgerError>;
}
