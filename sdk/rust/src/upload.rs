//! Content Registration Workflow - submit, confirm, and cross-check a registry upload
//!
//! The minted id is taken from the `ContentUploaded` event in the receipt's
//! block and then confirmed against the registry's own locator lookup. An
//! absent lookup value is treated as node lag and tolerated; a present but
//! different value fails the upload.

use crate::{
    ledger::{LedgerError, Receipt, RegistryLedger, WalletSession},
    notify::{Notice, NoticeLevel, Notifier, TracingNotifier},
    retry::RetryPolicy,
};
use dehug_registry::{ContentId, ContentUploadRequest, RegistryError, TxHash};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

const IN_PROGRESS_MESSAGE: &str = "Please wait while we upload your content to the blockchain.";
const SUCCESS_MESSAGE: &str = "Content uploaded successfully!";

/// Fields that must be non-empty before anything is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    /// Payload locator
    ContentLocator,
    /// Metadata locator
    MetadataLocator,
    /// Title
    Title,
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentLocator => f.write_str("content locator"),
            Self::MetadataLocator => f.write_str("metadata locator"),
            Self::Title => f.write_str("title"),
        }
    }
}

/// Why an upload attempt failed. Every variant is terminal for the attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// No connected account
    #[error("no active wallet session")]
    MissingIdentity,
    /// Wallet is on another chain and could not be switched
    #[error("wrong network: expected chain {expected}, wallet on {actual:?}")]
    WrongNetwork {
        /// Registry chain
        expected: u64,
        /// Chain the wallet reported, if it answered
        actual: Option<u64>,
    },
    /// Local validation failed; nothing was sent
    #[error("required field is empty: {0}")]
    MissingField(RequiredField),
    /// Registry reverted with one of its known reasons
    #[error("registry rejected upload: {0}")]
    Rejected(RegistryError),
    /// Receipt block holds no `ContentUploaded` event for this content
    #[error("no ContentUploaded event for {locator} in block {block}")]
    MissingIdentifier {
        /// Submitted content locator
        locator: String,
        /// Receipt block
        block: u64,
    },
    /// Event and lookup disagree on the minted id
    #[error("identifier mismatch: event says {event}, registry says {lookup}")]
    IdentifierMismatch {
        /// Id from the event
        event: ContentId,
        /// Id from the lookup
        lookup: ContentId,
    },
    /// Anything else: transport failures, unknown reverts, failed receipts
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl UploadError {
    /// Text shown to the person who started the upload
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingIdentity => "Please connect your wallet first.",
            Self::WrongNetwork { .. } => "Please switch your wallet to the registry network.",
            Self::MissingField(_) => "Please fill in all required fields.",
            Self::Rejected(RegistryError::EmptyContentLocator) => "IPFS hash is required.",
            Self::Rejected(RegistryError::ContentAlreadyExists) => {
                "This content has already been uploaded."
            }
            Self::Rejected(RegistryError::EmptyTitle) => "Title is required.",
            Self::Rejected(RegistryError::EmptyMetadataLocator) => {
                "Metadata IPFS hash is required."
            }
            Self::MissingIdentifier { .. } => {
                "Upload was confirmed but its content ID could not be retrieved."
            }
            Self::IdentifierMismatch { .. } => {
                "Upload was confirmed but its content ID could not be verified. Please check the registry."
            }
            Self::Ledger(_) => "An error occurred while uploading content.",
        }
    }

    /// Severity of the notice for this failure
    pub fn notice_level(&self) -> NoticeLevel {
        match self {
            Self::MissingIdentity => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        }
    }
}

/// Confirmed registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Registration transaction
    pub transaction_hash: TxHash,
    /// Minted token id
    pub content_id: ContentId,
    /// Block the registration landed in
    pub block_number: u64,
    /// Whether the registry lookup confirmed the id (false when it lagged)
    pub confirmed_by_lookup: bool,
}

/// Caller-facing outcome, `{ success, transactionId?, identifier? }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUploadResult {
    /// Whether the content was registered and its id established
    pub success: bool,
    /// Transaction hash, on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Token id, on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

impl ContentUploadResult {
    /// Failed outcome, no identifiers
    pub fn failed() -> Self {
        Self::default()
    }
}

impl From<&UploadReceipt> for ContentUploadResult {
    fn from(receipt: &UploadReceipt) -> Self {
        Self {
            success: true,
            transaction_id: Some(receipt.transaction_hash.to_string()),
            identifier: Some(receipt.content_id.to_string()),
        }
    }
}

/// Local check of the fields the registry would reject. Whitespace counts as empty.
pub fn check_required_fields(request: &ContentUploadRequest) -> Result<(), UploadError> {
    let fields = [
        (&request.content_locator, RequiredField::ContentLocator),
        (&request.metadata_locator, RequiredField::MetadataLocator),
        (&request.title, RequiredField::Title),
    ];
    for (value, field) in fields {
        if value.trim().is_empty() {
            return Err(UploadError::MissingField(field));
        }
    }
    Ok(())
}

fn classify_submit_error(err: LedgerError) -> UploadError {
    match &err {
        LedgerError::Rejected { reason } => match RegistryError::from_reason(reason) {
            Some(known) => UploadError::Rejected(known),
            None => UploadError::Ledger(err),
        },
        _ => UploadError::Ledger(err),
    }
}

/// Runs the registration workflow against a ledger and wallet session
pub struct ContentUploader {
    ledger: Arc<dyn RegistryLedger>,
    session: Arc<dyn WalletSession>,
    expected_chain_id: u64,
    retry: RetryPolicy,
    notifier: Arc<dyn Notifier>,
}

impl ContentUploader {
    /// Uploader with the default 3x2s reconciliation policy and tracing notices
    pub fn new(
        ledger: Arc<dyn RegistryLedger>,
        session: Arc<dyn WalletSession>,
        expected_chain_id: u64,
    ) -> Self {
        Self {
            ledger,
            session,
            expected_chain_id,
            retry: RetryPolicy::default(),
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// Replace the reconciliation lookup policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the notice sink
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Run the workflow and report the outcome with exactly one terminal notice
    pub async fn upload(&self, request: &ContentUploadRequest) -> ContentUploadResult {
        match self.try_upload(request).await {
            Ok(receipt) => {
                self.notifier.notify(Notice::success(SUCCESS_MESSAGE));
                ContentUploadResult::from(&receipt)
            }
            Err(err) => {
                debug!(error = %err, "upload content failed");
                self.notifier
                    .notify(Notice::new(err.notice_level(), err.user_message()));
                ContentUploadResult::failed()
            }
        }
    }

    /// Run the workflow, returning the typed outcome.
    ///
    /// Emits only the in-progress notice; terminal notices are left to the caller.
    #[instrument(skip(self, request), fields(locator = %request.content_locator, kind = %request.kind))]
    pub async fn try_upload(
        &self,
        request: &ContentUploadRequest,
    ) -> Result<UploadReceipt, UploadError> {
        let account = self
            .session
            .active_account()
            .ok_or(UploadError::MissingIdentity)?;
        self.ensure_correct_chain().await?;
        check_required_fields(request)?;

        self.notifier.notify(Notice::info(IN_PROGRESS_MESSAGE));
        let tx = self
            .ledger
            .submit_upload(account, request)
            .await
            .map_err(classify_submit_error)?;
        debug!(%tx, "upload submitted");

        let receipt = self.ledger.wait_for_receipt(tx).await?;
        if !receipt.success {
            return Err(LedgerError::Reverted { tx }.into());
        }
        info!(%tx, block = receipt.block_number, "upload confirmed");

        let event_id = self.identifier_from_event(request, &receipt).await?;
        let confirmed_by_lookup = match self.lookup_with_retry(&request.content_locator).await {
            None => {
                warn!(
                    %event_id,
                    attempts = self.retry.max_attempts,
                    "registry lookup returned nothing, using event id"
                );
                false
            }
            Some(lookup) if lookup != event_id => {
                return Err(UploadError::IdentifierMismatch {
                    event: event_id,
                    lookup,
                });
            }
            Some(_) => true,
        };

        Ok(UploadReceipt {
            transaction_hash: tx,
            content_id: event_id,
            block_number: receipt.block_number,
            confirmed_by_lookup,
        })
    }

    async fn ensure_correct_chain(&self) -> Result<(), UploadError> {
        let expected = self.expected_chain_id;
        let current = match self.session.chain_id().await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "could not read wallet chain");
                None
            }
        };
        if current == Some(expected) {
            return Ok(());
        }

        info!(expected, ?current, "switching wallet chain");
        if let Err(e) = self.session.switch_chain(expected).await {
            warn!(error = %e, "chain switch failed");
            return Err(UploadError::WrongNetwork {
                expected,
                actual: current,
            });
        }

        let after = self.session.chain_id().await.ok();
        if after != Some(expected) {
            return Err(UploadError::WrongNetwork {
                expected,
                actual: after,
            });
        }
        Ok(())
    }

    async fn identifier_from_event(
        &self,
        request: &ContentUploadRequest,
        receipt: &Receipt,
    ) -> Result<ContentId, UploadError> {
        let block = receipt.block_number;
        let events = self.ledger.content_uploaded_events(block, block).await?;
        events
            .iter()
            .find(|e| e.content_locator == request.content_locator)
            .map(|e| e.id)
            .ok_or_else(|| UploadError::MissingIdentifier {
                locator: request.content_locator.clone(),
                block,
            })
    }

    async fn lookup_with_retry(&self, content_locator: &str) -> Option<ContentId> {
        let ledger = &self.ledger;
        self.retry
            .retry_until(|attempt| async move {
                match ledger.lookup_identifier(content_locator).await {
                    Ok(id) if id.is_registered() => Some(id),
                    Ok(_) => {
                        debug!(attempt, "lookup not yet populated");
                        None
                    }
                    Err(e) => {
                        warn!(attempt, error = %e, "lookup failed");
                        None
                    }
                }
            })
            .await
    }
}
