//! In-memory registry - Contract semantics without a chain
//!
//! Each accepted registration is sealed into its own block and emits one
//! `ContentUploaded` event, which is how the deployed contract behaves on a
//! node that mines one transaction per block.

use crate::{
    errors::RegistryError,
    state::{Address, ContentId, ContentUploadRequest, ContentUploadedEvent, RegisteredContent, TxHash},
    utils::validate_submission,
};
use sha3::{Digest, Keccak256};
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};
use tracing::{debug, info};

/// Result of an accepted registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOutcome {
    /// Minted token id
    pub id: ContentId,
    /// Transaction that carried the registration
    pub transaction_hash: TxHash,
    /// Block it was sealed in
    pub block_number: u64,
}

#[derive(Debug, Default)]
struct RegistryState {
    next_id: u64,
    head_block: u64,
    nonce: u64,
    by_locator: HashMap<String, RegisteredContent>,
    events: Vec<ContentUploadedEvent>,
    receipts: HashMap<TxHash, u64>,
}

/// Thread-safe registry holding every registration in memory
#[derive(Debug)]
pub struct InMemoryRegistry {
    chain_id: u64,
    state: Mutex<RegistryState>,
}

impl InMemoryRegistry {
    /// Empty registry on the given chain, head at block 0
    pub fn new(chain_id: u64) -> Self {
        Self::with_head_block(chain_id, 0)
    }

    /// Empty registry whose next registration lands in `head_block + 1`
    pub fn with_head_block(chain_id: u64, head_block: u64) -> Self {
        Self {
            chain_id,
            state: Mutex::new(RegistryState {
                next_id: 1,
                head_block,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Chain this registry lives on
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Validate and record a registration, minting the next token id
    pub fn register(
        &self,
        uploader: Address,
        request: &ContentUploadRequest,
    ) -> Result<RegistrationOutcome, RegistryError> {
        validate_submission(request)?;

        let mut state = self.state();
        if state.by_locator.contains_key(&request.content_locator) {
            debug!(locator = %request.content_locator, "duplicate registration rejected");
            return Err(RegistryError::ContentAlreadyExists);
        }

        let id = ContentId(state.next_id);
        state.next_id += 1;
        state.head_block += 1;
        state.nonce += 1;
        let block_number = state.head_block;

        let mut hasher = Keccak256::new();
        hasher.update(uploader.as_bytes());
        hasher.update(state.nonce.to_be_bytes());
        hasher.update(request.content_locator.as_bytes());
        let transaction_hash = TxHash(hasher.finalize().into());

        state.by_locator.insert(
            request.content_locator.clone(),
            RegisteredContent {
                id,
                uploader,
                kind: request.kind,
                content_locator: request.content_locator.clone(),
                metadata_locator: request.metadata_locator.clone(),
                image_locator: request.image_locator_or_empty().to_string(),
                title: request.title.clone(),
                description: request.description.clone(),
                tags: request.tags.clone(),
                block_number,
            },
        );
        state.events.push(ContentUploadedEvent {
            id,
            uploader,
            kind: request.kind,
            content_locator: request.content_locator.clone(),
            title: request.title.clone(),
            block_number,
            transaction_hash,
        });
        state.receipts.insert(transaction_hash, block_number);

        info!(%id, block_number, kind = %request.kind, "content registered");
        Ok(RegistrationOutcome {
            id,
            transaction_hash,
            block_number,
        })
    }

    /// Token id for a locator, `ContentId::UNREGISTERED` when unknown
    pub fn lookup(&self, content_locator: &str) -> ContentId {
        self.state()
            .by_locator
            .get(content_locator)
            .map(|c| c.id)
            .unwrap_or(ContentId::UNREGISTERED)
    }

    /// Full record for a locator
    pub fn get(&self, content_locator: &str) -> Option<RegisteredContent> {
        self.state().by_locator.get(content_locator).cloned()
    }

    /// Events emitted in `from_block..=to_block`
    pub fn events_in_range(&self, from_block: u64, to_block: u64) -> Vec<ContentUploadedEvent> {
        self.state()
            .events
            .iter()
            .filter(|e| (from_block..=to_block).contains(&e.block_number))
            .cloned()
            .collect()
    }

    /// Block a transaction was sealed in
    pub fn block_of(&self, transaction_hash: &TxHash) -> Option<u64> {
        self.state().receipts.get(transaction_hash).copied()
    }

    /// Latest sealed block
    pub fn head_block(&self) -> u64 {
        self.state().head_block
    }

    /// Number of registered items
    pub fn len(&self) -> usize {
        self.state().by_locator.len()
    }

    /// Whether nothing has been registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
