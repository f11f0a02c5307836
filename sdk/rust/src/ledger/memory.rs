//! Local backends: the in-memory registry and a fixed wallet session

use super::{LedgerError, Receipt, RegistryLedger, WalletSession};
use async_trait::async_trait;
use dehug_registry::{
    Address, ContentId, ContentUploadRequest, ContentUploadedEvent, InMemoryRegistry, TxHash,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

#[async_trait]
impl RegistryLedger for InMemoryRegistry {
    async fn submit_upload(
        &self,
        from: Address,
        request: &ContentUploadRequest,
    ) -> Result<TxHash, LedgerError> {
        self.register(from, request)
            .map(|outcome| outcome.transaction_hash)
            .map_err(|e| LedgerError::Rejected {
                reason: e.to_string(),
            })
    }

    async fn wait_for_receipt(&self, tx: TxHash) -> Result<Receipt, LedgerError> {
        let block_number = self
            .block_of(&tx)
            .ok_or(LedgerError::UnknownTransaction(tx))?;
        Ok(Receipt {
            transaction_hash: tx,
            block_number,
            success: true,
        })
    }

    async fn content_uploaded_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ContentUploadedEvent>, LedgerError> {
        Ok(self.events_in_range(from_block, to_block))
    }

    async fn lookup_identifier(&self, content_locator: &str) -> Result<ContentId, LedgerError> {
        Ok(self.lookup(content_locator))
    }
}

/// Session with a fixed account and a chain id held in memory
#[derive(Debug)]
pub struct StaticSession {
    account: Option<Address>,
    chain_id: AtomicU64,
    allow_switch: bool,
}

impl StaticSession {
    /// Connected session on `chain_id` that accepts chain switches
    pub fn new(account: Address, chain_id: u64) -> Self {
        Self {
            account: Some(account),
            chain_id: AtomicU64::new(chain_id),
            allow_switch: true,
        }
    }

    /// Session with no connected account
    pub fn disconnected(chain_id: u64) -> Self {
        Self {
            account: None,
            chain_id: AtomicU64::new(chain_id),
            allow_switch: true,
        }
    }

    /// Refuse every switch request
    pub fn refusing_switch(mut self) -> Self {
        self.allow_switch = false;
        self
    }
}

#[async_trait]
impl WalletSession for StaticSession {
    fn active_account(&self) -> Option<Address> {
        self.account
    }

    async fn chain_id(&self) -> Result<u64, LedgerError> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), LedgerError> {
        if !self.allow_switch {
            return Err(LedgerError::SwitchRefused(format!(
                "session pinned to chain {}",
                self.chain_id.load(Ordering::SeqCst)
            )));
        }
        debug!(chain_id, "session switched chain");
        self.chain_id.store(chain_id, Ordering::SeqCst);
        Ok(())
    }
}
