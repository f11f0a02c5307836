#![allow(dead_code)]

use async_trait::async_trait;
use dehug_sdk::{
    Address, ContentId, ContentKind, ContentUploadRequest, ContentUploadedEvent, LedgerError,
    Notice, Notifier, Receipt, RegistryLedger, TxHash, WalletSession,
};
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Mutex,
    },
};

pub const CHAIN_ID: u64 = 314_159;
pub const ACCOUNT: Address = Address([0xab; 20]);
pub const TX: TxHash = TxHash([0x42; 32]);

pub fn census_request() -> ContentUploadRequest {
    ContentUploadRequest::new(ContentKind::Dataset, "bafy123", "bafy456", "Census Data")
}

pub fn event(id: u64, locator: &str, block: u64) -> ContentUploadedEvent {
    ContentUploadedEvent {
        id: ContentId(id),
        uploader: ACCOUNT,
        kind: ContentKind::Dataset,
        content_locator: locator.to_string(),
        title: "Census Data".to_string(),
        block_number: block,
        transaction_hash: TX,
    }
}

/// Ledger whose answers are scripted up front
pub struct ScriptedLedger {
    pub submit_result: Result<TxHash, LedgerError>,
    pub receipt: Result<Receipt, LedgerError>,
    pub events: Vec<ContentUploadedEvent>,
    /// Lookup answers in order; once drained every lookup returns 0
    pub lookups: Mutex<VecDeque<Result<ContentId, LedgerError>>>,
    pub submit_calls: AtomicUsize,
    pub lookup_calls: AtomicUsize,
    pub event_ranges: Mutex<Vec<(u64, u64)>>,
}

impl ScriptedLedger {
    /// Write lands in block 100
    pub fn landing_in_block_100() -> Self {
        Self {
            submit_result: Ok(TX),
            receipt: Ok(Receipt {
                transaction_hash: TX,
                block_number: 100,
                success: true,
            }),
            events: Vec::new(),
            lookups: Mutex::new(VecDeque::new()),
            submit_calls: AtomicUsize::new(0),
            lookup_calls: AtomicUsize::new(0),
            event_ranges: Mutex::new(Vec::new()),
        }
    }

    pub fn with_events(mut self, events: Vec<ContentUploadedEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn with_lookups(self, ids: &[u64]) -> Self {
        *self.lookups.lock().unwrap() = ids.iter().map(|id| Ok(ContentId(*id))).collect();
        self
    }

    pub fn with_lookup_results(self, results: Vec<Result<ContentId, LedgerError>>) -> Self {
        *self.lookups.lock().unwrap() = results.into();
        self
    }

    pub fn rejecting(mut self, reason: &str) -> Self {
        self.submit_result = Err(LedgerError::Rejected {
            reason: reason.to_string(),
        });
        self
    }

    pub fn submits(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn lookups_made(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryLedger for ScriptedLedger {
    async fn submit_upload(
        &self,
        _from: Address,
        _request: &ContentUploadRequest,
    ) -> Result<TxHash, LedgerError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submit_result.clone()
    }

    async fn wait_for_receipt(&self, _tx: TxHash) -> Result<Receipt, LedgerError> {
        self.receipt.clone()
    }

    async fn content_uploaded_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ContentUploadedEvent>, LedgerError> {
        self.event_ranges.lock().unwrap().push((from_block, to_block));
        Ok(self
            .events
            .iter()
            .filter(|e| (from_block..=to_block).contains(&e.block_number))
            .cloned()
            .collect())
    }

    async fn lookup_identifier(&self, _content_locator: &str) -> Result<ContentId, LedgerError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.lookups
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(ContentId::UNREGISTERED))
    }
}

/// Wallet session with call counters
pub struct FakeSession {
    pub account: Option<Address>,
    pub chain: AtomicU64,
    pub switch_allowed: bool,
    /// Chain reported after an accepted switch; defaults to the requested one
    pub chain_after_switch: Option<u64>,
    pub switch_calls: AtomicUsize,
}

impl FakeSession {
    pub fn on_chain(chain: u64) -> Self {
        Self {
            account: Some(ACCOUNT),
            chain: AtomicU64::new(chain),
            switch_allowed: true,
            chain_after_switch: None,
            switch_calls: AtomicUsize::new(0),
        }
    }

    pub fn without_account() -> Self {
        Self {
            account: None,
            ..Self::on_chain(CHAIN_ID)
        }
    }

    pub fn refusing_switch(mut self) -> Self {
        self.switch_allowed = false;
        self
    }

    pub fn switches(&self) -> usize {
        self.switch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSession for FakeSession {
    fn active_account(&self) -> Option<Address> {
        self.account
    }

    async fn chain_id(&self) -> Result<u64, LedgerError> {
        Ok(self.chain.load(Ordering::SeqCst))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), LedgerError> {
        self.switch_calls.fetch_add(1, Ordering::SeqCst);
        if !self.switch_allowed {
            return Err(LedgerError::SwitchRefused("user rejected the request".into()));
        }
        self.chain
            .store(self.chain_after_switch.unwrap_or(chain_id), Ordering::SeqCst);
        Ok(())
    }
}

/// Keeps every notice for inspection
#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn terminal(&self) -> Vec<Notice> {
        self.all().into_iter().filter(Notice::is_terminal).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}
