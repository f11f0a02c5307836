//! DeHug RPC Client - JSON-RPC access to the registry contract on an EVM chain

use crate::{
    abi::{self, RawLog},
    ledger::{LedgerError, Receipt, RegistryLedger, WalletSession},
    retry::RetryPolicy,
};
use async_trait::async_trait;
use dehug_registry::{Address, ContentId, ContentUploadRequest, ContentUploadedEvent, TxHash};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::Mutex, time::sleep};
use tracing::{debug, instrument, warn};

/// Configuration for RPC connection management
#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    /// Node endpoints, tried round-robin on transport failure
    pub endpoints: Vec<String>,
    /// Registry contract address
    pub registry: Address,
    /// Retry schedule for read calls
    pub retry: RetryPolicy,
    /// Interval between receipt polls
    pub receipt_poll_interval: Duration,
    /// Give up waiting for a receipt after this long; `None` waits forever
    pub confirmation_timeout: Option<Duration>,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl RpcClientConfig {
    /// Read-call retry schedule: 5 attempts, linear from 500ms
    pub fn default_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_millis(500),
            backoff: crate::retry::Backoff::Linear,
        }
    }

    /// Single-endpoint configuration with defaults for everything else
    pub fn new(endpoint: impl Into<String>, registry: Address) -> Self {
        Self {
            endpoints: vec![endpoint.into()],
            registry,
            retry: Self::default_retry(),
            receipt_poll_interval: Duration::from_secs(2),
            confirmation_timeout: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    block_number: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    topics: Vec<String>,
    data: String,
    block_number: String,
    transaction_hash: String,
    /// Set when a reorg dropped the log
    #[serde(default)]
    removed: bool,
}

impl RpcLog {
    fn decode(&self) -> Result<ContentUploadedEvent, LedgerError> {
        let raw = RawLog {
            topics: self
                .topics
                .iter()
                .map(|t| parse_topic(t))
                .collect::<Result<_, _>>()?,
            data: parse_data(&self.data)?,
            block_number: parse_quantity(&self.block_number)?,
            transaction_hash: self
                .transaction_hash
                .parse()
                .map_err(|e| LedgerError::Decode(format!("bad log transaction hash: {e}")))?,
        };
        Ok(abi::decode_content_uploaded(&raw)?)
    }
}

fn quantity(value: u64) -> String {
    format!("0x{value:x}")
}

fn parse_quantity(s: &str) -> Result<u64, LedgerError> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| LedgerError::Decode(format!("bad quantity {s}: {e}")))
}

fn parse_data(s: &str) -> Result<Vec<u8>, LedgerError> {
    hex::decode(s.trim_start_matches("0x")).map_err(|e| LedgerError::Decode(format!("bad data: {e}")))
}

fn data_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn parse_topic(s: &str) -> Result<[u8; 32], LedgerError> {
    let bytes = parse_data(s)?;
    bytes
        .try_into()
        .map_err(|_| LedgerError::Decode(format!("bad topic {s}")))
}

/// Map a JSON-RPC error object, pulling out revert reasons where present
fn map_rpc_error(err: RpcErrorObject) -> LedgerError {
    let payload = match &err.data {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Object(map)) => map.get("data").and_then(Value::as_str),
        _ => None,
    };
    if let Some(reason) = payload
        .and_then(|p| parse_data(p).ok())
        .and_then(|bytes| abi::decode_revert_reason(&bytes))
    {
        return LedgerError::Rejected { reason };
    }
    if let Some(reason) = err.message.strip_prefix("execution reverted: ") {
        return LedgerError::Rejected {
            reason: reason.to_string(),
        };
    }
    LedgerError::Rpc {
        code: err.code,
        message: err.message,
    }
}

/// Core RPC client with endpoint failover and retry on transport errors
pub struct RegistryRpcClient {
    http: reqwest::Client,
    config: RpcClientConfig,
    current_index: Mutex<usize>,
    next_id: AtomicU64,
}

impl RegistryRpcClient {
    /// Build the client. Fails if no endpoint is configured.
    pub fn new(config: RpcClientConfig) -> Result<Self, LedgerError> {
        if config.endpoints.is_empty() {
            return Err(LedgerError::Transport("no RPC endpoint configured".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            current_index: Mutex::new(0),
            next_id: AtomicU64::new(1),
        })
    }

    /// Client configuration
    pub fn config(&self) -> &RpcClientConfig {
        &self.config
    }

    async fn endpoint(&self) -> String {
        let index = self.current_index.lock().await;
        self.config.endpoints[*index % self.config.endpoints.len()].clone()
    }

    /// Rotate primary endpoint
    pub async fn rotate_endpoint(&self) {
        let mut index = self.current_index.lock().await;
        *index = (*index + 1) % self.config.endpoints.len();
    }

    async fn call_once(&self, method: &str, params: &Value) -> Result<Value, LedgerError> {
        let endpoint = self.endpoint().await;
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });
        let response: RpcResponse = self
            .http
            .post(&endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(map_rpc_error(err));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Execute a read call, retrying transport failures on the next endpoint
    #[instrument(skip(self, params))]
    async fn execute_rpc(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let mut attempt = 1;
        loop {
            match self.call_once(method, &params).await {
                Err(LedgerError::Transport(e)) if attempt < self.config.retry.max_attempts => {
                    warn!(
                        "RPC attempt {}/{} failed: {}",
                        attempt, self.config.retry.max_attempts, e
                    );
                    self.rotate_endpoint().await;
                    attempt += 1;
                    if let Some(delay) = self.config.retry.delay_before(attempt) {
                        sleep(delay).await;
                    }
                }
                other => return other,
            }
        }
    }

    /// Chain id reported by the node
    pub async fn chain_id(&self) -> Result<u64, LedgerError> {
        let value = self.execute_rpc("eth_chainId", json!([])).await?;
        parse_quantity(value.as_str().unwrap_or_default())
    }

    async fn receipt(&self, tx: TxHash) -> Result<Option<Receipt>, LedgerError> {
        let value = self
            .execute_rpc("eth_getTransactionReceipt", json!([tx.to_string()]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        let raw: RpcReceipt =
            serde_json::from_value(value).map_err(|e| LedgerError::Decode(e.to_string()))?;
        Ok(Some(Receipt {
            transaction_hash: tx,
            block_number: parse_quantity(&raw.block_number)?,
            // pre-Byzantium receipts carry no status; inclusion means success
            success: raw.status.as_deref().map_or(true, |s| s != "0x0"),
        }))
    }

    async fn poll_receipt(&self, tx: TxHash) -> Result<Receipt, LedgerError> {
        loop {
            if let Some(receipt) = self.receipt(tx).await? {
                return Ok(receipt);
            }
            debug!(%tx, "receipt not yet available");
            sleep(self.config.receipt_poll_interval).await;
        }
    }
}

#[async_trait]
impl RegistryLedger for RegistryRpcClient {
    #[instrument(skip(self, request), fields(locator = %request.content_locator))]
    async fn submit_upload(
        &self,
        from: Address,
        request: &ContentUploadRequest,
    ) -> Result<TxHash, LedgerError> {
        let tx = json!([{
            "from": from.to_string(),
            "to": self.config.registry.to_string(),
            "data": data_hex(&abi::encode_upload_content(request)),
        }]);
        // writes are never retried: a lost response may still have landed
        let value = self.call_once("eth_sendTransaction", &tx).await?;
        value
            .as_str()
            .ok_or_else(|| LedgerError::Decode("transaction hash missing".into()))?
            .parse()
            .map_err(|e| LedgerError::Decode(format!("bad transaction hash: {e}")))
    }

    #[instrument(skip(self))]
    async fn wait_for_receipt(&self, tx: TxHash) -> Result<Receipt, LedgerError> {
        match self.config.confirmation_timeout {
            Some(limit) => tokio::time::timeout(limit, self.poll_receipt(tx))
                .await
                .map_err(|_| LedgerError::Timeout(format!("receipt of {tx}")))?,
            None => self.poll_receipt(tx).await,
        }
    }

    #[instrument(skip(self))]
    async fn content_uploaded_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ContentUploadedEvent>, LedgerError> {
        let filter = json!([{
            "address": self.config.registry.to_string(),
            "fromBlock": quantity(from_block),
            "toBlock": quantity(to_block),
            "topics": [data_hex(&abi::content_uploaded_topic())],
        }]);
        let value = self.execute_rpc("eth_getLogs", filter).await?;
        let logs: Vec<RpcLog> =
            serde_json::from_value(value).map_err(|e| LedgerError::Decode(e.to_string()))?;

        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            if log.removed {
                warn!(tx = %log.transaction_hash, "skipping ContentUploaded log removed by reorg");
                continue;
            }
            match log.decode() {
                Ok(event) => events.push(event),
                Err(e) => warn!(
                    tx = %log.transaction_hash,
                    error = %e,
                    "skipping undecodable ContentUploaded log"
                ),
            }
        }
        Ok(events)
    }

    #[instrument(skip(self))]
    async fn lookup_identifier(&self, content_locator: &str) -> Result<ContentId, LedgerError> {
        let call = json!([
            {
                "to": self.config.registry.to_string(),
                "data": data_hex(&abi::encode_lookup(content_locator)),
            },
            "latest"
        ]);
        let value = self.execute_rpc("eth_call", call).await?;
        let bytes = parse_data(value.as_str().unwrap_or_default())?;
        Ok(ContentId(abi::decode_uint(&bytes)?))
    }
}

/// Wallet session backed by a node-managed account
pub struct RpcWalletSession {
    client: Arc<RegistryRpcClient>,
    account: Option<Address>,
}

impl RpcWalletSession {
    /// Session for `account` over `client`; `None` means not connected
    pub fn new(client: Arc<RegistryRpcClient>, account: Option<Address>) -> Self {
        Self { client, account }
    }
}

#[async_trait]
impl WalletSession for RpcWalletSession {
    fn active_account(&self) -> Option<Address> {
        self.account
    }

    async fn chain_id(&self) -> Result<u64, LedgerError> {
        self.client.chain_id().await
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), LedgerError> {
        self.client
            .call_once(
                "wallet_switchEthereumChain",
                &json!([{ "chainId": quantity(chain_id) }]),
            )
            .await
            .map(|_| ())
            .map_err(|e| LedgerError::SwitchRefused(e.to_string()))
    }
}
