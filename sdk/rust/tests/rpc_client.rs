mod common;

use assert_matches::assert_matches;
use axum::{extract::State, routing::post, Json, Router};
use common::{census_request, event, ACCOUNT, CHAIN_ID, TX};
use dehug_sdk::{
    abi::{self, Token},
    Address, ContentId, ContentUploader, LedgerError, RegistryLedger, RegistryRpcClient,
    RetryPolicy, RpcClientConfig, RpcWalletSession, UploadError,
};
use dehug_registry::RegistryError;
use serde_json::{json, Value};
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

const REGISTRY: Address = Address([0x5f; 20]);

/// Minimal JSON-RPC node holding one registered upload in block 100
struct Node {
    chain: AtomicU64,
    pending_receipt_polls: AtomicUsize,
    revert_reason: Option<String>,
    lookup: u64,
    calls: Mutex<Vec<(String, Value)>>,
}

impl Node {
    fn new() -> Self {
        Self {
            chain: AtomicU64::new(CHAIN_ID),
            pending_receipt_polls: AtomicUsize::new(0),
            revert_reason: None,
            lookup: 42,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }
}

fn hex_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn log_json(log: &abi::RawLog) -> Value {
    json!({
        "address": REGISTRY.to_string(),
        "topics": log.topics.iter().map(|t| hex_data(t)).collect::<Vec<_>>(),
        "data": hex_data(&log.data),
        "blockNumber": format!("0x{:x}", log.block_number),
        "transactionHash": log.transaction_hash.to_string(),
    })
}

async fn handle(State(node): State<Arc<Node>>, Json(request): Json<Value>) -> Json<Value> {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let params = request["params"].clone();
    node.calls.lock().unwrap().push((method.clone(), params.clone()));

    let outcome: Result<Value, Value> = match method.as_str() {
        "eth_chainId" => Ok(json!(format!("0x{:x}", node.chain.load(Ordering::SeqCst)))),
        "wallet_switchEthereumChain" => {
            let requested = params[0]["chainId"].as_str().unwrap_or_default();
            let chain = u64::from_str_radix(requested.trim_start_matches("0x"), 16).unwrap();
            node.chain.store(chain, Ordering::SeqCst);
            Ok(Value::Null)
        }
        "eth_sendTransaction" => match &node.revert_reason {
            Some(reason) => {
                let mut payload = abi::ERROR_STRING_SELECTOR.to_vec();
                payload.extend(abi::encode_tokens(&[Token::Str(reason)]));
                Err(json!({ "code": 3, "message": "execution reverted", "data": hex_data(&payload) }))
            }
            None => Ok(json!(TX.to_string())),
        },
        "eth_getTransactionReceipt" => {
            let pending = node.pending_receipt_polls.load(Ordering::SeqCst);
            if pending > 0 {
                node.pending_receipt_polls.store(pending - 1, Ordering::SeqCst);
                Ok(Value::Null)
            } else {
                Ok(json!({ "transactionHash": TX.to_string(), "blockNumber": "0x64", "status": "0x1" }))
            }
        }
        "eth_getLogs" => {
            let good = abi::encode_content_uploaded(&event(42, "bafy123", 100));
            let mut truncated = good.clone();
            truncated.data.truncate(40);
            let mut bad_topic = log_json(&good);
            bad_topic["topics"][1] = json!("0x1234");
            let mut removed = log_json(&abi::encode_content_uploaded(&event(41, "bafy123", 100)));
            removed["removed"] = json!(true);
            Ok(json!([log_json(&truncated), bad_topic, removed, log_json(&good)]))
        }
        "eth_call" => Ok(json!(hex_data(&abi::encode_tokens(&[Token::Uint(node.lookup)])))),
        _ => Err(json!({ "code": -32601, "message": "method not found" })),
    };

    Json(match outcome {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(error) => json!({ "jsonrpc": "2.0", "id": id, "error": error }),
    })
}

async fn spawn_node(node: Arc<Node>) -> SocketAddr {
    let app = Router::new().route("/", post(handle)).with_state(node);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client_config(endpoints: Vec<String>) -> RpcClientConfig {
    RpcClientConfig {
        endpoints,
        retry: RetryPolicy::fixed(3, Duration::from_millis(10)),
        receipt_poll_interval: Duration::from_millis(10),
        ..RpcClientConfig::new("unused", REGISTRY)
    }
}

async fn client_for(node: Arc<Node>) -> (Arc<RegistryRpcClient>, Arc<Node>) {
    let addr = spawn_node(node.clone()).await;
    let client = RegistryRpcClient::new(client_config(vec![format!("http://{addr}")])).unwrap();
    (Arc::new(client), node)
}

#[tokio::test]
async fn upload_over_json_rpc() {
    let node = Node::new();
    node.chain.store(1, Ordering::SeqCst);
    node.pending_receipt_polls.store(2, Ordering::SeqCst);
    let (client, node) = client_for(Arc::new(node)).await;
    let session = Arc::new(RpcWalletSession::new(client.clone(), Some(ACCOUNT)));
    let uploader = ContentUploader::new(client, session, CHAIN_ID)
        .with_retry_policy(RetryPolicy::fixed(3, Duration::from_millis(10)));

    let result = uploader.upload(&census_request()).await;

    assert!(result.success);
    assert_eq!(result.identifier.as_deref(), Some("42"));

    let switches = node.calls_to("wallet_switchEthereumChain");
    assert_eq!(switches, vec![json!([{ "chainId": "0x4cb2f" }])]);

    let sent = node.calls_to("eth_sendTransaction");
    assert_eq!(sent.len(), 1);
    let tx = &sent[0][0];
    assert_eq!(tx["from"], ACCOUNT.to_string());
    assert_eq!(tx["to"], REGISTRY.to_string());
    let selector = hex::encode(abi::selector(abi::UPLOAD_CONTENT_SIGNATURE));
    assert!(tx["data"].as_str().unwrap().starts_with(&format!("0x{selector}")));

    assert_eq!(node.calls_to("eth_getTransactionReceipt").len(), 3);
    let filter = &node.calls_to("eth_getLogs")[0][0];
    assert_eq!(filter["fromBlock"], "0x64");
    assert_eq!(filter["toBlock"], "0x64");
}

#[tokio::test]
async fn revert_reason_reaches_the_workflow() {
    let mut node = Node::new();
    node.revert_reason = Some("Content already exists".into());
    let (client, node) = client_for(Arc::new(node)).await;
    let session = Arc::new(RpcWalletSession::new(client.clone(), Some(ACCOUNT)));
    let uploader = ContentUploader::new(client, session, CHAIN_ID);

    let err = uploader.try_upload(&census_request()).await.unwrap_err();

    assert_eq!(err, UploadError::Rejected(RegistryError::ContentAlreadyExists));
    assert_eq!(node.calls_to("eth_sendTransaction").len(), 1);
    assert!(node.calls_to("eth_getTransactionReceipt").is_empty());
}

#[tokio::test]
async fn malformed_and_removed_logs_are_skipped() {
    let (client, _node) = client_for(Arc::new(Node::new())).await;

    let events = client.content_uploaded_events(100, 100).await.unwrap();

    assert_eq!(events, vec![event(42, "bafy123", 100)]);
}

#[tokio::test]
async fn lookup_decodes_uint_result() {
    let mut node = Node::new();
    node.lookup = 0;
    let (client, node) = client_for(Arc::new(node)).await;

    assert_eq!(client.lookup_identifier("bafy123").await.unwrap(), ContentId(0));
    let call = &node.calls_to("eth_call")[0];
    assert_eq!(call[1], "latest");
    let expected = hex_data(&abi::encode_lookup("bafy123"));
    assert_eq!(call[0]["data"], expected);
}

#[tokio::test]
async fn receipt_wait_honours_timeout() {
    let node = Node::new();
    node.pending_receipt_polls.store(usize::MAX, Ordering::SeqCst);
    let addr = spawn_node(Arc::new(node)).await;
    let client = RegistryRpcClient::new(RpcClientConfig {
        confirmation_timeout: Some(Duration::from_millis(100)),
        ..client_config(vec![format!("http://{addr}")])
    })
    .unwrap();

    assert_matches!(client.wait_for_receipt(TX).await, Err(LedgerError::Timeout(_)));
}

#[tokio::test]
async fn transport_failure_rotates_to_next_endpoint() {
    let dead = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let live = spawn_node(Arc::new(Node::new())).await;
    let client = RegistryRpcClient::new(client_config(vec![
        format!("http://{dead}"),
        format!("http://{live}"),
    ]))
    .unwrap();

    assert_eq!(client.chain_id().await.unwrap(), CHAIN_ID);
}

#[tokio::test]
async fn disconnected_session_sends_nothing() {
    let (client, node) = client_for(Arc::new(Node::new())).await;
    let session = Arc::new(RpcWalletSession::new(client.clone(), None));
    let uploader = ContentUploader::new(client, session, CHAIN_ID);

    let err = uploader.try_upload(&census_request()).await.unwrap_err();

    assert_eq!(err, UploadError::MissingIdentity);
    assert!(node.calls.lock().unwrap().is_empty());
}
