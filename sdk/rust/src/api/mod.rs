//! DeHug API Layer - client facade over the registry, tracker and repository

use crate::{
    config::{ConfigError, DeHugConfig},
    ledger::{LedgerError, RegistryLedger, StaticSession, WalletSession},
    repository::Repository,
    tracker::{TrackerClient, TrackerError},
    upload::{ContentUploadResult, ContentUploader},
};
use dehug_registry::{Address, ContentUploadRequest, InMemoryRegistry};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::info;

pub mod rpc_client;

pub use rpc_client::{RegistryRpcClient, RpcClientConfig, RpcWalletSession};

/// Account used by simulated sessions when none is configured
pub const SIMULATION_ACCOUNT: Address = Address([0x11; 20]);

/// Client construction failures
#[derive(Error, Debug)]
pub enum ClientError {
    /// Configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Ledger client could not be built
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// Tracker client could not be built
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Core client wiring configuration to every DeHug service
pub struct DeHugClient {
    uploader: ContentUploader,
    tracker: TrackerClient,
    repository: Repository,
}

impl std::fmt::Debug for DeHugClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeHugClient")
            .field("tracker", &self.tracker)
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}

impl DeHugClient {
    /// Client talking JSON-RPC to the configured chain
    pub fn from_config(config: &DeHugConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let mut endpoints = vec![config.chain.rpc_url.clone()];
        endpoints.extend(config.chain.fallback_rpc_urls.iter().cloned());
        let rpc = Arc::new(RegistryRpcClient::new(RpcClientConfig {
            endpoints,
            registry: config.chain.registry_address,
            retry: config.chain.rpc_retry.clone(),
            receipt_poll_interval: config.chain.receipt_poll_interval(),
            confirmation_timeout: config.chain.confirmation_timeout(),
            ..RpcClientConfig::new(config.chain.rpc_url.clone(), config.chain.registry_address)
        })?);
        let session = Arc::new(RpcWalletSession::new(rpc.clone(), config.chain.account));

        info!(
            rpc_url = %config.chain.rpc_url,
            registry = %config.chain.registry_address,
            "DeHug client ready"
        );
        Self::with_backend(config, rpc, session)
    }

    /// Client running against a fresh in-memory registry
    pub fn simulated(config: &DeHugConfig) -> Result<Self, ClientError> {
        let chain_id = config.chain.chain_id;
        let registry = Arc::new(InMemoryRegistry::new(chain_id));
        let account = config.chain.account.unwrap_or(SIMULATION_ACCOUNT);
        let session = Arc::new(StaticSession::new(account, chain_id));
        Self::with_backend(config, registry, session)
    }

    /// Client over caller-supplied ledger and session
    pub fn with_backend(
        config: &DeHugConfig,
        ledger: Arc<dyn RegistryLedger>,
        session: Arc<dyn WalletSession>,
    ) -> Result<Self, ClientError> {
        let uploader = ContentUploader::new(ledger, session, config.chain.chain_id)
            .with_retry_policy(config.upload.retry.clone());
        let tracker = TrackerClient::new(
            config.tracker.url.clone(),
            config.gateway.url.clone(),
            Duration::from_secs(config.tracker.timeout_secs),
        )?;
        let repository = Repository::new(config.repository.contract_api.clone(), tracker.clone());
        Ok(Self {
            uploader,
            tracker,
            repository,
        })
    }

    /// Register content, reporting the outcome through the uploader's notifier
    pub async fn upload(&self, request: &ContentUploadRequest) -> ContentUploadResult {
        self.uploader.upload(request).await
    }

    /// Registration workflow
    pub fn uploader(&self) -> &ContentUploader {
        &self.uploader
    }

    /// Download tracker client
    pub fn tracker(&self) -> &TrackerClient {
        &self.tracker
    }

    /// Dataset and model loader
    pub fn repository(&self) -> &Repository {
        &self.repository
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use dehug_registry::ContentKind;

    #[test]
    fn rpc_client_requires_registry_address() {
        assert_matches!(
            DeHugClient::from_config(&DeHugConfig::default()),
            Err(ClientError::Config(ConfigError::Invalid(_)))
        );
    }

    #[tokio::test]
    async fn simulated_client_registers_content() {
        let mut config = DeHugConfig::default();
        config.upload.retry = crate::retry::RetryPolicy::no_retry();
        let client = DeHugClient::simulated(&config).unwrap();

        let request =
            ContentUploadRequest::new(ContentKind::Dataset, "bafy123", "bafy456", "Census Data");
        let result = client.upload(&request).await;
        assert!(result.success);
        assert_eq!(result.identifier.as_deref(), Some("1"));

        let duplicate = client.upload(&request).await;
        assert!(!duplicate.success);
    }
}
