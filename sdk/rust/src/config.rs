//! Client configuration
//!
//! Loaded from a TOML file, then overridden from the environment.

use crate::{api::RpcClientConfig, retry::RetryPolicy};
use dehug_registry::{Address, FILECOIN_CALIBRATION_CHAIN_ID};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use thiserror::Error;

/// Configuration failures
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Offending path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },
    /// File is not valid TOML for this schema
    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
    /// Environment variable held an unusable value
    #[error("invalid value for {var}: {reason}")]
    InvalidEnv {
        /// Variable name
        var: &'static str,
        /// What was wrong
        reason: String,
    },
    /// A loaded value failed validation
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Ledger connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// Extra endpoints used on failover
    pub fallback_rpc_urls: Vec<String>,
    /// Network the registry lives on
    pub chain_id: u64,
    /// Registry contract address
    pub registry_address: Address,
    /// Submitting account, unset when no wallet is connected
    pub account: Option<Address>,
    /// Receipt polling interval
    pub receipt_poll_interval_ms: u64,
    /// Overall receipt wait limit, unset waits forever
    pub confirmation_timeout_ms: Option<u64>,
    /// Retry schedule for read-side RPC calls
    pub rpc_retry: RetryPolicy,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.calibration.node.glif.io/rpc/v1".to_string(),
            fallback_rpc_urls: Vec::new(),
            chain_id: FILECOIN_CALIBRATION_CHAIN_ID,
            registry_address: Address::ZERO,
            account: None,
            receipt_poll_interval_ms: 2_000,
            confirmation_timeout_ms: None,
            rpc_retry: RpcClientConfig::default_retry(),
        }
    }
}

impl ChainConfig {
    /// Receipt polling interval as a duration
    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    /// Receipt wait limit as a duration
    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_ms.map(Duration::from_millis)
    }
}

/// Upload workflow settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Reconciliation lookup schedule
    pub retry: RetryPolicy,
}

/// Download tracker endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerEndpoint {
    /// Tracker base URL
    pub url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TrackerEndpoint {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Content gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Gateway base URL; content is served at `<url>/<cid>`
    pub url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "https://gateway.pinata.cloud/ipfs".to_string(),
        }
    }
}

/// Catalogue API used by the repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Base URL serving `/datasets/<name>` and `/models/<name>`
    pub contract_api: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            contract_api: "https://api.dehug.io".to_string(),
        }
    }
}

/// Full client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeHugConfig {
    /// Ledger connection
    pub chain: ChainConfig,
    /// Upload workflow
    pub upload: UploadConfig,
    /// Download tracker
    pub tracker: TrackerEndpoint,
    /// Content gateway
    pub gateway: GatewayConfig,
    /// Catalogue API
    pub repository: RepositoryConfig,
}

impl DeHugConfig {
    /// Parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load `path` if given, otherwise defaults, then apply the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DEHUG_RPC_URL") {
            self.chain.rpc_url = url;
        }
        if let Some(address) = lookup("DEHUG_ADDRESS") {
            self.chain.registry_address =
                address.parse().map_err(|e| ConfigError::InvalidEnv {
                    var: "DEHUG_ADDRESS",
                    reason: format!("{e}"),
                })?;
        }
        if let Some(account) = lookup("DEHUG_ACCOUNT") {
            self.chain.account = Some(account.parse().map_err(|e| ConfigError::InvalidEnv {
                var: "DEHUG_ACCOUNT",
                reason: format!("{e}"),
            })?);
        }
        if let Some(chain_id) = lookup("DEHUG_CHAIN_ID") {
            self.chain.chain_id = chain_id.parse().map_err(|e| ConfigError::InvalidEnv {
                var: "DEHUG_CHAIN_ID",
                reason: format!("{e}"),
            })?;
        }
        if let Some(url) = lookup("DEHUG_TRACKER_URL") {
            self.tracker.url = url;
        }
        if let Some(url) = lookup("IPFS_GATEWAY") {
            self.gateway.url = url;
        }
        if let Some(url) = lookup("CONTRACT_API") {
            self.repository.contract_api = url;
        }
        Ok(())
    }

    /// Check the values needed to talk to the registry
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain.registry_address == Address::ZERO {
            return Err(ConfigError::Invalid(
                "chain.registry_address must be set".into(),
            ));
        }
        let urls = [
            ("chain.rpc_url", &self.chain.rpc_url),
            ("tracker.url", &self.tracker.url),
            ("gateway.url", &self.gateway.url),
            ("repository.contract_api", &self.repository.contract_api),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Invalid(format!(
                    "{name} is not an http(s) URL: {url}"
                )));
            }
        }
        if self.chain.receipt_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "chain.receipt_poll_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}
