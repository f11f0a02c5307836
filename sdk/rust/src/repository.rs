//! Dataset and model retrieval through the catalogue API and the gateway

use crate::tracker::TrackerClient;
use dehug_tracker::DownloadSource;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument};

/// Retrieval failures
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Catalogue or gateway request failed
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Catalogue entry names a format the SDK cannot load
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Loaded dataset contents
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetContent {
    /// Parsed JSON document
    Json(Value),
    /// Raw CSV text
    Csv(String),
}

#[derive(Debug, Deserialize)]
struct DatasetEntry {
    cid: String,
    #[serde(default = "default_format")]
    format: String,
}

fn default_format() -> String {
    "json".to_string()
}

/// Catalogue-backed loader for registered datasets and models
#[derive(Debug, Clone)]
pub struct Repository {
    http: reqwest::Client,
    contract_api: String,
    tracker: TrackerClient,
}

impl Repository {
    /// Repository over the catalogue at `contract_api`
    pub fn new(contract_api: impl Into<String>, tracker: TrackerClient) -> Self {
        Self {
            http: reqwest::Client::new(),
            contract_api: contract_api.into().trim_end_matches('/').to_string(),
            tracker,
        }
    }

    /// Fetch a dataset by name and count the download
    #[instrument(skip(self))]
    pub async fn load_dataset(&self, name: &str) -> Result<DatasetContent, RepositoryError> {
        let entry: DatasetEntry = self
            .http
            .get(format!("{}/datasets/{}", self.contract_api, name))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let file = self
            .http
            .get(self.tracker.gateway_url(&entry.cid))
            .send()
            .await?
            .error_for_status()?;

        self.tracker.track_download(name, DownloadSource::Sdk).await;
        info!(cid = %entry.cid, format = %entry.format, "dataset fetched");

        match entry.format.as_str() {
            "json" => Ok(DatasetContent::Json(file.json().await?)),
            "csv" => Ok(DatasetContent::Csv(file.text().await?)),
            other => Err(RepositoryError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Fetch a model descriptor by name and count the download
    #[instrument(skip(self))]
    pub async fn load_model(&self, name: &str) -> Result<Value, RepositoryError> {
        let model: Value = self
            .http
            .get(format!("{}/models/{}", self.contract_api, name))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        self.tracker.track_download(name, DownloadSource::Sdk).await;
        Ok(model)
    }
}
