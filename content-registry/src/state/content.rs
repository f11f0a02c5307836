//! Content records as submitted to and stored by the registry

use super::ids::{Address, ContentId, TxHash};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// What kind of artifact is being registered. Encoded as `uint8` on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Training or evaluation data
    Dataset = 0,
    /// Trained model weights
    Model = 1,
}

impl ContentKind {
    /// On-chain discriminant
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode the on-chain discriminant
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Dataset),
            1 => Some(Self::Model),
            _ => None,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dataset => f.write_str("dataset"),
            Self::Model => f.write_str("model"),
        }
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dataset" | "0" => Ok(Self::Dataset),
            "model" | "1" => Ok(Self::Model),
            other => Err(format!("unknown content kind: {other}")),
        }
    }
}

/// One submission attempt. Built by the caller, never persisted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUploadRequest {
    /// Dataset or model
    pub kind: ContentKind,
    /// Content-addressed hash of the payload
    pub content_locator: String,
    /// Content-addressed hash of the metadata document
    pub metadata_locator: String,
    /// Content-addressed hash of a preview image
    #[serde(default)]
    pub image_locator: Option<String>,
    /// Display title
    pub title: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Search tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ContentUploadRequest {
    /// Request with the required fields set and everything else empty
    pub fn new(
        kind: ContentKind,
        content_locator: impl Into<String>,
        metadata_locator: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            content_locator: content_locator.into(),
            metadata_locator: metadata_locator.into(),
            image_locator: None,
            title: title.into(),
            description: String::new(),
            tags: Vec::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the preview image locator
    pub fn with_image(mut self, image_locator: impl Into<String>) -> Self {
        self.image_locator = Some(image_locator.into());
        self
    }

    /// Set the tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Image locator as the contract receives it (empty when absent)
    pub fn image_locator_or_empty(&self) -> &str {
        self.image_locator.as_deref().unwrap_or("")
    }
}

/// Authoritative record held by the registry, keyed by content locator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredContent {
    /// Assigned token id
    pub id: ContentId,
    /// Account that submitted the content
    pub uploader: Address,
    /// Dataset or model
    pub kind: ContentKind,
    /// Payload locator
    pub content_locator: String,
    /// Metadata locator
    pub metadata_locator: String,
    /// Preview image locator, empty when none was given
    pub image_locator: String,
    /// Display title
    pub title: String,
    /// Description
    pub description: String,
    /// Tags
    pub tags: Vec<String>,
    /// Block the registration landed in
    pub block_number: u64,
}

/// `ContentUploaded` notification emitted for each accepted registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUploadedEvent {
    /// Minted token id
    pub id: ContentId,
    /// Submitting account
    pub uploader: Address,
    /// Dataset or model
    pub kind: ContentKind,
    /// Payload locator
    pub content_locator: String,
    /// Display title
    pub title: String,
    /// Block the event was emitted in
    pub block_number: u64,
    /// Transaction that emitted it
    pub transaction_hash: TxHash,
}
