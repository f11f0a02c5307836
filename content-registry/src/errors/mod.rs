//! Registry Error Hierarchy - Contract revert reasons
//!
//! The `Display` text of each variant is the exact reason string the
//! registry contract reverts with. Clients match on these strings, so they
//! must not change.

use thiserror::Error;

/// Reasons the registry rejects an `uploadContent` call
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// Content locator was empty
    #[error("IPFS hash cannot be empty")]
    EmptyContentLocator,
    /// Metadata locator was empty
    #[error("Metadata IPFS hash cannot be empty")]
    EmptyMetadataLocator,
    /// Title was empty
    #[error("Title cannot be empty")]
    EmptyTitle,
    /// The content locator is already registered
    #[error("Content already exists")]
    ContentAlreadyExists,
}

impl RegistryError {
    /// Every reason the contract can revert `uploadContent` with
    pub const ALL: [RegistryError; 4] = [
        RegistryError::EmptyContentLocator,
        RegistryError::EmptyMetadataLocator,
        RegistryError::EmptyTitle,
        RegistryError::ContentAlreadyExists,
    ];

    /// Exact-match a revert reason string back to its variant
    pub fn from_reason(reason: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.to_string() == reason)
    }
}
