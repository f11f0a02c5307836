//! DeHug Content Registry - Reference model of the on-chain dataset/model registry
//!
//! Mirrors the rules the registry contract enforces when content is uploaded:
//! required-field checks with their exact revert reasons, duplicate locator
//! rejection, sequential token ids and the `ContentUploaded` event log.

#![forbid(unsafe_code)]
#![warn(missing_docs, unused_qualifications)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]

mod errors;
mod registry;
mod state;
mod utils;

pub use errors::*;
pub use registry::{InMemoryRegistry, RegistrationOutcome};
pub use state::*;
pub use utils::*;

/// Filecoin Calibration testnet, the chain the registry is deployed on.
pub const FILECOIN_CALIBRATION_CHAIN_ID: u64 = 314_159;
