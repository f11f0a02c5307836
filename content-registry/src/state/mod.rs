//! Registry state - content records, events and on-chain identifiers

mod content;
mod ids;

pub use content::{ContentKind, ContentUploadRequest, ContentUploadedEvent, RegisteredContent};
pub use ids::{Address, ContentId, ParseIdError, TxHash};
