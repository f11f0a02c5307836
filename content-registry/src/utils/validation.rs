//! Registry Validation - Field checks applied by the contract before minting

use crate::{errors::RegistryError, state::ContentUploadRequest};

/// Check the required fields in the order the contract does.
///
/// The contract only rejects zero-length strings; whitespace passes here.
pub fn validate_submission(request: &ContentUploadRequest) -> Result<(), RegistryError> {
    if request.content_locator.is_empty() {
        return Err(RegistryError::EmptyContentLocator);
    }
    if request.metadata_locator.is_empty() {
        return Err(RegistryError::EmptyMetadataLocator);
    }
    if request.title.is_empty() {
        return Err(RegistryError::EmptyTitle);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ContentKind;

    fn request() -> ContentUploadRequest {
        ContentUploadRequest::new(ContentKind::Model, "bafy123", "bafy456", "Yoruba BERT")
    }

    #[test]
    fn accepts_complete_request() {
        assert!(validate_submission(&request()).is_ok());
    }

    #[test]
    fn content_locator_checked_first() {
        let mut req = request();
        req.content_locator.clear();
        req.title.clear();
        assert_eq!(validate_submission(&req), Err(RegistryError::EmptyContentLocator));
    }

    #[test]
    fn reports_each_missing_field() {
        let mut req = request();
        req.metadata_locator.clear();
        assert_eq!(validate_submission(&req), Err(RegistryError::EmptyMetadataLocator));

        let mut req = request();
        req.title.clear();
        assert_eq!(validate_submission(&req), Err(RegistryError::EmptyTitle));
    }
}
