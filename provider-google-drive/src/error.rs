//! Error types for Google Drive provider

use thiserror::Error;

/// Google Drive provider errors
#[derive(Error, Debug)]
pub enum GoogleDriveError {
    /// Authentication failed or token is invalid
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned an error
    #[error("Google Drive API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Rate limit still exceeded after retries
    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    #[error("File not found: {file_id}")]
    FileNotFound { file_id: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error(transparent)]
    BridgeError(#[from] bridge_traits::error::BridgeError),
}

/// Result type for Google Drive operations
pub type Result<T> = std::result::Result<T, GoogleDriveError>;

impl From<GoogleDriveError> for bridge_traits::error::BridgeError {
    fn from(error: GoogleDriveError) -> Self {
        match error {
            GoogleDriveError::BridgeError(e) => e,
            other => bridge_traits::error::BridgeError::OperationFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;

    #[test]
    fn test_error_display() {
        let error = GoogleDriveError::ApiError {
            status_code: 403,
            message: "Insufficient permissions".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Google Drive API error (status 403): Insufficient permissions"
        );
    }

    #[test]
    fn test_error_conversion_keeps_message() {
        let error = GoogleDriveError::FileNotFound {
            file_id: "1AbC".to_string(),
        };
        let bridge_error: BridgeError = error.into();

        match bridge_error {
            BridgeError::OperationFailed(message) => assert!(message.contains("1AbC")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_bridge_error_passes_through() {
        let error = GoogleDriveError::from(BridgeError::NotAvailable("http".to_string()));
        let bridge_error: BridgeError = error.into();
        assert!(matches!(bridge_error, BridgeError::NotAvailable(_)));
    }
}
