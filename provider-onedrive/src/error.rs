use thiserror::Error;

#[derive(Error, Debug)]
pub enum OneDriveError {
    #[error("Graph API request failed (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    #[error("Throttled, retry after {0} seconds")]
    Throttled(u64),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Drive item not found: {item_id}")]
    ItemNotFound { item_id: String },

    #[error("Failed to parse Graph response: {0}")]
    ParseError(String),

    #[error(transparent)]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

pub type Result<T> = std::result::Result<T, OneDriveError>;

impl From<OneDriveError> for bridge_traits::error::BridgeError {
    fn from(error: OneDriveError) -> Self {
        match error {
            OneDriveError::Bridge(e) => e,
            other => bridge_traits::error::BridgeError::OperationFailed(other.to_string()),
        }
    }
}
