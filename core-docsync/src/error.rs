use bridge_traits::ExternalSystem;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Document {document_id} not found")]
    DocumentNotFound { document_id: String },

    #[error("No provider registered for external system '{system}'")]
    ProviderNotRegistered { system: ExternalSystem },

    #[error("Document {document_id} is not associated with an external system")]
    NoExternalSystem { document_id: String },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Document {document_id} stored locally, but synchronization failed: {message}")]
    UploadFailed {
        document_id: String,
        message: String,
    },

    #[error("Local storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Version {version_number} of document {document_id} already exists")]
    VersionConflict {
        document_id: String,
        version_number: u32,
    },

    #[error("Corrupt version chain for document {document_id}: {reason}")]
    CorruptVersionChain { document_id: String, reason: String },

    #[error("Invalid sync status: {0}")]
    InvalidStatus(String),

    #[error("Invalid sync operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid external system: {0}")]
    InvalidExternalSystem(String),

    #[error("Invalid document ID: {0}")]
    InvalidDocumentId(String),
}

impl SyncError {
    /// Text recorded in the sync log for a failed attempt.
    ///
    /// Provider failures keep the adapter's own message.
    pub fn audit_message(&self) -> String {
        match self {
            SyncError::Provider(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether the error means the referenced document does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::DocumentNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
