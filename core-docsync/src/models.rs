//! # Document Sync Domain Models
//!
//! Rows owned by the sync engine and the value types passed in and out of
//! [`DocumentSyncService`](crate::DocumentSyncService).
//!
//! ## Status Machine
//!
//! ```text
//! (push ok) ──→ Synced ←──────┐
//!                 │            │ successful pull
//!      failed pull│            │
//!                 ↓            │
//! (push failed) → Error ───────┘
//! ```
//!
//! `Pending` is accepted when reading rows but never produced by the engine.

use crate::{Result, SyncError};
use bridge_traits::ExternalSystem;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a synced document (UUID v4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Create a new random document ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a document ID from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| SyncError::InvalidDocumentId(e.to_string()))?,
        ))
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for DocumentId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// Status Types
// ============================================================================

/// Synchronization state of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Created but not yet attempted; never written by the engine
    Pending,
    /// Local copy matches the last fetched or uploaded remote content
    Synced,
    /// The last push or pull failed
    Error,
}

impl SyncStatus {
    /// Get the string representation for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Error => "error",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SyncStatus::Pending),
            "synced" => Ok(SyncStatus::Synced),
            "error" => Ok(SyncStatus::Error),
            _ => Err(SyncError::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of a synchronization attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Push,
    Pull,
}

impl SyncOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperation::Push => "push",
            SyncOperation::Pull => "pull",
        }
    }
}

impl FromStr for SyncOperation {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "push" => Ok(SyncOperation::Push),
            "pull" => Ok(SyncOperation::Pull),
            _ => Err(SyncError::InvalidOperation(s.to_string())),
        }
    }
}

impl std::fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome recorded for a synchronization attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Error,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Success => "success",
            LogStatus::Error => "error",
        }
    }
}

impl FromStr for LogStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "success" => Ok(LogStatus::Success),
            "error" => Ok(LogStatus::Error),
            _ => Err(SyncError::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for LogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Rows
// ============================================================================

/// A locally owned document kept in sync with an external system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedDocument {
    pub id: DocumentId,
    pub name: String,
    /// Current local copy; replaced whenever a new version is committed
    pub path: PathBuf,
    pub mime_type: String,
    pub size: u64,
    pub external_id: Option<String>,
    pub external_system: Option<ExternalSystem>,
    pub project_id: i64,
    pub owner_id: String,
    pub sync_status: SyncStatus,
    /// SHA-256 of the bytes at `path`, equal to the head version's checksum
    pub checksum: String,
    pub last_modified: DateTime<Utc>,
    pub last_synced: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One committed content change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub id: i64,
    pub document_id: DocumentId,
    pub version_number: u32,
    pub size: u64,
    pub checksum: String,
    pub created_by: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Content of a version about to be committed.
///
/// The version number is assigned by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVersion {
    /// Local file holding the content
    pub path: PathBuf,
    pub size: u64,
    pub checksum: String,
    pub created_by: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Audit record of one synchronization attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: i64,
    pub document_id: DocumentId,
    pub operation: SyncOperation,
    pub status: LogStatus,
    pub message: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Audit record before insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSyncLogEntry {
    pub document_id: DocumentId,
    pub operation: SyncOperation,
    pub status: LogStatus,
    pub message: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Service Inputs / Outputs
// ============================================================================

/// Result of a pull
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Document as stored after the pull
    pub document: SyncedDocument,
    /// Version committed by this pull, `None` when the content was unchanged
    pub new_version: Option<u32>,
}

impl SyncOutcome {
    pub fn changed(&self) -> bool {
        self.new_version.is_some()
    }
}

/// A new document to store locally and push to an external system
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub content: Bytes,
    pub file_name: String,
    pub mime_type: String,
    pub project_id: i64,
    pub user_id: String,
    pub external_system: ExternalSystem,
}

impl UploadRequest {
    pub fn new(
        content: impl Into<Bytes>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        project_id: i64,
        user_id: impl Into<String>,
        external_system: ExternalSystem,
    ) -> Self {
        Self {
            content: content.into(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            project_id,
            user_id: user_id.into(),
            external_system,
        }
    }
}

/// Convert stored epoch milliseconds back into a timestamp
pub(crate) fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| SyncError::Database(format!("Invalid timestamp: {}", millis)))
}
