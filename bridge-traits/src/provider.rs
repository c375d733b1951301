//! External Storage Provider Contract
//!
//! Every external storage system a document can be synchronized with (cloud
//! drive, partner DMS, or the local filesystem stand-in) is wrapped in one
//! [`SyncProvider`] implementation. The set of systems is closed: adding a
//! system means adding an [`ExternalSystem`] variant, so every `match` over it
//! is re-checked by the compiler.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Supported external storage systems.
///
/// # Examples
///
/// ```
/// use bridge_traits::provider::ExternalSystem;
///
/// assert_eq!(ExternalSystem::GoogleDrive.as_str(), "google_drive");
/// assert_eq!(ExternalSystem::parse("onedrive"), Some(ExternalSystem::OneDrive));
/// assert_eq!(ExternalSystem::parse("ftp"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalSystem {
    /// Local filesystem stand-in used for internal storage and testing
    Local,
    /// Google Drive (API v3)
    GoogleDrive,
    /// Microsoft OneDrive (Graph API)
    #[serde(rename = "onedrive")]
    OneDrive,
}

impl ExternalSystem {
    /// All supported systems, in declaration order.
    pub const ALL: [ExternalSystem; 3] = [
        ExternalSystem::Local,
        ExternalSystem::GoogleDrive,
        ExternalSystem::OneDrive,
    ];

    /// Stable identifier stored in the database and accepted from callers
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalSystem::Local => "local",
            ExternalSystem::GoogleDrive => "google_drive",
            ExternalSystem::OneDrive => "onedrive",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            ExternalSystem::Local => "Local storage",
            ExternalSystem::GoogleDrive => "Google Drive",
            ExternalSystem::OneDrive => "OneDrive",
        }
    }

    /// Parse a system identifier
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "local" => Some(ExternalSystem::Local),
            "google_drive" | "googledrive" => Some(ExternalSystem::GoogleDrive),
            "onedrive" | "one_drive" => Some(ExternalSystem::OneDrive),
            _ => None,
        }
    }
}

impl fmt::Display for ExternalSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive metadata sent alongside an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub name: String,
    pub mime_type: String,
}

impl UploadMetadata {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// A change reported by a provider's change listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteChange {
    /// Provider handle usable with [`SyncProvider::fetch`]
    pub external_id: String,
    pub name: String,
    pub path: Option<String>,
    pub mime_type: String,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
}

/// Uniform contract over one external storage system.
///
/// Implementations are thin async wrappers over the remote API. Retries,
/// caching and timeouts are the implementation's own business; the sync
/// engine calls each method once per attempt and records the outcome.
#[async_trait]
pub trait SyncProvider: Send + Sync {
    /// The system this provider serves; used as its registry key
    fn system(&self) -> ExternalSystem;

    /// Fetch the current remote content for `external_id`
    async fn fetch(&self, external_id: &str) -> Result<Bytes>;

    /// Create or overwrite the remote copy of a local document.
    ///
    /// Calling this again with the same `local_doc_id` must overwrite the
    /// remote copy rather than create a second one. Returns the handle to use
    /// for future fetches.
    async fn upload(
        &self,
        local_doc_id: &str,
        content: Bytes,
        metadata: &UploadMetadata,
    ) -> Result<String>;

    /// List remote changes after `since`
    ///
    /// Extension point for poll-based sync; the engine does not call it yet.
    async fn list_changes(&self, since: DateTime<Utc>) -> Result<Vec<RemoteChange>>;
}
