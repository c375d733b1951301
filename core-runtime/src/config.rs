//! # Document Sync Configuration
//!
//! Provides configuration management for the document synchronization engine.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `DocSyncConfig` instance holding the storage locations, the host bridges
//! and the credentials of every external system the engine should talk to.
//! Validation is fail-fast: `build()` returns an actionable error instead of
//! letting a half-configured engine start.
//!
//! ## Required Settings
//!
//! - `database_path` - SQLite file holding documents, versions and the sync log
//! - `documents_dir` - flat directory of the local content store
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest)
//! - `FileSystemAccess` - File I/O (desktop default: tokio fs)
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults are
//! injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{DocSyncConfig, GoogleDriveSettings, RetentionPolicy};
//!
//! let config = DocSyncConfig::builder()
//!     .database_path("/var/lib/docsync/docsync.db")
//!     .documents_dir("/var/lib/docsync/documents")
//!     .retention(RetentionPolicy::KeepLast(10))
//!     .google_drive(GoogleDriveSettings::new(token))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{FileSystemAccess, HttpClient};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// What happens to superseded local content files.
///
/// Each committed version writes a new file under the documents directory.
/// `KeepAll` never deletes them; `KeepLast(n)` keeps the newest `n` files per
/// document (the current one always survives).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    #[default]
    KeepAll,
    KeepLast(usize),
}

impl RetentionPolicy {
    /// Number of files to keep per document, `None` for unlimited
    pub fn keep_last(&self) -> Option<usize> {
        match self {
            RetentionPolicy::KeepAll => None,
            RetentionPolicy::KeepLast(n) => Some(*n),
        }
    }
}

/// Google Drive credentials and target folder
#[derive(Clone, PartialEq, Eq)]
pub struct GoogleDriveSettings {
    /// OAuth access token with the `drive.file` scope
    pub access_token: String,
    /// Parent folder for uploaded documents; Drive root when absent
    pub folder_id: Option<String>,
}

impl GoogleDriveSettings {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            folder_id: None,
        }
    }

    pub fn with_folder_id(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }
}

impl fmt::Debug for GoogleDriveSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleDriveSettings")
            .field("access_token", &"[REDACTED]")
            .field("folder_id", &self.folder_id)
            .finish()
    }
}

/// OneDrive (Microsoft Graph) credentials and target folder
#[derive(Clone, PartialEq, Eq)]
pub struct OneDriveSettings {
    /// OAuth access token with `Files.ReadWrite`
    pub access_token: String,
    /// Folder path below the drive root, e.g. `Apps/DocSync`
    pub folder_path: String,
}

impl OneDriveSettings {
    pub const DEFAULT_FOLDER: &'static str = "DocSync";

    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            folder_path: Self::DEFAULT_FOLDER.to_string(),
        }
    }

    pub fn with_folder_path(mut self, folder_path: impl Into<String>) -> Self {
        self.folder_path = folder_path.into();
        self
    }
}

impl fmt::Debug for OneDriveSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneDriveSettings")
            .field("access_token", &"[REDACTED]")
            .field("folder_path", &self.folder_path)
            .finish()
    }
}

/// Configuration for the document synchronization engine.
///
/// Use [`DocSyncConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct DocSyncConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Directory of the local content store
    pub documents_dir: PathBuf,

    /// Maximum number of pooled database connections
    pub max_connections: u32,

    /// Retention of superseded local content files
    pub retention: RetentionPolicy,

    /// HTTP client used by cloud providers (optional with desktop default)
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// File system access abstraction (optional with desktop default)
    pub file_system: Option<Arc<dyn FileSystemAccess>>,

    /// Google Drive provider settings; provider disabled when absent
    pub google_drive: Option<GoogleDriveSettings>,

    /// OneDrive provider settings; provider disabled when absent
    pub onedrive: Option<OneDriveSettings>,
}

impl fmt::Debug for DocSyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocSyncConfig")
            .field("database_path", &self.database_path)
            .field("documents_dir", &self.documents_dir)
            .field("max_connections", &self.max_connections)
            .field("retention", &self.retention)
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field(
                "file_system",
                &self
                    .file_system
                    .as_ref()
                    .map(|_| "FileSystemAccess { ... }"),
            )
            .field("google_drive", &self.google_drive)
            .field("onedrive", &self.onedrive)
            .finish()
    }
}

impl DocSyncConfig {
    /// Creates a new builder for constructing a `DocSyncConfig`.
    pub fn builder() -> DocSyncConfigBuilder {
        DocSyncConfigBuilder::default()
    }

    /// Whether any cloud provider is configured
    pub fn needs_http(&self) -> bool {
        self.google_drive.is_some() || self.onedrive.is_some()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Paths are not empty
    /// - Pool size and retention are positive
    /// - Provider credentials are present
    /// - Bridges needed by the configured providers are available
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.documents_dir.as_os_str().is_empty() {
            return Err(Error::Config(
                "Documents directory cannot be empty".to_string(),
            ));
        }

        if self.max_connections == 0 {
            return Err(Error::Config(
                "Max connections must be greater than 0".to_string(),
            ));
        }

        if self.retention == RetentionPolicy::KeepLast(0) {
            return Err(Error::Config(
                "Retention must keep at least the current file. Use KeepLast(n) with n >= 1."
                    .to_string(),
            ));
        }

        if let Some(settings) = &self.google_drive {
            if settings.access_token.trim().is_empty() {
                return Err(Error::Config(
                    "Google Drive access token cannot be empty".to_string(),
                ));
            }
        }

        if let Some(settings) = &self.onedrive {
            if settings.access_token.trim().is_empty() {
                return Err(Error::Config(
                    "OneDrive access token cannot be empty".to_string(),
                ));
            }
            if settings.folder_path.trim_matches('/').is_empty() {
                return Err(Error::Config(
                    "OneDrive folder path cannot be empty".to_string(),
                ));
            }
        }

        if self.file_system.is_none() {
            return Err(file_system_missing_error());
        }

        if self.needs_http() && self.http_client.is_none() {
            return Err(http_client_missing_error());
        }

        Ok(())
    }
}

fn file_system_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required for the local content store. \
                 Desktop: enable the 'desktop-shims' feature to use the default TokioFileSystem. \
                 Otherwise inject an implementation with .file_system()."
            .to_string(),
    }
}

fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required when a cloud provider is configured. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Otherwise inject an implementation with .http_client()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Option<Arc<dyn FileSystemAccess>> {
    let fs: Arc<dyn FileSystemAccess> = Arc::new(bridge_desktop::TokioFileSystem::new());
    Some(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Option<Arc<dyn FileSystemAccess>> {
    None
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Option<Arc<dyn HttpClient>>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new()
        .map_err(|e| Error::Config(format!("Failed to create default HttpClient: {}", e)))?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(Some(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Option<Arc<dyn HttpClient>>> {
    Ok(None)
}

/// Builder for constructing [`DocSyncConfig`] instances.
///
/// Set what you need, then call [`build()`](DocSyncConfigBuilder::build).
#[derive(Default)]
pub struct DocSyncConfigBuilder {
    database_path: Option<PathBuf>,
    documents_dir: Option<PathBuf>,
    max_connections: Option<u32>,
    retention: RetentionPolicy,
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    google_drive: Option<GoogleDriveSettings>,
    onedrive: Option<OneDriveSettings>,
}

impl DocSyncConfigBuilder {
    /// Sets the database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::DocSyncConfig;
    ///
    /// let builder = DocSyncConfig::builder()
    ///     .database_path("/path/to/docsync.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the local content store directory.
    pub fn documents_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.documents_dir = Some(path.into());
        self
    }

    /// Sets the database pool size.
    ///
    /// Default: 5
    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = Some(max_connections);
        self
    }

    /// Sets the retention policy for superseded content files.
    ///
    /// Default: [`RetentionPolicy::KeepAll`]
    pub fn retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled and a cloud provider is configured.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the file system access implementation.
    ///
    /// If not provided, the desktop default (tokio fs-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Enables the Google Drive provider.
    pub fn google_drive(mut self, settings: GoogleDriveSettings) -> Self {
        self.google_drive = Some(settings);
        self
    }

    /// Enables the OneDrive provider.
    pub fn onedrive(mut self, settings: OneDriveSettings) -> Self {
        self.onedrive = Some(settings);
        self
    }

    /// Builds the final `DocSyncConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(DocSyncConfig)` on success, or an error if:
    /// - Required paths are missing
    /// - Configuration values are invalid
    /// - A bridge needed by the configured providers is unavailable
    pub fn build(self) -> Result<DocSyncConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let documents_dir = self.documents_dir.ok_or_else(|| {
            Error::Config(
                "Documents directory is required. Use .documents_dir() to set it.".to_string(),
            )
        })?;

        let file_system = match self.file_system {
            Some(fs) => Some(fs),
            None => provide_default_file_system(),
        };

        let needs_http = self.google_drive.is_some() || self.onedrive.is_some();
        let http_client = match self.http_client {
            Some(client) => Some(client),
            None if needs_http => provide_default_http_client()?,
            None => None,
        };

        let config = DocSyncConfig {
            database_path,
            documents_dir,
            max_connections: self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
            retention: self.retention,
            http_client,
            file_system,
            google_drive: self.google_drive,
            onedrive: self.onedrive,
        };

        config.validate()?;

        Ok(config)
    }
}
