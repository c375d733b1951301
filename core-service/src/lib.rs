//! Core service façade and bootstrap helpers.
//!
//! This crate turns a validated [`DocSyncConfig`] into a running
//! [`DocumentSyncService`]: it opens the database, prepares the local content
//! store and registers a provider for every external system the host
//! configured. Desktop apps typically enable the `desktop-shims` feature
//! (which depends on `bridge-desktop`) so the filesystem and HTTP bridges are
//! filled in automatically.
//!
//! ```ignore
//! use core_runtime::config::{DocSyncConfig, GoogleDriveSettings};
//!
//! let config = DocSyncConfig::builder()
//!     .database_path("/var/lib/docsync/docsync.db")
//!     .documents_dir("/var/lib/docsync/documents")
//!     .google_drive(GoogleDriveSettings::new(token))
//!     .build()?;
//!
//! let core = core_service::bootstrap(config).await?;
//! let service = core.sync_service();
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use core_docsync::DocumentSyncService;
pub use core_runtime::config::{DocSyncConfig, GoogleDriveSettings, OneDriveSettings, RetentionPolicy};

use bridge_traits::{Clock, FileSystemAccess, SystemClock};
use core_docsync::db::{create_pool, DatabaseConfig};
use core_docsync::{LocalContentStore, LocalSyncProvider, SqliteDocumentRepository};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;
#[cfg(not(all(feature = "google-drive", feature = "onedrive")))]
use tracing::warn;

/// Subdirectory of the documents directory used by the local provider
pub const LOCAL_REMOTE_DIR: &str = "local-remote";

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct DocSyncCore {
    service: Arc<DocumentSyncService>,
    pool: SqlitePool,
}

impl DocSyncCore {
    /// Shared handle to the sync orchestrator
    pub fn sync_service(&self) -> Arc<DocumentSyncService> {
        Arc::clone(&self.service)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database pool, waiting for in-flight queries
    pub async fn shutdown(&self) {
        self.pool.close().await;
        info!("Document sync core shut down");
    }
}

/// Build a ready-to-use sync core from `config`.
///
/// # Errors
///
/// - `Config` / `CapabilityMissing` when the configuration is invalid
/// - `Sync` when the database cannot be opened or migrated
pub async fn bootstrap(config: DocSyncConfig) -> Result<DocSyncCore> {
    config.validate()?;

    let file_system: Arc<dyn FileSystemAccess> =
        config
            .file_system
            .clone()
            .ok_or_else(|| CoreError::CapabilityMissing {
                capability: "FileSystemAccess".to_string(),
                message: "No filesystem bridge configured".to_string(),
            })?;

    let pool = create_pool(
        DatabaseConfig::new(&config.database_path).max_connections(config.max_connections),
    )
    .await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let content_store = LocalContentStore::new(
        Arc::clone(&file_system),
        config.documents_dir.clone(),
        Arc::clone(&clock),
    );
    let service = DocumentSyncService::new(
        Arc::new(SqliteDocumentRepository::new(pool.clone())),
        content_store,
        Arc::clone(&clock),
    )
    .with_retention(config.retention);

    service.register_provider(Arc::new(LocalSyncProvider::new(
        Arc::clone(&file_system),
        config.documents_dir.join(LOCAL_REMOTE_DIR),
        clock,
    )));

    register_cloud_providers(&service, &config)?;

    info!(
        systems = ?service.registered_systems(),
        retention = ?config.retention,
        "Document sync core ready"
    );

    Ok(DocSyncCore {
        service: Arc::new(service),
        pool,
    })
}

fn register_cloud_providers(service: &DocumentSyncService, config: &DocSyncConfig) -> Result<()> {
    if let Some(settings) = &config.google_drive {
        register_google_drive(service, config, settings)?;
    }
    if let Some(settings) = &config.onedrive {
        register_onedrive(service, config, settings)?;
    }
    Ok(())
}

#[cfg(feature = "google-drive")]
fn register_google_drive(
    service: &DocumentSyncService,
    config: &DocSyncConfig,
    settings: &GoogleDriveSettings,
) -> Result<()> {
    let http_client = require_http_client(config)?;
    service.register_provider(Arc::new(
        provider_google_drive::GoogleDriveConnector::from_settings(http_client, settings),
    ));
    Ok(())
}

#[cfg(not(feature = "google-drive"))]
fn register_google_drive(
    _service: &DocumentSyncService,
    _config: &DocSyncConfig,
    _settings: &GoogleDriveSettings,
) -> Result<()> {
    warn!("Google Drive is configured but the google-drive feature is disabled");
    Ok(())
}

#[cfg(feature = "onedrive")]
fn register_onedrive(
    service: &DocumentSyncService,
    config: &DocSyncConfig,
    settings: &OneDriveSettings,
) -> Result<()> {
    let http_client = require_http_client(config)?;
    service.register_provider(Arc::new(
        provider_onedrive::OneDriveConnector::from_settings(http_client, settings),
    ));
    Ok(())
}

#[cfg(not(feature = "onedrive"))]
fn register_onedrive(
    _service: &DocumentSyncService,
    _config: &DocSyncConfig,
    _settings: &OneDriveSettings,
) -> Result<()> {
    warn!("OneDrive is configured but the onedrive feature is disabled");
    Ok(())
}

#[cfg(any(feature = "google-drive", feature = "onedrive"))]
fn require_http_client(config: &DocSyncConfig) -> Result<Arc<dyn bridge_traits::HttpClient>> {
    config
        .http_client
        .clone()
        .ok_or_else(|| CoreError::CapabilityMissing {
            capability: "HttpClient".to_string(),
            message: "A cloud provider is configured but no HTTP bridge is available".to_string(),
        })
}
