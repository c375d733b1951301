//! # Document Sync Engine
//!
//! Keeps locally stored documents in step with external storage systems
//! (Google Drive, OneDrive, a local directory).
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite schema and migrations for documents, versions and the sync log
//! - An append-only, gapless version chain per document
//! - Pull and push orchestration through pluggable [`SyncProvider`]s
//! - Content-addressed change detection (SHA-256)
//! - Per-document serialization of concurrent pulls
//!
//! [`SyncProvider`]: bridge_traits::SyncProvider

pub mod content_store;
pub mod db;
pub mod error;
pub mod local_provider;
pub mod locks;
pub mod models;
pub mod providers;
pub mod repository;
pub mod service;
pub mod sync_log;
pub mod version_chain;

pub use content_store::{checksum, LocalContentStore};
pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{Result, SyncError};
pub use local_provider::LocalSyncProvider;
pub use models::{
    DocumentId, DocumentVersion, LogStatus, SyncLogEntry, SyncOperation, SyncOutcome,
    SyncStatus, SyncedDocument, UploadRequest,
};
pub use repository::{DocumentRepository, SqliteDocumentRepository};
pub use service::DocumentSyncService;
pub use version_chain::ChainReport;
