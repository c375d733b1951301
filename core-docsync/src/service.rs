//! # Document Sync Service
//!
//! Orchestrates pushes and pulls between the local content store and the
//! registered external systems.
//!
//! ## Overview
//!
//! - **Pull** ([`sync_document`](DocumentSyncService::sync_document)): fetch
//!   the remote bytes and commit a new version only when the checksum changed.
//! - **Push** ([`upload_and_sync`](DocumentSyncService::upload_and_sync)):
//!   store a new document locally, upload it, and keep it even when the upload
//!   fails so it can be retried with a pull.
//!
//! Every attempt that reaches a known document id writes exactly one sync log
//! entry. Pulls of the same document are serialized through
//! [`DocumentLocks`]; the unique version constraint is the second line of
//! defence.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_docsync::{DocumentSyncService, UploadRequest};
//! use bridge_traits::ExternalSystem;
//!
//! let document = service
//!     .upload_and_sync(UploadRequest::new(bytes, "invoice.pdf", "application/pdf", 7, "user-1", ExternalSystem::GoogleDrive))
//!     .await?;
//!
//! let outcome = service.sync_document(&document.id, "user-1").await?;
//! if let Some(version) = outcome.new_version {
//!     println!("now at version {}", version);
//! }
//! ```

use crate::content_store::{checksum, LocalContentStore};
use crate::locks::DocumentLocks;
use crate::models::{
    DocumentId, DocumentVersion, LogStatus, NewVersion, SyncLogEntry, SyncOperation,
    SyncOutcome, SyncStatus, SyncedDocument, UploadRequest,
};
use crate::providers::ProviderRegistry;
use crate::repository::DocumentRepository;
use crate::sync_log::SyncLog;
use crate::version_chain::{verify_chain, ChainReport};
use crate::{Result, SyncError};
use bridge_traits::{Clock, ExternalSystem, SyncProvider, UploadMetadata};
use core_runtime::config::RetentionPolicy;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct DocumentSyncService {
    repository: Arc<dyn DocumentRepository>,
    content_store: LocalContentStore,
    sync_log: SyncLog,
    providers: ProviderRegistry,
    locks: DocumentLocks,
    clock: Arc<dyn Clock>,
    retention: RetentionPolicy,
}

impl DocumentSyncService {
    pub fn new(
        repository: Arc<dyn DocumentRepository>,
        content_store: LocalContentStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sync_log: SyncLog::new(Arc::clone(&repository), Arc::clone(&clock)),
            repository,
            content_store,
            providers: ProviderRegistry::new(),
            locks: DocumentLocks::new(),
            clock,
            retention: RetentionPolicy::default(),
        }
    }

    /// Set the retention policy for superseded local files
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    // ------------------------------------------------------------------------
    // Provider registry
    // ------------------------------------------------------------------------

    /// Register a provider under its own system; replaces any earlier one.
    pub fn register_provider(&self, provider: Arc<dyn SyncProvider>) {
        self.providers.register(provider);
    }

    pub fn has_provider(&self, system: ExternalSystem) -> bool {
        self.providers.contains(system)
    }

    pub fn registered_systems(&self) -> Vec<ExternalSystem> {
        self.providers.systems()
    }

    // ------------------------------------------------------------------------
    // Pull
    // ------------------------------------------------------------------------

    /// Pull the remote content of a document.
    ///
    /// Commits a new version when the fetched checksum differs from the
    /// stored one, otherwise only refreshes `last_synced`. A document whose
    /// earlier push failed (no external id yet) is re-uploaded from its local
    /// copy first.
    ///
    /// # Errors
    ///
    /// - `DocumentNotFound`: nothing is logged
    /// - `NoExternalSystem` / `ProviderNotRegistered`: logged as a failed pull
    /// - any later failure: logged, status set to `error`, then returned
    #[instrument(skip(self), fields(document_id = %document_id))]
    pub async fn sync_document(&self, document_id: &DocumentId, user_id: &str) -> Result<SyncOutcome> {
        let _guard = self.locks.acquire(document_id).await;

        let document = self.load(document_id).await?;

        let provider = match self.resolve_provider(&document) {
            Ok(provider) => provider,
            Err(err) => {
                self.sync_log
                    .record(
                        document_id,
                        SyncOperation::Pull,
                        LogStatus::Error,
                        err.audit_message(),
                        user_id,
                    )
                    .await?;
                return Err(err);
            }
        };

        match self.pull(&document, provider.as_ref(), user_id).await {
            Ok((outcome, message)) => {
                self.sync_log
                    .record(
                        document_id,
                        SyncOperation::Pull,
                        LogStatus::Success,
                        message,
                        user_id,
                    )
                    .await?;
                Ok(outcome)
            }
            Err(err) => {
                if let Err(mark_err) = self.repository.mark_error(document_id, self.clock.now()).await {
                    warn!(error = %mark_err, "Failed to mark document as errored");
                }
                self.sync_log
                    .record(
                        document_id,
                        SyncOperation::Pull,
                        LogStatus::Error,
                        err.audit_message(),
                        user_id,
                    )
                    .await?;
                Err(err)
            }
        }
    }

    fn resolve_provider(&self, document: &SyncedDocument) -> Result<Arc<dyn SyncProvider>> {
        let system = document
            .external_system
            .ok_or_else(|| SyncError::NoExternalSystem {
                document_id: document.id.to_string(),
            })?;

        self.providers
            .get(system)
            .ok_or(SyncError::ProviderNotRegistered { system })
    }

    /// Pull body; returns the outcome and the audit message
    async fn pull(
        &self,
        document: &SyncedDocument,
        provider: &dyn SyncProvider,
        user_id: &str,
    ) -> Result<(SyncOutcome, String)> {
        let external_id = match &document.external_id {
            Some(external_id) => external_id.clone(),
            None => self.reupload(document, provider).await?,
        };

        let content = provider
            .fetch(&external_id)
            .await
            .map_err(|e| SyncError::Provider(e.to_string()))?;
        let new_checksum = checksum(&content);
        let now = self.clock.now();

        if new_checksum == document.checksum {
            self.repository.mark_synced(&document.id, now).await?;
            let document = self.load(&document.id).await?;

            debug!("Remote content unchanged");
            return Ok((
                SyncOutcome {
                    document,
                    new_version: None,
                },
                "Document is already up to date".to_string(),
            ));
        }

        let path = self.content_store.write(&document.id, &content).await?;
        let system = provider.system();
        let version = self
            .repository
            .append_version(
                &document.id,
                &NewVersion {
                    path: path.clone(),
                    size: content.len() as u64,
                    checksum: new_checksum,
                    created_by: user_id.to_string(),
                    comment: Some(format!("Synchronized from {}", system)),
                    created_at: now,
                },
            )
            .await?;

        self.apply_retention(&document.id, &path).await;

        let document = self.load(&document.id).await?;
        info!(
            version = version.version_number,
            size = version.size,
            "Committed new document version"
        );

        Ok((
            SyncOutcome {
                document,
                new_version: Some(version.version_number),
            },
            format!("Document synchronized (version {})", version.version_number),
        ))
    }

    /// Upload the local copy of a document whose push never completed
    async fn reupload(&self, document: &SyncedDocument, provider: &dyn SyncProvider) -> Result<String> {
        info!("Document has no external id, retrying upload");

        let content = self.content_store.read(&document.path).await?;
        let metadata = UploadMetadata::new(&document.name, &document.mime_type);
        let external_id = provider
            .upload(&document.id.as_str(), content, &metadata)
            .await
            .map_err(|e| SyncError::Provider(e.to_string()))?;

        self.repository
            .set_external_id(&document.id, &external_id, self.clock.now())
            .await?;
        Ok(external_id)
    }

    async fn apply_retention(&self, document_id: &DocumentId, current: &Path) {
        let Some(keep_last) = self.retention.keep_last() else {
            return;
        };

        // Leftover files only cost disk space; the pull itself succeeded.
        if let Err(err) = self.content_store.prune(document_id, current, keep_last).await {
            warn!(error = %err, "Failed to prune superseded content files");
        }
    }

    // ------------------------------------------------------------------------
    // Push
    // ------------------------------------------------------------------------

    /// Store a new document locally and upload it.
    ///
    /// The document and its version 1 are persisted whether or not the upload
    /// succeeds. On upload failure the document is left in `error` without an
    /// external id and `UploadFailed` carries its id for a later
    /// [`sync_document`](Self::sync_document).
    ///
    /// # Errors
    ///
    /// - `ProviderNotRegistered` before anything is stored
    /// - `Storage` if the local write fails; nothing is persisted then
    /// - `UploadFailed` after the document was stored and the failure logged
    #[instrument(
        skip(self, request),
        fields(
            file_name = %request.file_name,
            system = %request.external_system,
            size = request.content.len()
        )
    )]
    pub async fn upload_and_sync(&self, request: UploadRequest) -> Result<SyncedDocument> {
        let system = request.external_system;
        let provider = self
            .providers
            .get(system)
            .ok_or(SyncError::ProviderNotRegistered { system })?;

        let document_id = DocumentId::new();
        let path = self.content_store.write(&document_id, &request.content).await?;
        let content_checksum = checksum(&request.content);
        let size = request.content.len() as u64;

        let metadata = UploadMetadata::new(&request.file_name, &request.mime_type);
        let upload = provider
            .upload(&document_id.as_str(), request.content.clone(), &metadata)
            .await;

        let now = self.clock.now();
        let (external_id, sync_status, last_synced, comment) = match &upload {
            Ok(external_id) => (
                Some(external_id.clone()),
                SyncStatus::Synced,
                Some(now),
                format!("Created and synchronized with {}", system),
            ),
            Err(_) => (
                None,
                SyncStatus::Error,
                None,
                "Created (synchronization failed)".to_string(),
            ),
        };

        let document = SyncedDocument {
            id: document_id,
            name: request.file_name,
            path: path.clone(),
            mime_type: request.mime_type,
            size,
            external_id,
            external_system: Some(system),
            project_id: request.project_id,
            owner_id: request.user_id.clone(),
            sync_status,
            checksum: content_checksum.clone(),
            last_modified: now,
            last_synced,
            created_at: now,
            updated_at: now,
        };

        self.repository
            .insert_document(
                &document,
                &NewVersion {
                    path,
                    size,
                    checksum: content_checksum,
                    created_by: request.user_id.clone(),
                    comment: Some(comment),
                    created_at: now,
                },
            )
            .await?;

        match upload {
            Ok(_) => {
                self.sync_log
                    .record(
                        &document_id,
                        SyncOperation::Push,
                        LogStatus::Success,
                        "Document created and synchronized",
                        &request.user_id,
                    )
                    .await?;
                info!(document_id = %document_id, "Document created and synchronized");
                Ok(document)
            }
            Err(err) => {
                let message = err.to_string();
                self.sync_log
                    .record(
                        &document_id,
                        SyncOperation::Push,
                        LogStatus::Error,
                        message.clone(),
                        &request.user_id,
                    )
                    .await?;
                Err(SyncError::UploadFailed {
                    document_id: document_id.to_string(),
                    message,
                })
            }
        }
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub async fn get_document(&self, document_id: &DocumentId) -> Result<SyncedDocument> {
        self.load(document_id).await
    }

    /// Version chain, newest first
    pub async fn get_document_versions(&self, document_id: &DocumentId) -> Result<Vec<DocumentVersion>> {
        self.load(document_id).await?;
        self.repository.versions(document_id).await
    }

    /// Documents of a project, most recently updated first
    pub async fn get_documents_by_project(&self, project_id: i64) -> Result<Vec<SyncedDocument>> {
        self.repository.find_by_project(project_id).await
    }

    /// Audit trail of a document, oldest first
    pub async fn get_sync_log(&self, document_id: &DocumentId) -> Result<Vec<SyncLogEntry>> {
        self.load(document_id).await?;
        self.sync_log.entries(document_id).await
    }

    /// Check the version chain of a document against its checksum
    pub async fn verify_version_chain(&self, document_id: &DocumentId) -> Result<ChainReport> {
        let document = self.load(document_id).await?;
        let versions = self.repository.versions(document_id).await?;
        verify_chain(document_id, &versions, &document.checksum)
    }

    async fn load(&self, document_id: &DocumentId) -> Result<SyncedDocument> {
        self.repository
            .find_by_id(document_id)
            .await?
            .ok_or_else(|| SyncError::DocumentNotFound {
                document_id: document_id.to_string(),
            })
    }
}
