//! Integration tests for the document sync workflow
//!
//! These tests drive `DocumentSyncService` against a real SQLite database and
//! a temporary content directory:
//! - Push success and push failure with later recovery
//! - Pulls with unchanged and changed remote content
//! - Gapless version numbers under concurrent pulls
//! - Sync log completeness for every attempt
//! - Retention of superseded content files
//! - The local directory provider end to end

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{Clock, ExternalSystem, RemoteChange, SyncProvider, UploadMetadata};
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use core_docsync::db::{create_pool, DatabaseConfig};
use core_docsync::models::NewVersion;
use core_docsync::{
    checksum, DocumentId, DocumentRepository, DocumentSyncService, LocalContentStore,
    LocalSyncProvider, LogStatus, SqliteDocumentRepository, SyncError, SyncOperation,
    SyncStatus, SyncedDocument, UploadRequest,
};
use core_runtime::config::RetentionPolicy;
use futures::future::join_all;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::Mutex as AsyncMutex;

// ============================================================================
// Test Doubles
// ============================================================================

/// Clock that only moves when told to
struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    fn new() -> Self {
        Self {
            now: Mutex::new(DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()),
        }
    }

    fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Remote system whose content and failures are scripted by the test
struct ScriptedProvider {
    system: ExternalSystem,
    remote: AsyncMutex<HashMap<String, Bytes>>,
    failing_uploads: AtomicUsize,
    failing_fetch: AtomicBool,
    rotating: AtomicBool,
    fetches: AtomicUsize,
    uploads: AtomicUsize,
}

impl ScriptedProvider {
    fn new(system: ExternalSystem) -> Self {
        Self {
            system,
            remote: AsyncMutex::new(HashMap::new()),
            failing_uploads: AtomicUsize::new(0),
            failing_fetch: AtomicBool::new(false),
            rotating: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
            uploads: AtomicUsize::new(0),
        }
    }

    async fn set_remote(&self, external_id: &str, content: &'static [u8]) {
        self.remote
            .lock()
            .await
            .insert(external_id.to_string(), Bytes::from_static(content));
    }

    fn fail_next_uploads(&self, count: usize) {
        self.failing_uploads.store(count, Ordering::SeqCst);
    }

    fn fail_fetch(&self, fail: bool) {
        self.failing_fetch.store(fail, Ordering::SeqCst);
    }

    /// Make every fetch return content never seen before
    fn rotate_content(&self) {
        self.rotating.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SyncProvider for ScriptedProvider {
    fn system(&self) -> ExternalSystem {
        self.system
    }

    async fn fetch(&self, external_id: &str) -> BridgeResult<Bytes> {
        let call = self.fetches.fetch_add(1, Ordering::SeqCst);

        if self.failing_fetch.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed(format!(
                "Remote file {} is not readable",
                external_id
            )));
        }

        if self.rotating.load(Ordering::SeqCst) {
            return Ok(Bytes::from(format!("revision {}", call)));
        }

        self.remote
            .lock()
            .await
            .get(external_id)
            .cloned()
            .ok_or_else(|| BridgeError::OperationFailed(format!("Unknown file {}", external_id)))
    }

    async fn upload(
        &self,
        local_doc_id: &str,
        content: Bytes,
        _metadata: &UploadMetadata,
    ) -> BridgeResult<String> {
        self.uploads.fetch_add(1, Ordering::SeqCst);

        let remaining = self.failing_uploads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_uploads.store(remaining - 1, Ordering::SeqCst);
            return Err(BridgeError::OperationFailed("Remote storage unavailable".to_string()));
        }

        let external_id = format!("remote-{}", local_doc_id);
        self.remote.lock().await.insert(external_id.clone(), content);
        Ok(external_id)
    }

    async fn list_changes(&self, _since: DateTime<Utc>) -> BridgeResult<Vec<RemoteChange>> {
        Ok(Vec::new())
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    service: Arc<DocumentSyncService>,
    provider: Arc<ScriptedProvider>,
    repository: Arc<SqliteDocumentRepository>,
    pool: SqlitePool,
    clock: Arc<ManualClock>,
    temp: TempDir,
}

impl Harness {
    async fn new() -> Self {
        Self::with_retention(RetentionPolicy::KeepAll).await
    }

    async fn with_retention(retention: RetentionPolicy) -> Self {
        let temp = tempfile::tempdir().unwrap();
        let pool = create_pool(DatabaseConfig::new(temp.path().join("docsync.db")))
            .await
            .unwrap();
        let clock = Arc::new(ManualClock::new());
        let repository = Arc::new(SqliteDocumentRepository::new(pool.clone()));

        let store = LocalContentStore::new(
            Arc::new(TokioFileSystem::new()),
            temp.path().join("documents"),
            clock.clone(),
        );
        let service = DocumentSyncService::new(repository.clone(), store, clock.clone())
            .with_retention(retention);

        let provider = Arc::new(ScriptedProvider::new(ExternalSystem::GoogleDrive));
        service.register_provider(provider.clone());

        Self {
            service: Arc::new(service),
            provider,
            repository,
            pool,
            clock,
            temp,
        }
    }

    async fn push(&self, content: &'static [u8]) -> SyncedDocument {
        self.service
            .upload_and_sync(invoice(content, ExternalSystem::GoogleDrive))
            .await
            .unwrap()
    }

    async fn log_rows(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM sync_logs")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    fn documents_dir(&self) -> PathBuf {
        self.temp.path().join("documents")
    }
}

fn invoice(content: &'static [u8], system: ExternalSystem) -> UploadRequest {
    UploadRequest::new(
        Bytes::from_static(content),
        "invoice.pdf",
        "application/pdf",
        42,
        "alice",
        system,
    )
}

/// Insert a document directly, bypassing the push path
async fn insert_unsynced(harness: &Harness, system: Option<ExternalSystem>) -> SyncedDocument {
    let now = harness.clock.now();
    let document = SyncedDocument {
        id: DocumentId::new(),
        name: "notes.txt".to_string(),
        path: harness.documents_dir().join("notes"),
        mime_type: "text/plain".to_string(),
        size: 5,
        external_id: None,
        external_system: system,
        project_id: 42,
        owner_id: "alice".to_string(),
        sync_status: SyncStatus::Error,
        checksum: checksum(b"notes"),
        last_modified: now,
        last_synced: None,
        created_at: now,
        updated_at: now,
    };
    harness
        .repository
        .insert_document(
            &document,
            &NewVersion {
                path: document.path.clone(),
                size: 5,
                checksum: document.checksum.clone(),
                created_by: "alice".to_string(),
                comment: None,
                created_at: now,
            },
        )
        .await
        .unwrap();
    document
}

// ============================================================================
// Push
// ============================================================================

#[tokio::test]
async fn test_push_success_creates_first_version() {
    let harness = Harness::new().await;
    let content: &'static [u8] = &[7u8; 1024];

    let document = harness.push(content).await;

    assert_eq!(document.sync_status, SyncStatus::Synced);
    assert_eq!(document.checksum, checksum(content));
    assert_eq!(document.size, 1024);
    assert_eq!(document.external_system, Some(ExternalSystem::GoogleDrive));
    assert_eq!(document.last_synced, Some(harness.clock.now()));
    assert_eq!(document.owner_id, "alice");
    assert_eq!(std::fs::read(&document.path).unwrap(), content);

    let versions = harness.service.get_document_versions(&document.id).await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].version_number, 1);
    assert_eq!(versions[0].checksum, checksum(content));
    assert_eq!(versions[0].created_by, "alice");

    let log = harness.service.get_sync_log(&document.id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].operation, SyncOperation::Push);
    assert_eq!(log[0].status, LogStatus::Success);
}

#[tokio::test]
async fn test_push_failure_then_pull_recovers() {
    let harness = Harness::new().await;
    harness.provider.fail_next_uploads(1);

    let err = harness
        .service
        .upload_and_sync(invoice(b"draft", ExternalSystem::GoogleDrive))
        .await
        .unwrap_err();
    let SyncError::UploadFailed { document_id, message } = err else {
        panic!("expected UploadFailed");
    };
    assert!(message.contains("Remote storage unavailable"));
    let document_id = DocumentId::from_string(&document_id).unwrap();

    let stored = harness.service.get_document(&document_id).await.unwrap();
    assert_eq!(stored.sync_status, SyncStatus::Error);
    assert!(stored.external_id.is_none());
    assert!(stored.last_synced.is_none());
    assert_eq!(
        harness.service.get_document_versions(&document_id).await.unwrap().len(),
        1
    );

    harness.clock.advance(Duration::seconds(30));
    let outcome = harness.service.sync_document(&document_id, "bob").await.unwrap();

    assert!(!outcome.changed());
    assert_eq!(outcome.document.sync_status, SyncStatus::Synced);
    assert_eq!(
        outcome.document.external_id.as_deref(),
        Some(format!("remote-{}", document_id).as_str())
    );
    assert_eq!(harness.provider.uploads.load(Ordering::SeqCst), 2);

    let log = harness.service.get_sync_log(&document_id).await.unwrap();
    let entries: Vec<_> = log.iter().map(|e| (e.operation, e.status)).collect();
    assert_eq!(
        entries,
        vec![
            (SyncOperation::Push, LogStatus::Error),
            (SyncOperation::Pull, LogStatus::Success),
        ]
    );
}

#[tokio::test]
async fn test_push_to_unregistered_system_stores_nothing() {
    let harness = Harness::new().await;

    let err = harness
        .service
        .upload_and_sync(invoice(b"data", ExternalSystem::OneDrive))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::ProviderNotRegistered { .. }));
    assert!(harness.service.get_documents_by_project(42).await.unwrap().is_empty());
    assert_eq!(harness.log_rows().await, 0);
    assert!(!harness.documents_dir().exists());
}

// ============================================================================
// Pull
// ============================================================================

#[tokio::test]
async fn test_pull_unchanged_content() {
    let harness = Harness::new().await;
    let document = harness.push(b"same bytes").await;

    harness.clock.advance(Duration::minutes(5));
    let outcome = harness.service.sync_document(&document.id, "alice").await.unwrap();

    assert_eq!(outcome.new_version, None);
    assert_eq!(outcome.document.checksum, document.checksum);
    assert_eq!(outcome.document.last_synced, Some(harness.clock.now()));
    assert_eq!(outcome.document.last_modified, document.last_modified);

    let versions = harness.service.get_document_versions(&document.id).await.unwrap();
    assert_eq!(versions.len(), 1);

    let log = harness.service.get_sync_log(&document.id).await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].operation, SyncOperation::Pull);
    assert_eq!(log[1].status, LogStatus::Success);
    assert_eq!(log[1].message, "Document is already up to date");
}

#[tokio::test]
async fn test_pull_changed_content_appends_version() {
    let harness = Harness::new().await;
    let document = harness.push(b"first draft").await;
    let external_id = document.external_id.clone().unwrap();

    harness.provider.set_remote(&external_id, b"second draft").await;
    harness.clock.advance(Duration::minutes(5));

    let outcome = harness.service.sync_document(&document.id, "bob").await.unwrap();

    assert_eq!(outcome.new_version, Some(2));
    assert_eq!(outcome.document.checksum, checksum(b"second draft"));
    assert_eq!(outcome.document.size, 12);
    assert!(outcome.document.last_synced > document.last_synced);
    assert_ne!(outcome.document.path, document.path);
    assert_eq!(std::fs::read(&outcome.document.path).unwrap(), b"second draft");
    // Superseded content is kept by default.
    assert!(document.path.exists());

    let versions = harness.service.get_document_versions(&document.id).await.unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].version_number, 2);
    assert_eq!(versions[0].checksum, checksum(b"second draft"));
    assert_eq!(versions[0].created_by, "bob");
    assert_eq!(versions[0].comment.as_deref(), Some("Synchronized from google_drive"));
    assert_eq!(versions[1].version_number, 1);

    let log = harness.service.get_sync_log(&document.id).await.unwrap();
    assert_eq!(log[1].message, "Document synchronized (version 2)");

    let report = harness.service.verify_version_chain(&document.id).await.unwrap();
    assert_eq!(report.length, 2);
}

#[tokio::test]
async fn test_repeated_pull_is_idempotent() {
    let harness = Harness::new().await;
    let document = harness.push(b"first").await;
    harness
        .provider
        .set_remote(document.external_id.as_deref().unwrap(), b"second")
        .await;

    let first = harness.service.sync_document(&document.id, "alice").await.unwrap();
    let second = harness.service.sync_document(&document.id, "alice").await.unwrap();

    assert_eq!(first.new_version, Some(2));
    assert_eq!(second.new_version, None);
    assert_eq!(
        harness.service.get_document_versions(&document.id).await.unwrap().len(),
        2
    );
    assert_eq!(harness.service.get_sync_log(&document.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_pull_failure_marks_error_and_keeps_content() {
    let harness = Harness::new().await;
    let document = harness.push(b"stable").await;

    harness.provider.fail_fetch(true);
    let err = harness.service.sync_document(&document.id, "alice").await.unwrap_err();
    assert!(matches!(err, SyncError::Provider(_)));

    let stored = harness.service.get_document(&document.id).await.unwrap();
    assert_eq!(stored.sync_status, SyncStatus::Error);
    assert_eq!(stored.checksum, document.checksum);
    assert_eq!(stored.path, document.path);

    let log = harness.service.get_sync_log(&document.id).await.unwrap();
    assert_eq!(log[1].status, LogStatus::Error);
    assert!(log[1].message.contains("is not readable"));

    harness.provider.fail_fetch(false);
    let outcome = harness.service.sync_document(&document.id, "alice").await.unwrap();
    assert_eq!(outcome.document.sync_status, SyncStatus::Synced);
}

#[tokio::test]
async fn test_pull_unknown_document_writes_no_log() {
    let harness = Harness::new().await;

    let err = harness
        .service
        .sync_document(&DocumentId::new(), "alice")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(harness.log_rows().await, 0);
}

#[tokio::test]
async fn test_pull_without_registered_provider_is_logged() {
    let harness = Harness::new().await;
    let document = insert_unsynced(&harness, Some(ExternalSystem::OneDrive)).await;

    let err = harness.service.sync_document(&document.id, "alice").await.unwrap_err();

    assert!(matches!(
        err,
        SyncError::ProviderNotRegistered {
            system: ExternalSystem::OneDrive
        }
    ));
    let log = harness.service.get_sync_log(&document.id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].operation, SyncOperation::Pull);
    assert_eq!(log[0].status, LogStatus::Error);
    assert!(log[0].message.contains("onedrive"));
}

#[tokio::test]
async fn test_pull_without_external_system_is_logged() {
    let harness = Harness::new().await;
    let document = insert_unsynced(&harness, None).await;

    let err = harness.service.sync_document(&document.id, "alice").await.unwrap_err();

    assert!(matches!(err, SyncError::NoExternalSystem { .. }));
    let log = harness.service.get_sync_log(&document.id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].status, LogStatus::Error);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pulls_keep_versions_gapless() {
    let harness = Harness::new().await;
    let document = harness.push(b"origin").await;
    harness.provider.rotate_content();

    let pulls = (0..8).map(|_| {
        let service = Arc::clone(&harness.service);
        let id = document.id;
        tokio::spawn(async move { service.sync_document(&id, "alice").await })
    });

    for result in join_all(pulls).await {
        assert!(result.unwrap().unwrap().changed());
    }

    let mut numbers: Vec<u32> = harness
        .service
        .get_document_versions(&document.id)
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.version_number)
        .collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=9).collect::<Vec<_>>());

    let report = harness.service.verify_version_chain(&document.id).await.unwrap();
    assert_eq!(report.length, 9);

    // One push plus one entry per pull.
    assert_eq!(harness.service.get_sync_log(&document.id).await.unwrap().len(), 9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unrelated_documents_sync_in_parallel() {
    let harness = Harness::new().await;
    let first = harness.push(b"one").await;
    let second = harness.push(b"two").await;
    harness.provider.rotate_content();

    let (a, b) = tokio::join!(
        harness.service.sync_document(&first.id, "alice"),
        harness.service.sync_document(&second.id, "alice"),
    );

    assert_eq!(a.unwrap().new_version, Some(2));
    assert_eq!(b.unwrap().new_version, Some(2));
}

// ============================================================================
// Queries and retention
// ============================================================================

#[tokio::test]
async fn test_documents_by_project_most_recent_first() {
    let harness = Harness::new().await;
    let older = harness.push(b"older").await;
    harness.clock.advance(Duration::seconds(1));
    let newer = harness.push(b"newer").await;

    let listed = harness.service.get_documents_by_project(42).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);

    harness
        .provider
        .set_remote(older.external_id.as_deref().unwrap(), b"older, edited")
        .await;
    harness.clock.advance(Duration::seconds(1));
    harness.service.sync_document(&older.id, "alice").await.unwrap();

    let listed = harness.service.get_documents_by_project(42).await.unwrap();
    assert_eq!(listed[0].id, older.id);
    assert!(harness.service.get_documents_by_project(7).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_keep_last_retention_prunes_old_files() {
    let harness = Harness::with_retention(RetentionPolicy::KeepLast(2)).await;
    let document = harness.push(b"v1").await;
    harness.provider.rotate_content();

    for _ in 0..3 {
        harness.clock.advance(Duration::seconds(1));
        harness.service.sync_document(&document.id, "alice").await.unwrap();
    }
    let latest = harness.service.get_document(&document.id).await.unwrap();

    let files: Vec<_> = std::fs::read_dir(harness.documents_dir())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(files.len(), 2);
    assert!(latest.path.exists());
    assert!(!document.path.exists());

    // Version history is unaffected by file retention.
    assert_eq!(
        harness.service.get_document_versions(&document.id).await.unwrap().len(),
        4
    );
}

// ============================================================================
// Local provider
// ============================================================================

#[tokio::test]
async fn test_local_provider_round_trip() {
    let harness = Harness::new().await;
    let remote_dir = harness.temp.path().join("local-remote");
    harness.service.register_provider(Arc::new(LocalSyncProvider::new(
        Arc::new(TokioFileSystem::new()),
        remote_dir.clone(),
        harness.clock.clone(),
    )));

    let document = harness
        .service
        .upload_and_sync(invoice(b"local v1", ExternalSystem::Local))
        .await
        .unwrap();
    let external_path = PathBuf::from(document.external_id.clone().unwrap());
    assert!(external_path.starts_with(&remote_dir));
    assert_eq!(std::fs::read(&external_path).unwrap(), b"local v1");

    std::fs::write(&external_path, b"local v2").unwrap();
    harness.clock.advance(Duration::seconds(1));

    let outcome = harness.service.sync_document(&document.id, "alice").await.unwrap();
    assert_eq!(outcome.new_version, Some(2));
    assert_eq!(outcome.document.checksum, checksum(b"local v2"));
    assert_eq!(
        outcome.document.external_id.as_deref(),
        document.external_id.as_deref()
    );
}
