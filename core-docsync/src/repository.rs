//! # Document Repository
//!
//! Persistence for synced documents, their version chain and the sync log.
//!
//! ## Overview
//!
//! Multi-row changes run in a single transaction so a reader never sees a
//! document whose checksum disagrees with its head version:
//! - [`insert_document`](DocumentRepository::insert_document) writes the
//!   document and version 1 together
//! - [`append_version`](DocumentRepository::append_version) assigns
//!   `max + 1`, inserts the version and updates the document together
//!
//! `UNIQUE(document_id, version_number)` backs the numbering; a duplicate
//! surfaces as [`SyncError::VersionConflict`].

use crate::models::{
    from_millis, DocumentId, DocumentVersion, NewSyncLogEntry, NewVersion, SyncLogEntry,
    SyncedDocument,
};
use crate::{Result, SyncError};
use async_trait::async_trait;
use bridge_traits::ExternalSystem;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use std::path::PathBuf;

// ============================================================================
// Repository Trait
// ============================================================================

/// Repository trait for document sync persistence
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Find a document by ID
    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<SyncedDocument>>;

    /// All documents of a project, most recently updated first
    async fn find_by_project(&self, project_id: i64) -> Result<Vec<SyncedDocument>>;

    /// Insert a new document together with its first version
    ///
    /// # Errors
    ///
    /// Returns an error if either insert fails; nothing is written then.
    async fn insert_document(
        &self,
        document: &SyncedDocument,
        first_version: &NewVersion,
    ) -> Result<DocumentVersion>;

    /// Commit a new version and point the document at it
    ///
    /// Assigns `max(version_number) + 1`, then updates the document's
    /// checksum, size, path, `last_modified`, `last_synced`, `updated_at` and
    /// sets its status to `synced`.
    ///
    /// # Errors
    ///
    /// - `DocumentNotFound` if the document does not exist
    /// - `VersionConflict` if the number was taken concurrently
    async fn append_version(
        &self,
        document_id: &DocumentId,
        version: &NewVersion,
    ) -> Result<DocumentVersion>;

    /// Record a successful pull that found no change
    async fn mark_synced(&self, id: &DocumentId, at: DateTime<Utc>) -> Result<()>;

    /// Record a failed synchronization attempt
    async fn mark_error(&self, id: &DocumentId, at: DateTime<Utc>) -> Result<()>;

    /// Store the remote handle returned by a (re-)upload
    async fn set_external_id(
        &self,
        id: &DocumentId,
        external_id: &str,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Version chain of a document, newest first
    async fn versions(&self, document_id: &DocumentId) -> Result<Vec<DocumentVersion>>;

    /// Append an audit record
    async fn append_log(&self, entry: &NewSyncLogEntry) -> Result<SyncLogEntry>;

    /// Audit trail of a document, oldest first
    async fn logs(&self, document_id: &DocumentId) -> Result<Vec<SyncLogEntry>>;
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of DocumentRepository
pub struct SqliteDocumentRepository {
    pool: SqlitePool,
}

impl SqliteDocumentRepository {
    /// Create a new SQLite document repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn db_error(e: sqlx::Error) -> SyncError {
    SyncError::Database(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Database row representation of a synced document
#[derive(Debug, FromRow)]
struct SyncedDocumentRow {
    id: String,
    name: String,
    path: String,
    mime_type: String,
    size: i64,
    external_id: Option<String>,
    external_system: Option<String>,
    project_id: i64,
    owner_id: String,
    sync_status: String,
    checksum: String,
    last_modified: i64,
    last_synced: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<SyncedDocumentRow> for SyncedDocument {
    type Error = SyncError;

    fn try_from(row: SyncedDocumentRow) -> Result<Self> {
        let external_system = row
            .external_system
            .map(|s| {
                ExternalSystem::parse(&s).ok_or(SyncError::InvalidExternalSystem(s))
            })
            .transpose()?;

        Ok(SyncedDocument {
            id: DocumentId::from_string(&row.id)?,
            name: row.name,
            path: PathBuf::from(row.path),
            mime_type: row.mime_type,
            size: row.size.max(0) as u64,
            external_id: row.external_id,
            external_system,
            project_id: row.project_id,
            owner_id: row.owner_id,
            sync_status: row.sync_status.parse()?,
            checksum: row.checksum,
            last_modified: from_millis(row.last_modified)?,
            last_synced: row.last_synced.map(from_millis).transpose()?,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

/// Database row representation of a document version
#[derive(Debug, FromRow)]
struct DocumentVersionRow {
    id: i64,
    document_id: String,
    version_number: i64,
    size: i64,
    checksum: String,
    created_by: String,
    comment: Option<String>,
    created_at: i64,
}

impl TryFrom<DocumentVersionRow> for DocumentVersion {
    type Error = SyncError;

    fn try_from(row: DocumentVersionRow) -> Result<Self> {
        let version_number = u32::try_from(row.version_number).map_err(|_| {
            SyncError::Database(format!("Invalid version number: {}", row.version_number))
        })?;

        Ok(DocumentVersion {
            id: row.id,
            document_id: DocumentId::from_string(&row.document_id)?,
            version_number,
            size: row.size.max(0) as u64,
            checksum: row.checksum,
            created_by: row.created_by,
            comment: row.comment,
            created_at: from_millis(row.created_at)?,
        })
    }
}

/// Database row representation of a sync log entry
#[derive(Debug, FromRow)]
struct SyncLogRow {
    id: i64,
    document_id: String,
    operation: String,
    status: String,
    message: String,
    user_id: String,
    timestamp: i64,
}

impl TryFrom<SyncLogRow> for SyncLogEntry {
    type Error = SyncError;

    fn try_from(row: SyncLogRow) -> Result<Self> {
        Ok(SyncLogEntry {
            id: row.id,
            document_id: DocumentId::from_string(&row.document_id)?,
            operation: row.operation.parse()?,
            status: row.status.parse()?,
            message: row.message,
            user_id: row.user_id,
            timestamp: from_millis(row.timestamp)?,
        })
    }
}

const DOCUMENT_COLUMNS: &str = r#"
    id, name, path, mime_type, size, external_id, external_system,
    project_id, owner_id, sync_status, checksum,
    last_modified, last_synced, created_at, updated_at
"#;

#[async_trait]
impl DocumentRepository for SqliteDocumentRepository {
    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<SyncedDocument>> {
        let sql = format!("SELECT {} FROM synced_documents WHERE id = ?", DOCUMENT_COLUMNS);
        let row = sqlx::query_as::<_, SyncedDocumentRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(SyncedDocument::try_from).transpose()
    }

    async fn find_by_project(&self, project_id: i64) -> Result<Vec<SyncedDocument>> {
        let sql = format!(
            "SELECT {} FROM synced_documents WHERE project_id = ? \
             ORDER BY updated_at DESC, created_at DESC",
            DOCUMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, SyncedDocumentRow>(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.into_iter()
            .map(SyncedDocument::try_from)
            .collect::<Result<Vec<_>>>()
    }

    async fn insert_document(
        &self,
        document: &SyncedDocument,
        first_version: &NewVersion,
    ) -> Result<DocumentVersion> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO synced_documents (
                id, name, path, mime_type, size, external_id, external_system,
                project_id, owner_id, sync_status, checksum,
                last_modified, last_synced, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(document.id.as_str())
        .bind(&document.name)
        .bind(document.path.to_string_lossy().into_owned())
        .bind(&document.mime_type)
        .bind(document.size as i64)
        .bind(&document.external_id)
        .bind(document.external_system.map(|s| s.as_str()))
        .bind(document.project_id)
        .bind(&document.owner_id)
        .bind(document.sync_status.as_str())
        .bind(&document.checksum)
        .bind(document.last_modified.timestamp_millis())
        .bind(document.last_synced.map(|t| t.timestamp_millis()))
        .bind(document.created_at.timestamp_millis())
        .bind(document.updated_at.timestamp_millis())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO document_versions (
                document_id, version_number, size, checksum, created_by, comment, created_at
            ) VALUES (?, 1, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(document.id.as_str())
        .bind(first_version.size as i64)
        .bind(&first_version.checksum)
        .bind(&first_version.created_by)
        .bind(&first_version.comment)
        .bind(first_version.created_at.timestamp_millis())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        Ok(DocumentVersion {
            id,
            document_id: document.id,
            version_number: 1,
            size: first_version.size,
            checksum: first_version.checksum.clone(),
            created_by: first_version.created_by.clone(),
            comment: first_version.comment.clone(),
            created_at: first_version.created_at,
        })
    }

    async fn append_version(
        &self,
        document_id: &DocumentId,
        version: &NewVersion,
    ) -> Result<DocumentVersion> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Writing first takes the write lock before the max is read.
        let inserted = sqlx::query_as::<_, (i64, i64)>(
            r#"
            INSERT INTO document_versions (
                document_id, version_number, size, checksum, created_by, comment, created_at
            )
            SELECT ?, COALESCE(MAX(version_number), 0) + 1, ?, ?, ?, ?, ?
            FROM document_versions
            WHERE document_id = ?
            RETURNING id, version_number
            "#,
        )
        .bind(document_id.as_str())
        .bind(version.size as i64)
        .bind(&version.checksum)
        .bind(&version.created_by)
        .bind(&version.comment)
        .bind(version.created_at.timestamp_millis())
        .bind(document_id.as_str())
        .fetch_one(&mut *tx)
        .await;

        let (id, number) = match inserted {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                let current = sqlx::query_scalar::<_, i64>(
                    "SELECT COALESCE(MAX(version_number), 0) FROM document_versions WHERE document_id = ?",
                )
                .bind(document_id.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error)?;

                return Err(SyncError::VersionConflict {
                    document_id: document_id.to_string(),
                    version_number: u32::try_from(current + 1).unwrap_or(u32::MAX),
                });
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                return Err(SyncError::DocumentNotFound {
                    document_id: document_id.to_string(),
                });
            }
            Err(e) => return Err(db_error(e)),
        };

        let updated_at = version.created_at.timestamp_millis();
        let result = sqlx::query(
            r#"
            UPDATE synced_documents SET
                checksum = ?,
                size = ?,
                path = ?,
                sync_status = 'synced',
                last_modified = ?,
                last_synced = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&version.checksum)
        .bind(version.size as i64)
        .bind(version.path.to_string_lossy().into_owned())
        .bind(updated_at)
        .bind(updated_at)
        .bind(updated_at)
        .bind(document_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(SyncError::DocumentNotFound {
                document_id: document_id.to_string(),
            });
        }

        tx.commit().await.map_err(db_error)?;

        let version_number = u32::try_from(number)
            .map_err(|_| SyncError::Database(format!("Invalid version number: {}", number)))?;

        Ok(DocumentVersion {
            id,
            document_id: *document_id,
            version_number,
            size: version.size,
            checksum: version.checksum.clone(),
            created_by: version.created_by.clone(),
            comment: version.comment.clone(),
            created_at: version.created_at,
        })
    }

    async fn mark_synced(&self, id: &DocumentId, at: DateTime<Utc>) -> Result<()> {
        let millis = at.timestamp_millis();
        let result = sqlx::query(
            r#"
            UPDATE synced_documents SET
                sync_status = 'synced',
                last_synced = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(millis)
        .bind(millis)
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(SyncError::DocumentNotFound {
                document_id: id.to_string(),
            });
        }

        Ok(())
    }

    async fn mark_error(&self, id: &DocumentId, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE synced_documents SET sync_status = 'error', updated_at = ? WHERE id = ?",
        )
        .bind(at.timestamp_millis())
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(SyncError::DocumentNotFound {
                document_id: id.to_string(),
            });
        }

        Ok(())
    }

    async fn set_external_id(
        &self,
        id: &DocumentId,
        external_id: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE synced_documents SET external_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(external_id)
        .bind(at.timestamp_millis())
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(SyncError::DocumentNotFound {
                document_id: id.to_string(),
            });
        }

        Ok(())
    }

    async fn versions(&self, document_id: &DocumentId) -> Result<Vec<DocumentVersion>> {
        let rows = sqlx::query_as::<_, DocumentVersionRow>(
            r#"
            SELECT id, document_id, version_number, size, checksum,
                   created_by, comment, created_at
            FROM document_versions
            WHERE document_id = ?
            ORDER BY version_number DESC
            "#,
        )
        .bind(document_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(DocumentVersion::try_from)
            .collect::<Result<Vec<_>>>()
    }

    async fn append_log(&self, entry: &NewSyncLogEntry) -> Result<SyncLogEntry> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO sync_logs (document_id, operation, status, message, user_id, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(entry.document_id.as_str())
        .bind(entry.operation.as_str())
        .bind(entry.status.as_str())
        .bind(&entry.message)
        .bind(&entry.user_id)
        .bind(entry.timestamp.timestamp_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(SyncLogEntry {
            id,
            document_id: entry.document_id,
            operation: entry.operation,
            status: entry.status,
            message: entry.message.clone(),
            user_id: entry.user_id.clone(),
            timestamp: entry.timestamp,
        })
    }

    async fn logs(&self, document_id: &DocumentId) -> Result<Vec<SyncLogEntry>> {
        let rows = sqlx::query_as::<_, SyncLogRow>(
            r#"
            SELECT id, document_id, operation, status, message, user_id, timestamp
            FROM sync_logs
            WHERE document_id = ?
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(document_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(SyncLogEntry::try_from)
            .collect::<Result<Vec<_>>>()
    }
}

// ============================================================================
// Tests
// ============================================================================
