//! # Local Content Store
//!
//! Raw document bytes live in one flat directory, one file per committed
//! version, named `{documentId}-{epochMillis}`. Files are never rewritten in
//! place: a new version always gets a new name, so the file a document row
//! points at stays valid until the row is moved to a newer one.

use crate::models::DocumentId;
use crate::{Result, SyncError};
use bridge_traits::{Clock, FileSystemAccess};
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument};

/// SHA-256 of `data` as a lower-case hex string.
///
/// ```
/// use core_docsync::content_store::checksum;
///
/// assert_eq!(
///     checksum(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
pub fn checksum(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Flat-directory store for document content
pub struct LocalContentStore {
    fs: Arc<dyn FileSystemAccess>,
    root: PathBuf,
    clock: Arc<dyn Clock>,
}

impl LocalContentStore {
    pub fn new(fs: Arc<dyn FileSystemAccess>, root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            fs,
            root: root.into(),
            clock,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `content` as a new file for `document_id` and return its path.
    ///
    /// If a file for the current millisecond already exists the suffix is
    /// bumped until a free name is found.
    #[instrument(skip(self, content), fields(size = content.len()))]
    pub async fn write(&self, document_id: &DocumentId, content: &Bytes) -> Result<PathBuf> {
        self.fs
            .create_dir_all(&self.root)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?;

        let mut millis = self.clock.unix_timestamp_millis();
        let path = loop {
            let candidate = self.root.join(format!("{}-{}", document_id, millis));
            let taken = self
                .fs
                .exists(&candidate)
                .await
                .map_err(|e| SyncError::Storage(e.to_string()))?;
            if !taken {
                break candidate;
            }
            millis += 1;
        };

        self.fs
            .write_file(&path, content.clone())
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?;

        debug!(path = ?path, "Stored document content");
        Ok(path)
    }

    /// Read the content stored at `path`
    pub async fn read(&self, path: &Path) -> Result<Bytes> {
        self.fs
            .read_file(path)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))
    }

    /// Delete the oldest files of `document_id` beyond the newest `keep_last`.
    ///
    /// `keep` is never deleted, whatever its age. Returns the number of files
    /// removed.
    pub async fn prune(&self, document_id: &DocumentId, keep: &Path, keep_last: usize) -> Result<usize> {
        let files = self.files_for(document_id).await?;

        let mut removed = 0;
        for (_, path) in files.into_iter().skip(keep_last.max(1)) {
            if path == keep {
                continue;
            }
            self.fs
                .delete_file(&path)
                .await
                .map_err(|e| SyncError::Storage(e.to_string()))?;
            removed += 1;
        }

        if removed > 0 {
            debug!(document_id = %document_id, removed, "Pruned superseded content files");
        }
        Ok(removed)
    }

    /// Files stored for `document_id`, newest first
    pub async fn files_for(&self, document_id: &DocumentId) -> Result<Vec<(i64, PathBuf)>> {
        let exists = self
            .fs
            .exists(&self.root)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?;
        if !exists {
            return Ok(Vec::new());
        }

        let entries = self
            .fs
            .list_directory(&self.root)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?;

        let prefix = format!("{}-", document_id);
        let mut files: Vec<(i64, PathBuf)> = entries
            .into_iter()
            .filter_map(|path| {
                let millis = path
                    .file_name()?
                    .to_str()?
                    .strip_prefix(&prefix)?
                    .parse::<i64>()
                    .ok()?;
                Some((millis, path))
            })
            .collect();

        files.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(files)
    }
}
