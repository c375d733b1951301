//! # Local Sync Provider
//!
//! Reference [`SyncProvider`] backed by a directory on the local filesystem.
//! The file path doubles as the external id. Used for internal storage and as
//! a stand-in for a real remote in tests.
//!
//! Remote files are named `{localDocId}-{epochMillis}`. Uploading a document
//! that already has a file here overwrites that file, so repeated uploads do
//! not create duplicates.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::{Clock, ExternalSystem, FileSystemAccess, RemoteChange, SyncProvider, UploadMetadata};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

pub struct LocalSyncProvider {
    fs: Arc<dyn FileSystemAccess>,
    remote_dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl LocalSyncProvider {
    pub fn new(
        fs: Arc<dyn FileSystemAccess>,
        remote_dir: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fs,
            remote_dir: remote_dir.into(),
            clock,
        }
    }

    pub fn remote_dir(&self) -> &Path {
        &self.remote_dir
    }

    async fn existing_file(&self, local_doc_id: &str) -> Result<Option<PathBuf>> {
        if !self.fs.exists(&self.remote_dir).await? {
            return Ok(None);
        }

        let prefix = format!("{}-", local_doc_id);
        let mut matches: Vec<PathBuf> = self
            .fs
            .list_directory(&self.remote_dir)
            .await?
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(&prefix))
            })
            .collect();

        matches.sort();
        Ok(matches.pop())
    }

    async fn new_file(&self, local_doc_id: &str) -> Result<PathBuf> {
        let mut millis = self.clock.unix_timestamp_millis();
        loop {
            let candidate = self.remote_dir.join(format!("{}-{}", local_doc_id, millis));
            if !self.fs.exists(&candidate).await? {
                return Ok(candidate);
            }
            millis += 1;
        }
    }
}

#[async_trait]
impl SyncProvider for LocalSyncProvider {
    fn system(&self) -> ExternalSystem {
        ExternalSystem::Local
    }

    #[instrument(skip(self))]
    async fn fetch(&self, external_id: &str) -> Result<Bytes> {
        self.fs
            .read_file(Path::new(external_id))
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to read file: {}", e)))
    }

    #[instrument(skip(self, content, metadata), fields(size = content.len()))]
    async fn upload(
        &self,
        local_doc_id: &str,
        content: Bytes,
        metadata: &UploadMetadata,
    ) -> Result<String> {
        self.fs.create_dir_all(&self.remote_dir).await?;

        let path = match self.existing_file(local_doc_id).await? {
            Some(path) => path,
            None => self.new_file(local_doc_id).await?,
        };

        self.fs.write_file(&path, content).await?;
        debug!(name = %metadata.name, path = ?path, "Stored document in local remote");

        Ok(path.to_string_lossy().into_owned())
    }

    async fn list_changes(&self, since: DateTime<Utc>) -> Result<Vec<RemoteChange>> {
        if !self.fs.exists(&self.remote_dir).await? {
            return Ok(Vec::new());
        }

        let since_millis = since.timestamp_millis();
        let mut changes = Vec::new();

        for path in self.fs.list_directory(&self.remote_dir).await? {
            let metadata = self.fs.metadata(&path).await?;
            if metadata.is_directory {
                continue;
            }

            let Some(modified) = metadata.modified_at else {
                continue;
            };
            if modified <= since_millis {
                continue;
            }

            let Some(last_modified) = DateTime::from_timestamp_millis(modified) else {
                continue;
            };

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let path_str = path.to_string_lossy().into_owned();

            changes.push(RemoteChange {
                external_id: path_str.clone(),
                name,
                path: Some(path_str),
                mime_type: DEFAULT_MIME_TYPE.to_string(),
                last_modified,
                size: metadata.size,
            });
        }

        changes.sort_by(|a, b| a.last_modified.cmp(&b.last_modified));
        Ok(changes)
    }
}
