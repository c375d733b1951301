//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{FileMetadata, FileSystemAccess},
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Tokio-based file system implementation
///
/// Writes go through an explicit `sync_all` so a successful `write_file`
/// means the bytes are on disk, not just in the page cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    pub fn new() -> Self {
        Self
    }

    fn map_io_error(path: &Path, e: std::io::Error) -> BridgeError {
        BridgeError::OperationFailed(format!("{}: {}", path.display(), e))
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;

        Ok(FileMetadata {
            size: metadata.len(),
            modified_at: metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64),
            is_directory: metadata.is_dir(),
        })
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;
        debug!(path = ?path, "Created directory");
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;
        debug!(path = ?path, size = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;
        file.write_all(data.as_ref())
            .await
            .map_err(|e| Self::map_io_error(path, e))?;
        file.sync_all()
            .await
            .map_err(|e| Self::map_io_error(path, e))?;

        debug!(path = ?path, size = data.len(), "Wrote file");
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;
        debug!(path = ?path, "Deleted file");
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| Self::map_io_error(path, e))?
        {
            entries.push(entry.path());
        }

        debug!(path = ?path, count = entries.len(), "Listed directory");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read() {
        let temp = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let test_file = temp.path().join("nested").join("test-file.txt");

        let data = Bytes::from("Hello, World!");
        fs.write_file(&test_file, data.clone()).await.unwrap();

        let read_data = fs.read_file(&test_file).await.unwrap();
        assert_eq!(data, read_data);

        let metadata = fs.metadata(&test_file).await.unwrap();
        assert_eq!(metadata.size, 13);
        assert!(!metadata.is_directory);
        assert!(metadata.modified_at.is_some());

        fs.delete_file(&test_file).await.unwrap();
        assert!(!fs.exists(&test_file).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_directory() {
        let temp = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();

        fs.write_file(&temp.path().join("a"), Bytes::from_static(b"1"))
            .await
            .unwrap();
        fs.write_file(&temp.path().join("b"), Bytes::from_static(b"2"))
            .await
            .unwrap();

        let mut entries = fs.list_directory(temp.path()).await.unwrap();
        entries.sort();
        assert_eq!(entries, vec![temp.path().join("a"), temp.path().join("b")]);
    }

    #[tokio::test]
    async fn test_read_missing_file_reports_path() {
        let temp = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let missing = temp.path().join("missing.bin");

        let err = fs.read_file(&missing).await.unwrap_err();
        assert!(err.to_string().contains("missing.bin"));
    }
}
