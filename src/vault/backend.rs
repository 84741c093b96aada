//! Backend trait for filesystem operations

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use super::error::{classify_io, StoreError};

/// Abstraction over filesystem operations backing the vault
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read entire file contents
    async fn read_file(&self, path: &Path) -> Result<Bytes, StoreError>;

    /// Write file contents atomically (using temp file + rename)
    async fn write_file_atomic(&self, path: &Path, data: Bytes) -> Result<(), StoreError>;

    /// Delete a file; absent files are not an error
    async fn delete_file(&self, path: &Path) -> Result<(), StoreError>;

    /// Create directory and all parent directories
    async fn create_dir_all(&self, path: &Path) -> Result<(), StoreError>;

    /// List all files in a directory
    async fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, StoreError>;

    /// Whether a file exists
    async fn file_exists(&self, path: &Path) -> bool;
}

/// Portable filesystem backend using tokio::fs
#[derive(Debug, Default)]
pub struct TokioFsBackend;

impl TokioFsBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StorageBackend for TokioFsBackend {
    async fn read_file(&self, path: &Path) -> Result<Bytes, StoreError> {
        let data = tokio::fs::read(path).await?;
        Ok(Bytes::from(data))
    }

    async fn write_file_atomic(&self, path: &Path, data: Bytes) -> Result<(), StoreError> {
        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(classify_io)?;
        }

        // Write to temp file
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &data).await.map_err(classify_io)?;

        // Atomically rename
        tokio::fs::rename(&temp_path, path).await.map_err(classify_io)?;

        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<(), StoreError> {
        // Ignore error if file doesn't exist (idempotent)
        let _ = tokio::fs::remove_file(path).await;
        Ok(())
    }

    async fn create_dir_all(&self, path: &Path) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(path).await.map_err(classify_io)?;
        Ok(())
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, StoreError> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(path).await?;
        while let Some(entry) = dir.next_entry().await? {
            entries.push(entry.path());
        }
        Ok(entries)
    }

    async fn file_exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}
