//! Storage backend abstraction
//!
//! Where structure definitions are read from and written to. The schema layer
//! never touches the file system itself; it is handed a backend.
//! - FileSystemStorageBackend: native file system rooted at a base directory

use async_trait::async_trait;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Invalid content in {path}: {reason}")]
    InvalidContent { path: String, reason: String },
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

/// Trait for storage backends holding structure definitions
#[async_trait(?Send)]
pub trait StorageBackend {
    /// Read a file from storage
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Write a file to storage, creating parent directories as needed
    async fn write_file(&self, path: &str, content: &[u8]) -> Result<(), StorageError>;

    /// Check if a file exists
    async fn file_exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Read a file as UTF-8 text
    async fn read_text(&self, path: &str) -> Result<String, StorageError> {
        let bytes = self.read_file(path).await?;
        String::from_utf8(bytes).map_err(|e| StorageError::InvalidContent {
            path: path.to_string(),
            reason: format!("invalid UTF-8: {}", e),
        })
    }
}

#[cfg(feature = "native-fs")]
pub mod filesystem;
