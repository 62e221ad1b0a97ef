//! File system storage backend
//!
//! Reads and writes structure definitions below a base directory.
//!
//! ## Security
//!
//! Paths containing ".." are rejected, and resolved paths of existing files
//! must stay inside the base directory.

use super::{StorageBackend, StorageError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// File system storage backend
pub struct FileSystemStorageBackend {
    base_path: PathBuf,
}

impl FileSystemStorageBackend {
    /// Create a backend rooted at `base_path`
    ///
    /// # Example
    ///
    /// ```rust
    /// use ragic_structure::storage::filesystem::FileSystemStorageBackend;
    ///
    /// let backend = FileSystemStorageBackend::new("/etc/ragic");
    /// ```
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn resolve_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(StorageError::PermissionDenied(format!(
                "'{}' leaves the base directory",
                path
            )));
        }

        let full = self.base_path.join(relative);
        if full.exists() {
            let canonical = full
                .canonicalize()
                .map_err(|e| StorageError::IoError(format!("Failed to resolve {}: {}", path, e)))?;
            let base = self
                .base_path
                .canonicalize()
                .unwrap_or_else(|_| self.base_path.clone());
            if !canonical.starts_with(&base) {
                return Err(StorageError::PermissionDenied(format!(
                    "'{}' resolves outside the base directory",
                    path
                )));
            }
            return Ok(canonical);
        }
        Ok(full)
    }
}

fn io_error(path: &str, action: &str, e: std::io::Error) -> StorageError {
    if e.kind() == ErrorKind::NotFound {
        StorageError::FileNotFound(path.to_string())
    } else {
        StorageError::IoError(format!("Failed to {} {}: {}", action, path, e))
    }
}

#[async_trait(?Send)]
impl StorageBackend for FileSystemStorageBackend {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full_path = self.resolve_path(path)?;
        debug!("Reading {}", full_path.display());
        fs::read(&full_path).await.map_err(|e| io_error(path, "read", e))
    }

    async fn write_file(&self, path: &str, content: &[u8]) -> Result<(), StorageError> {
        let full_path = self.resolve_path(path)?;
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(path, "create directory for", e))?;
        }
        fs::write(&full_path, content)
            .await
            .map_err(|e| io_error(path, "write", e))
    }

    async fn file_exists(&self, path: &str) -> Result<bool, StorageError> {
        let full_path = self.resolve_path(path)?;
        match fs::metadata(&full_path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(path, "inspect", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_path_traversal_blocked() {
        let temp = TempDir::new().unwrap();
        let backend = FileSystemStorageBackend::new(temp.path());

        assert!(matches!(
            backend.resolve_path("../etc/passwd"),
            Err(StorageError::PermissionDenied(_))
        ));
        assert!(matches!(
            backend.resolve_path("/config/../../structure.yaml"),
            Err(StorageError::PermissionDenied(_))
        ));
        assert!(backend.resolve_path("config/structure.yaml").is_ok());
        assert!(backend.resolve_path("/structure.yaml").is_ok());
    }
}
