//! Local file storage for receipts and generated salary slips.
//!
//! Stored paths are relative to the upload root (`receipts/abc.pdf`), so the
//! root can move without touching the database.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// File store abstraction for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Write `bytes` to `dir/file_name`, replacing any existing file.
    /// Returns the relative path to persist.
    async fn save(&self, dir: &str, file_name: &str, bytes: Vec<u8>) -> AppResult<String>;

    async fn read(&self, path: &str) -> AppResult<Vec<u8>>;

    /// Remove a stored file; a missing file is not an error.
    async fn remove(&self, path: &str) -> AppResult<()>;
}

/// Filesystem-backed store rooted at `UPLOAD_DIR`
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> AppResult<PathBuf> {
        let path = Path::new(relative);
        let safe = path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !safe || relative.is_empty() {
            return Err(AppError::bad_request(format!(
                "Invalid storage path '{}'",
                relative
            )));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(&self, dir: &str, file_name: &str, bytes: Vec<u8>) -> AppResult<String> {
        let relative = format!("{}/{}", dir, file_name);
        let target = self.resolve(&relative)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::internal(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        fs::write(&target, &bytes).await.map_err(|e| {
            AppError::internal(format!("Failed to write {}: {}", target.display(), e))
        })?;

        tracing::debug!(path = %relative, size = bytes.len(), "Stored file");
        Ok(relative)
    }

    async fn read(&self, path: &str) -> AppResult<Vec<u8>> {
        let target = self.resolve(path)?;
        match fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound("File")),
            Err(e) => Err(AppError::internal(format!(
                "Failed to read {}: {}",
                target.display(),
                e
            ))),
        }
    }

    async fn remove(&self, path: &str) -> AppResult<()> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => {
                tracing::debug!(path = %path, "Removed file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::internal(format!(
                "Failed to remove {}: {}",
                target.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_escaping_paths() {
        let store = LocalFileStore::new("/tmp/uploads");
        assert!(store.resolve("../etc/passwd").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert!(store.resolve("").is_err());
        assert_eq!(
            store.resolve("receipts/a.pdf").unwrap(),
            PathBuf::from("/tmp/uploads/receipts/a.pdf")
        );
    }

    #[tokio::test]
    async fn test_save_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        let path = store
            .save("receipts", "receipt-1.png", b"png-bytes".to_vec())
            .await
            .unwrap();
        assert_eq!(path, "receipts/receipt-1.png");
        assert!(dir.path().join("receipts/receipt-1.png").exists());
        assert_eq!(store.read(&path).await.unwrap(), b"png-bytes");

        store.remove(&path).await.unwrap();
        assert!(matches!(
            store.read(&path).await,
            Err(AppError::NotFound("File"))
        ));
        // Removing twice is not an error
        store.remove(&path).await.unwrap();
    }
}
