//! Content blob arena keyed by WAL entry id
//! Uses Apache Arrow object_store crate

use bytes::Bytes;
use object_store::{ObjectStore, path::Path as BlobPath};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Blob not found for entry: {0}")]
    NotFound(String),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Blob store result type
pub type Result<T> = std::result::Result<T, BlobError>;

/// Arena of content blobs, one per `upsert` entry, addressed by entry id.
///
/// The store owns the full blob lifecycle: blobs are created during
/// `WalStore::append` and removed during cleanup. No other component writes
/// or deletes a blob directly. The local backend stages writes in a
/// temporary file and renames it into place, so a crash never leaves a
/// partially written blob visible.
#[derive(Clone)]
pub struct BlobStore {
    store: Arc<dyn ObjectStore>,
}

impl BlobStore {
    /// Blob arena rooted at a local directory
    pub fn local(root: impl AsRef<std::path::Path>) -> Result<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        let store = object_store::local::LocalFileSystem::new_with_prefix(root)?;
        Ok(Self {
            store: Arc::new(store),
        })
    }

    /// In-memory arena for testing
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(object_store::memory::InMemory::new()),
        }
    }

    fn blob_path(id: &str) -> BlobPath {
        BlobPath::from(format!("{id}.txt"))
    }

    /// Persist the content blob for an entry
    pub async fn put(&self, id: &str, data: Vec<u8>) -> Result<()> {
        let path = Self::blob_path(id);
        let size = data.len();
        self.store.put(&path, data.into()).await?;
        tracing::debug!(id, size, "Stored content blob");
        Ok(())
    }

    /// Read the content blob for an entry
    pub async fn get(&self, id: &str) -> Result<Bytes> {
        let path = Self::blob_path(id);
        match self.store.get(&path).await {
            Ok(result) => Ok(result.bytes().await?),
            Err(object_store::Error::NotFound { .. }) => Err(BlobError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the content blob for an entry. Removing a blob that is already
    /// gone is not an error, so a cleanup pass interrupted between blob and
    /// metadata deletion can safely run again.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let path = Self::blob_path(id);
        match self.store.delete(&path).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Check whether a blob exists for an entry
    pub async fn exists(&self, id: &str) -> Result<bool> {
        let path = Self::blob_path(id);
        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let blobs = BlobStore::in_memory();
        blobs.put("entry-1", b"fn main() {}".to_vec()).await.unwrap();

        let data = blobs.get("entry-1").await.unwrap();
        assert_eq!(&data[..], b"fn main() {}");
    }

    #[tokio::test]
    async fn test_get_missing_blob() {
        let blobs = BlobStore::in_memory();
        let err = blobs.get("nope").await.unwrap_err();
        assert!(matches!(err, BlobError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let blobs = BlobStore::in_memory();
        blobs.put("entry-1", b"x".to_vec()).await.unwrap();

        blobs.delete("entry-1").await.unwrap();
        assert!(!blobs.exists("entry-1").await.unwrap());

        // Second delete of the same id must not fail
        blobs.delete("entry-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_local_backend() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let blobs = BlobStore::local(temp_dir.path().join("content")).unwrap();

        blobs.put("entry-2", b"hello".to_vec()).await.unwrap();
        assert!(blobs.exists("entry-2").await.unwrap());
        assert!(temp_dir.path().join("content").join("entry-2.txt").exists());
    }
}
