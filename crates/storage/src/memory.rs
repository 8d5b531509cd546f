//! In-process [`BlobStore`] for tests and database-less local runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{new_upload_key, BlobStore, StorageError, StoredBlob, UploadTarget};

/// URL scheme used for the locations this store hands out.
pub const MEMORY_URL_SCHEME: &str = "memory://";

/// Upload URL lifetime reported by [`MemoryBlobStore`].
const UPLOAD_URL_TTL_SECS: i64 = 900;

/// [`BlobStore`] keeping blobs in a mutex-guarded map.
///
/// Upload targets and download URLs are `memory://{key}` strings; callers
/// "upload" by calling [`BlobStore::put`] directly.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, StoredBlob>>, StorageError> {
        self.blobs
            .lock()
            .map_err(|_| StorageError::Backend("memory blob store mutex poisoned".into()))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn create_upload_target(&self) -> Result<UploadTarget, StorageError> {
        let blob_key = new_upload_key();
        Ok(UploadTarget {
            upload_url: format!("{MEMORY_URL_SCHEME}{blob_key}"),
            blob_key,
            method: "PUT",
            expires_at: chrono::Utc::now() + chrono::Duration::seconds(UPLOAD_URL_TTL_SECS),
        })
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.lock()?.contains_key(key))
    }

    async fn download_url(&self, key: &str) -> Result<String, StorageError> {
        Ok(format!("{MEMORY_URL_SCHEME}{key}"))
    }

    async fn get(&self, key: &str) -> Result<StoredBlob, StorageError> {
        self.lock()?
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.lock()?.insert(
            key.to_string(),
            StoredBlob {
                bytes,
                content_type: Some(content_type.to_string()),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::is_upload_key;

    #[tokio::test]
    async fn put_then_get_returns_bytes_and_type() {
        let store = MemoryBlobStore::new();
        store
            .put("uploads/a", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap();

        let blob = store.get("uploads/a").await.unwrap();
        assert_eq!(blob.bytes, vec![1, 2, 3]);
        assert_eq!(blob.content_type.as_deref(), Some("image/jpeg"));
        assert!(store.exists("uploads/a").await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let store = MemoryBlobStore::new();
        assert!(!store.exists("uploads/nope").await.unwrap());
        assert_matches!(
            store.get("uploads/nope").await,
            Err(StorageError::NotFound(key)) if key == "uploads/nope"
        );
    }

    #[tokio::test]
    async fn upload_target_hands_out_upload_keys() {
        let store = MemoryBlobStore::new();
        let target = store.create_upload_target().await.unwrap();
        assert!(is_upload_key(&target.blob_key));
        assert_eq!(target.upload_url, format!("memory://{}", target.blob_key));
        assert!(target.expires_at > chrono::Utc::now());
    }
}
