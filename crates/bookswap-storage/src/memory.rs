use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const MEMORY_URL_SCHEME: &str = "memory://";

#[derive(Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    cache_control: String,
}

/// In-memory staging backend, selected when S3 is not configured.
///
/// Objects live in a process-local map and URLs use a synthetic
/// `memory://` scheme, so nothing here survives a restart. Useful for
/// development and tests where real object storage is unavailable.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently held.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Content type recorded at upload time, if the key exists.
    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.content_type.clone())
    }

    /// Cache-control header recorded at upload time, if the key exists.
    pub async fn cache_control(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.cache_control.clone())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        cache_control: &str,
    ) -> StorageResult<String> {
        let size = data.len();
        let object = StoredObject {
            data: Bytes::from(data),
            content_type: content_type.to_string(),
            cache_control: cache_control.to_string(),
        };

        self.objects.write().await.insert(key.to_string(), object);

        tracing::debug!(key = %key, size_bytes = size, "Memory upload successful");

        Ok(self.url_for_key(key))
    }

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.data.to_vec())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete_objects(&self, keys: &[String]) -> StorageResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut objects = self.objects.write().await;
        for key in keys {
            objects.remove(key);
        }

        // Deleting absent keys is not an error, mirroring S3 batch delete.
        Ok(keys.len())
    }

    async fn signed_url(&self, key: &str, _expires_in: Duration) -> StorageResult<String> {
        Ok(self.url_for_key(key))
    }

    fn url_for_key(&self, key: &str) -> String {
        format!("{}{}", MEMORY_URL_SCHEME, key)
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        let key = url.strip_prefix(MEMORY_URL_SCHEME)?;
        if key.is_empty() {
            return None;
        }
        Some(key.to_string())
    }

    fn is_durable(&self) -> bool {
        false
    }
}
