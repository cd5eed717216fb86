//! Storage abstraction trait
//!
//! This module defines the Storage trait that both backends (S3 and the
//! in-memory staging store) implement. The resolved backend is selected once
//! at startup and injected everywhere as `Arc<dyn Storage>`, so business
//! logic never asks "is S3 configured?".

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// Keys are path-like, namespaced under the configured prefix
/// (`uploads/books/yyyy/mm/dd/<suffix>-<filename>` for originals,
/// `uploads/books/thumbs/...` for derived thumbnails). See the `keys` module.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload an object under the given key and return its public URL.
    ///
    /// The content type and cache-control directive are stored with the
    /// object and echoed on reads.
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        cache_control: &str,
    ) -> StorageResult<String>;

    /// Download an object's full body by key.
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Delete a set of objects in a single batch request.
    ///
    /// Returns the number of objects reported deleted. Deleting a key that
    /// does not exist is not an error. An empty slice short-circuits to zero
    /// without a backend call.
    async fn delete_objects(&self, keys: &[String]) -> StorageResult<usize>;

    /// Generate a time-limited signed URL granting read access to the object.
    async fn signed_url(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Canonical public URL for a key.
    fn url_for_key(&self, key: &str) -> String;

    /// Map a URL back to a bare key.
    ///
    /// Returns `Some(key)` only when the URL addresses this backend (exact
    /// host match for S3); URLs pointing elsewhere and unparseable input
    /// yield `None`. This is the ownership check the resolver and cleanup
    /// paths rely on.
    fn key_for_url(&self, url: &str) -> Option<String>;

    /// Whether objects survive process restart.
    ///
    /// False for the in-memory staging backend, an explicit dev/test mode in
    /// which uploads succeed but URLs are synthetic and non-durable.
    fn is_durable(&self) -> bool;
}
