use crate::memory::MemoryStorage;
use crate::s3::S3Storage;
use crate::traits::{Storage, StorageError, StorageResult};
use bookswap_core::StorageConfig;
use std::sync::Arc;

/// Select a storage backend from configuration.
///
/// S3 when both `AWS_REGION` and `S3_BUCKET` are set; otherwise the
/// in-memory staging backend, with a warning naming what is missing.
pub async fn select_storage(config: &StorageConfig) -> StorageResult<Arc<dyn Storage>> {
    config
        .validate()
        .map_err(|e| StorageError::ConfigError(e.to_string()))?;

    if config.is_s3_configured() {
        let bucket = config
            .bucket
            .clone()
            .ok_or_else(|| StorageError::ConfigError("S3_BUCKET is not set".to_string()))?;
        let region = config
            .region
            .clone()
            .ok_or_else(|| StorageError::ConfigError("AWS_REGION is not set".to_string()))?;

        tracing::info!(
            backend = "s3",
            region = %region,
            bucket = %bucket,
            prefix = %config.prefix,
            signed_urls = config.signed_urls,
            "Storage backend selected"
        );

        let storage = S3Storage::new(bucket, region).await?;
        Ok(Arc::new(storage))
    } else {
        tracing::warn!(
            backend = "memory",
            missing = ?config.missing_vars(),
            "S3 is not configured, falling back to in-memory staging storage"
        );

        Ok(Arc::new(MemoryStorage::new()))
    }
}
