use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use std::time::Duration;
use url::Url;

const MAX_RETRY_ATTEMPTS: u32 = 5;
const OPERATION_TIMEOUT_SECS: u64 = 30;

/// S3 storage implementation
///
/// Uses the default credentials chain (env vars or IAM role); a stalled
/// remote call is bounded by the operation timeout so callers on best-effort
/// paths degrade instead of hanging.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    public_host: String,
}

impl S3Storage {
    /// Create a new S3Storage instance for the given bucket and region.
    pub async fn new(bucket: String, region: String) -> StorageResult<Self> {
        let region_provider =
            RegionProviderChain::first_try(aws_config::Region::new(region.clone()));

        let retry_config = RetryConfig::standard()
            .with_max_attempts(MAX_RETRY_ATTEMPTS)
            .with_retry_mode(RetryMode::Adaptive);

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(OPERATION_TIMEOUT_SECS))
            .build();

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(retry_config)
            .timeout_config(timeout_config)
            .load()
            .await;

        let client = Client::new(&config);
        let public_host = format!("{}.s3.{}.amazonaws.com", bucket, region);

        Ok(S3Storage {
            client,
            bucket,
            public_host,
        })
    }

    /// Standard virtual-hosted URL: https://{bucket}.s3.{region}.amazonaws.com/{key}
    fn generate_url(&self, key: &str) -> String {
        format!("https://{}/{}", self.public_host, key)
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        cache_control: &str,
    ) -> StorageResult<String> {
        let size = data.len() as u64;
        let body = ByteStream::from(Bytes::from(data));
        let start = std::time::Instant::now();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .cache_control(cache_control)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        let url = self.generate_url(key);

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(url)
    }

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        let start = std::time::Instant::now();

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::ServiceError(service_err)
                    if matches!(service_err.err(), GetObjectError::NoSuchKey(_)) =>
                {
                    StorageError::NotFound(key.to_string())
                }
                _ => {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %key,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "S3 download failed"
                    );
                    StorageError::DownloadFailed(e.to_string())
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        let bytes = data.into_bytes().to_vec();

        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(bytes)
    }

    async fn delete_objects(&self, keys: &[String]) -> StorageResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        let start = std::time::Instant::now();

        let mut objects = Vec::with_capacity(keys.len());
        for key in keys {
            let object = ObjectIdentifier::builder()
                .key(key)
                .build()
                .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;
            objects.push(object);
        }

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        let response = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key_count = keys.len(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 batch delete failed"
                );
                StorageError::DeleteFailed(e.to_string())
            })?;

        for err in response.errors() {
            tracing::warn!(
                bucket = %self.bucket,
                key = err.key().unwrap_or("<unknown>"),
                code = err.code().unwrap_or("<unknown>"),
                "S3 batch delete reported a per-object error"
            );
        }

        let deleted = response.deleted().len();

        tracing::info!(
            bucket = %self.bucket,
            requested = keys.len(),
            deleted = deleted,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 batch delete successful"
        );

        Ok(deleted)
    }

    async fn signed_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presigning_config = aws_sdk_s3::presigning::PresigningConfig::builder()
            .expires_in(expires_in)
            .build()
            .map_err(|e| StorageError::SigningFailed(e.to_string()))?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| StorageError::SigningFailed(e.to_string()))?;

        Ok(presigned_request.uri().to_string())
    }

    fn url_for_key(&self, key: &str) -> String {
        self.generate_url(key)
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        // Exact host match only: never claim keys on foreign hosts.
        if parsed.host_str()? != self.public_host {
            return None;
        }

        let path = parsed.path().trim_start_matches('/');
        if path.is_empty() {
            return None;
        }

        percent_decode_str(path)
            .decode_utf8()
            .ok()
            .map(|k| k.into_owned())
    }

    fn is_durable(&self) -> bool {
        true
    }
}
