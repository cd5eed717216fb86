use crate::thumbs::Thumbnailer;
use bookswap_core::limits::{
    ALLOWED_CONTENT_TYPES, CACHE_CONTROL, MAX_FILE_SIZE_BYTES, MAX_UPLOAD_FILES,
};
use bookswap_core::{AppError, ImageRef};
use bookswap_storage::{keys, Storage};
use chrono::Utc;
use std::sync::Arc;

/// One file in an upload batch.
#[derive(Clone, Debug)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A stored original and its optional thumbnail, both as backend URLs.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredImage {
    pub original: String,
    pub thumb: Option<String>,
}

impl From<StoredImage> for ImageRef {
    fn from(stored: StoredImage) -> Self {
        ImageRef::Entry {
            original: stored.original,
            thumb: stored.thumb,
        }
    }
}

/// Validates and stores batches of uploaded book-cover images.
#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn Storage>,
    thumbnailer: Thumbnailer,
    prefix: String,
}

impl UploadService {
    pub fn new(storage: Arc<dyn Storage>, prefix: String) -> Self {
        let thumbnailer = Thumbnailer::new(storage.clone(), prefix.clone());
        Self {
            storage,
            thumbnailer,
            prefix,
        }
    }

    /// Store a batch of uploaded images, preserving input order.
    ///
    /// The whole batch is validated before the first write. Originals are
    /// uploaded concurrently; a failed original upload propagates, while
    /// thumbnail derivation is best-effort per file.
    #[tracing::instrument(skip(self, files), fields(file_count = files.len()))]
    pub async fn ingest(&self, files: Vec<UploadFile>) -> Result<Vec<StoredImage>, AppError> {
        validate_batch(&files)?;

        let start = std::time::Instant::now();
        let now = Utc::now();

        let stored = futures::future::try_join_all(files.into_iter().map(|file| {
            let key = keys::object_key(&self.prefix, &file.filename, now);
            let storage = self.storage.clone();
            let thumbnailer = self.thumbnailer.clone();

            async move {
                let url = storage
                    .upload(&key, file.data.clone(), &file.content_type, CACHE_CONTROL)
                    .await
                    .map_err(|e| AppError::Storage(e.to_string()))?;

                let thumb = thumbnailer.derive_from_bytes(&key, &file.data).await;

                Ok::<StoredImage, AppError>(StoredImage {
                    original: url,
                    thumb,
                })
            }
        }))
        .await?;

        tracing::info!(
            files = stored.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload batch stored"
        );

        Ok(stored)
    }
}

fn validate_batch(files: &[UploadFile]) -> Result<(), AppError> {
    if files.is_empty() {
        return Err(AppError::InvalidInput("No files provided".to_string()));
    }

    if files.len() > MAX_UPLOAD_FILES {
        return Err(AppError::InvalidInput(format!(
            "Too many files: received {}, maximum is {}",
            files.len(),
            MAX_UPLOAD_FILES
        )));
    }

    for file in files {
        validate_content_type(&file.content_type)?;
        validate_file_size(file)?;
    }

    Ok(())
}

/// Normalize MIME type by stripping parameters (e.g. "image/jpeg; charset=utf-8" -> "image/jpeg").
fn normalize_mime_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
}

/// Validate content type against allowlist. Compares normalized MIME type only (no parameter bypass).
fn validate_content_type(content_type: &str) -> Result<(), AppError> {
    let normalized = normalize_mime_type(content_type).to_lowercase();
    if !ALLOWED_CONTENT_TYPES.iter().any(|ct| normalized == *ct) {
        return Err(AppError::InvalidInput(format!(
            "Invalid content type '{}'. Allowed types: {}",
            content_type,
            ALLOWED_CONTENT_TYPES.join(", ")
        )));
    }
    Ok(())
}

fn validate_file_size(file: &UploadFile) -> Result<(), AppError> {
    if file.data.len() > MAX_FILE_SIZE_BYTES {
        return Err(AppError::PayloadTooLarge(format!(
            "File '{}' is {} bytes, exceeds maximum allowed size of {} MB",
            file.filename,
            file.data.len(),
            MAX_FILE_SIZE_BYTES / 1024 / 1024
        )));
    }
    Ok(())
}
