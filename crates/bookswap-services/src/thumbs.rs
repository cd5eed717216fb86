use bookswap_core::limits::CACHE_CONTROL;
use bookswap_processing::render_thumbnail;
use bookswap_storage::{keys, Storage};
use std::sync::Arc;

const THUMB_CONTENT_TYPE: &str = "image/webp";

/// Derives and stores square WebP thumbnails next to their originals.
///
/// Derivation is best-effort: every failure is logged with the offending
/// key and reported as absence, so neither an ingest nor a migration ever
/// fails over a thumbnail.
#[derive(Clone)]
pub struct Thumbnailer {
    storage: Arc<dyn Storage>,
    prefix: String,
}

impl Thumbnailer {
    pub fn new(storage: Arc<dyn Storage>, prefix: String) -> Self {
        Self { storage, prefix }
    }

    /// The thumbnail key an original key maps to. Deterministic, so
    /// re-derivation always overwrites the same object.
    pub fn thumb_key(&self, original_key: &str) -> String {
        keys::thumb_key_for(&self.prefix, original_key)
    }

    /// Render and store a thumbnail for an original whose bytes are already
    /// in memory. Returns the thumbnail URL, or None when derivation failed.
    pub async fn derive_from_bytes(&self, original_key: &str, data: &[u8]) -> Option<String> {
        let thumb_key = self.thumb_key(original_key);

        let owned = data.to_vec();
        // Decode, crop, and encode are CPU-bound; run off the async pool.
        let rendered = tokio::task::spawn_blocking(move || render_thumbnail(&owned)).await;

        let thumb_data = match rendered {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, key = %original_key, "Thumbnail render failed");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, key = %original_key, "Thumbnail render task failed");
                return None;
            }
        };

        match self
            .storage
            .upload(&thumb_key, thumb_data, THUMB_CONTENT_TYPE, CACHE_CONTROL)
            .await
        {
            Ok(url) => {
                tracing::debug!(key = %thumb_key, "Thumbnail stored");
                Some(url)
            }
            Err(e) => {
                tracing::warn!(error = %e, key = %thumb_key, "Thumbnail upload failed");
                None
            }
        }
    }

    /// Download an original by key and derive its thumbnail. Returns the
    /// thumbnail URL, or None when the original is unreadable or derivation
    /// failed.
    pub async fn derive_for_key(&self, original_key: &str) -> Option<String> {
        let data = match self.storage.download(original_key).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    key = %original_key,
                    "Original not readable, skipping thumbnail"
                );
                return None;
            }
        };

        self.derive_from_bytes(original_key, &data).await
    }
}
