use crate::refs::reference_key;
use bookswap_core::ImageRef;
use bookswap_storage::Storage;
use std::collections::HashSet;
use std::sync::Arc;

/// Deletes the storage objects behind a record's image references.
///
/// Best-effort: the record deletion flow must never block on storage, so
/// failures are logged and reported as zero deleted.
#[derive(Clone)]
pub struct CleanupService {
    storage: Arc<dyn Storage>,
    prefix: String,
}

impl CleanupService {
    pub fn new(storage: Arc<dyn Storage>, prefix: String) -> Self {
        Self { storage, prefix }
    }

    /// Delete every managed object the given references point at, in one
    /// batch. Returns the number of objects deleted.
    #[tracing::instrument(skip(self, refs), fields(ref_count = refs.len()))]
    pub async fn delete_refs(&self, refs: &[ImageRef]) -> usize {
        let keys = self.collect_keys(refs);
        if keys.is_empty() {
            return 0;
        }

        match self.storage.delete_objects(&keys).await {
            Ok(deleted) => {
                tracing::info!(requested = keys.len(), deleted = deleted, "Cleaned up image objects");
                deleted
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    key_count = keys.len(),
                    "Batch delete failed during record cleanup"
                );
                0
            }
        }
    }

    /// Managed keys for the references: originals and thumbnails, mapped to
    /// bare keys, restricted to the configured prefix, de-duplicated in
    /// first-seen order.
    fn collect_keys(&self, refs: &[ImageRef]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();

        for image in refs {
            for reference in [image.original(), image.thumb()].into_iter().flatten() {
                let Some(key) = reference_key(self.storage.as_ref(), reference) else {
                    continue;
                };
                if !key.starts_with(&self.prefix) {
                    continue;
                }
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }
        }

        keys
    }
}
