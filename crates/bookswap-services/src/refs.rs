//! Reference-to-key mapping shared by the resolver, cleanup, and backfill.

use bookswap_core::image_ref::is_data_url;
use bookswap_storage::Storage;

/// Map a stored reference string to a bare storage key.
///
/// `data:`/`blob:` references have no key, and URLs yield a key only when
/// the backend claims their host. Everything else is treated as a bare key
/// with at most one leading slash stripped.
pub(crate) fn reference_key(storage: &dyn Storage, reference: &str) -> Option<String> {
    if is_data_url(reference) || reference.starts_with("blob:") {
        return None;
    }

    if reference.contains("://") {
        return storage.key_for_url(reference);
    }

    let bare = reference.strip_prefix('/').unwrap_or(reference);
    if bare.is_empty() {
        None
    } else {
        Some(bare.to_string())
    }
}
