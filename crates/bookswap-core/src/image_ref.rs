//! Asset reference model
//!
//! Catalog records store their images as a JSON array that has gone through
//! two schema generations: legacy records hold bare strings (a backend URL,
//! a bare storage key, or an inline `data:` URL), current records hold
//! `{original, thumb}` objects. Both shapes must be accepted on read, which
//! is why `ImageRef` is an untagged sum type rather than a struct with
//! optional fields.

use serde::{Deserialize, Serialize};

/// One stored image reference inside a catalog record's `images` array.
///
/// Variant order matters for untagged deserialization: objects carrying an
/// `original` field become `Entry`, JSON strings become `Legacy`, and
/// anything else is preserved verbatim as `Other` so unrecognized entries
/// survive a read-rewrite cycle untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    /// Current dual representation; `thumb` serializes as `null` until a
    /// thumbnail has been derived.
    Entry {
        original: String,
        thumb: Option<String>,
    },
    /// Legacy flat string: backend URL, bare key, or inline data URL.
    Legacy(String),
    /// Unrecognized entry shape, carried through unchanged.
    Other(serde_json::Value),
}

impl ImageRef {
    /// The original-image reference, when this entry has one.
    pub fn original(&self) -> Option<&str> {
        match self {
            ImageRef::Entry { original, .. } => Some(original),
            ImageRef::Legacy(s) => Some(s),
            ImageRef::Other(_) => None,
        }
    }

    /// The thumbnail reference, when present.
    pub fn thumb(&self) -> Option<&str> {
        match self {
            ImageRef::Entry { thumb, .. } => thumb.as_deref(),
            _ => None,
        }
    }

    /// Whether this entry already carries both halves of the dual shape.
    pub fn has_thumb(&self) -> bool {
        matches!(self, ImageRef::Entry { thumb: Some(_), .. })
    }
}

/// Inline-encoded image payloads cannot be addressed by storage key, so they
/// are never thumbnailed, signed, or deleted.
pub fn is_data_url(reference: &str) -> bool {
    reference.starts_with("data:")
}
