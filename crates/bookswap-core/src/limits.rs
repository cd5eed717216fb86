//! Upload constraints shared by the ingestion pipeline and its callers.

/// Maximum number of files accepted in one upload request.
pub const MAX_UPLOAD_FILES: usize = 3;

/// Maximum size of a single uploaded file in bytes (5 MiB).
pub const MAX_FILE_SIZE_BYTES: usize = 5 * 1024 * 1024;

/// Declared MIME types accepted for upload. Some browsers/devices report JPG
/// as `image/jpg`, so the nonstandard alias is allowed alongside `image/jpeg`.
pub const ALLOWED_CONTENT_TYPES: &[&str] =
    &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Cache directive applied to every stored object. Keys embed a random
/// suffix, so objects are immutable for practical purposes and can be cached
/// for a year.
pub const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";
