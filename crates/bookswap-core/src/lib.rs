//! Bookswap Core Library
//!
//! This crate provides the shared domain model, error types, configuration, and
//! upload constraints used across the Bookswap image pipeline components.

pub mod config;
pub mod error;
pub mod image_ref;
pub mod limits;

// Re-export commonly used types
pub use config::{BackfillConfig, DbConfig, StorageConfig};
pub use error::AppError;
pub use image_ref::ImageRef;
pub use limits::{ALLOWED_CONTENT_TYPES, CACHE_CONTROL, MAX_FILE_SIZE_BYTES, MAX_UPLOAD_FILES};
