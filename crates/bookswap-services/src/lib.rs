//! Image pipeline services: upload ingestion, thumbnail derivation, URL
//! resolution, record cleanup, and the legacy-reference backfill job.
//!
//! Every service holds its dependencies as `Arc<dyn Storage>` (plus the
//! book repository where records are touched), so the same code runs
//! against S3 in production and the in-memory backend in tests.

pub mod backfill;
pub mod cleanup;
mod refs;
pub mod resolve;
pub mod thumbs;
pub mod upload;

pub use backfill::{BackfillMigrator, BackfillReport};
pub use cleanup::CleanupService;
pub use resolve::UrlResolver;
pub use thumbs::Thumbnailer;
pub use upload::{StoredImage, UploadFile, UploadService};
