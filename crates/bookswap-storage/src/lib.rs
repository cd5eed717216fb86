pub mod factory;
pub mod keys;
pub mod memory;
pub mod s3;
pub mod traits;

pub use factory::select_storage;
pub use keys::{object_key, sanitize_filename, thumb_key_for};
pub use memory::MemoryStorage;
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
