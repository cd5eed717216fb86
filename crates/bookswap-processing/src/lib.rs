pub mod crop;
pub mod error;
pub mod thumbnail;

pub use crop::entropy_crop;
pub use error::{ProcessingError, ProcessingResult};
pub use thumbnail::{render_thumbnail, THUMBNAIL_SIZE, WEBP_QUALITY};
