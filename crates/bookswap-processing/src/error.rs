use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Image decode failed: {0}")]
    DecodeFailed(String),

    #[error("Crop dimensions ({0}x{1}) exceed image dimensions ({2}x{3})")]
    CropOutOfBounds(u32, u32, u32, u32),
}

pub type ProcessingResult<T> = Result<T, ProcessingError>;
