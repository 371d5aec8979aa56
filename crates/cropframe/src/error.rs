// Error types for cropframe

use thiserror::Error;

/// Result type for cropframe operations
pub type Result<T> = std::result::Result<T, CropError>;

/// Errors that can occur while cropping
#[derive(Error, Debug)]
pub enum CropError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for CropError {
    fn from(err: image::ImageError) -> Self {
        CropError::ImageProcessing(err.to_string())
    }
}
