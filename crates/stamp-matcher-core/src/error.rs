use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the stamp-matcher library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image processing error
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// File not found error
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The batch did not finish within the configured timeout
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// Unknown error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Why an asset could not be turned into a normalized raster
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Neither vector markup nor a raster format we can read
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Recognised as a raster image but the bytes do not decode
    #[error("Corrupt image data: {0}")]
    CorruptData(String),

    /// Vector markup failed to parse or render
    #[error("Rasterization failed: {0}")]
    RasterizationFailed(String),
}

impl From<image::ImageError> for DecodeError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => DecodeError::UnsupportedFormat(e.to_string()),
            other => DecodeError::CorruptData(other.to_string()),
        }
    }
}

/// Failure of the fingerprint engine's strict path
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FingerprintError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The learned-embedding backend rejected the image
    #[error("Embedding failed: {0}")]
    Embedding(String),
}
