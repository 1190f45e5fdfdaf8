//! Error types for emulated cart images

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors loading or saving a cart image file
#[derive(Debug, Error)]
pub enum ImageError {
    /// I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file does not match the emulated flash size
    #[error("Image {path} is {actual} bytes, expected {expected}")]
    SizeMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },
}

/// Result type for image operations
pub type Result<T> = std::result::Result<T, ImageError>;
