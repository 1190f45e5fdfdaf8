//! Error types for the device registry

use thiserror::Error;

/// Errors opening or managing a cart
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No device with this name
    #[error("Unknown device: {0} (available: {1})")]
    UnknownDevice(String, String),

    /// Malformed or unsupported device parameter
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    /// The backing image could not be loaded or saved
    #[error(transparent)]
    Image(#[from] cartflash_dummy::ImageError),

    /// The cart rejected an operation
    #[error("Cart error: {0}")]
    Cart(#[from] cartflash_core::Error),
}
