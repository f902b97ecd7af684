//! Error types for the Floodgate library.

use thiserror::Error;

use crate::store::StoreError;

/// Main error type for Floodgate operations.
#[derive(Error, Debug)]
pub enum FloodgateError {
    /// Configuration-related errors, including invalid limit specifications
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store connection or setup errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Floodgate operations.
pub type Result<T> = std::result::Result<T, FloodgateError>;
