//! Error types for durable store operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store cannot be used at all (disabled, quota exhausted, no backing
    /// medium).
    #[error("durable store unavailable: {0}")]
    Unavailable(String),

    /// The key cannot be represented by this backend.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

impl StorageError {
    /// Creates an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }
}
