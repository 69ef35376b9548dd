//! Error types for protocol encoding and decoding.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The message could not be serialized.
    #[error("encode error: {0}")]
    Encode(String),

    /// The bytes were not a well-formed message.
    #[error("decode error: {0}")]
    Decode(String),

    /// The message parsed but violates a protocol rule.
    #[error("invalid message: {0}")]
    Invalid(String),
}

impl ProtocolError {
    /// Creates an invalid message error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}
