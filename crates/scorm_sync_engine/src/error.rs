//! Error types for the sync engine.

use crate::session::LifecycleError;
use scorm_sync_protocol::ProtocolError;
use scorm_sync_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The fallback endpoint answered with a non-success status.
    #[error("server responded with status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, lossily decoded.
        body: String,
    },

    /// Protocol error (invalid message format).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Durable store error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Session lifecycle call made in the wrong state.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Missing anti-forgery token.
    #[error("anti-forgery token unavailable")]
    MissingToken,

    /// Not connected.
    #[error("not connected to server")]
    NotConnected,
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    ///
    /// The scheduler retries every fallback failure on its next tick anyway;
    /// this classification only drives logging severity.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::HttpStatus { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            SyncError::NotConnected | SyncError::Storage(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection reset").is_retryable());
        assert!(!SyncError::transport_fatal("invalid certificate").is_retryable());
        assert!(SyncError::NotConnected.is_retryable());
        assert!(SyncError::HttpStatus {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!SyncError::HttpStatus {
            status: 403,
            body: "CSRF verification failed".into()
        }
        .is_retryable());
        assert!(!SyncError::MissingToken.is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::NotConnected;
        assert_eq!(err.to_string(), "not connected to server");

        let err = SyncError::HttpStatus {
            status: 500,
            body: "boom".into(),
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("boom"));

        let err = SyncError::from(LifecycleError::AlreadyInitialized);
        assert_eq!(err.to_string(), LifecycleError::AlreadyInitialized.to_string());
    }
}
