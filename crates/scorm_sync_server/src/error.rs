//! Error types for the sync server.

use scorm_sync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the sync server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request format.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or invalid anti-forgery token.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// No route for the request path.
    #[error("not found: {0}")]
    NotFound(String),

    /// Request exceeds a configured limit.
    #[error("request too large: {actual} > {limit}")]
    TooLarge {
        /// Configured limit.
        limit: usize,
        /// Size of the request.
        actual: usize,
    },

    /// Body could not be decoded or a response encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidRequest(_)
                | ServerError::NotAuthorized(_)
                | ServerError::NotFound(_)
                | ServerError::TooLarge { .. }
                | ServerError::Protocol(ProtocolError::Decode(_))
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns the HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) | ServerError::Protocol(ProtocolError::Decode(_)) => {
                400
            }
            ServerError::NotAuthorized(_) => 403,
            ServerError::NotFound(_) => 404,
            ServerError::TooLarge { .. } => 413,
            ServerError::Protocol(_) | ServerError::Internal(_) => 500,
        }
    }
}
