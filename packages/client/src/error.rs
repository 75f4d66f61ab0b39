//! Error types for the Lockstep client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The room does not exist (or was closed after everyone left)
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    /// The server refused our token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The server rejected the request body
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

impl ClientError {
    /// Whether reconnecting could help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::ConnectionError(_) | ClientError::Http(_))
    }
}
