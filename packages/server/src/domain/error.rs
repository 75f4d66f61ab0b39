//! Domain errors.

use thiserror::Error;

/// Failures of room and registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("room not found")]
    RoomNotFound,

    #[error("invalid token")]
    InvalidToken,

    /// The token index points at a participant that is not attached.
    #[error("participant not found")]
    ParticipantNotFound,

    #[error("only host can control playback")]
    UnauthorizedControl,

    #[error("control issued at {issued_at} is older than the last applied control at {last_applied}")]
    StaleControl {
        issued_at: String,
        last_applied: String,
    },

    #[error("room already has host '{0}'")]
    HostAlreadyAssigned(String),
}

/// Invalid user-supplied value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} is required")]
    Empty(&'static str),

    #[error("{field} must be at most {max} long")]
    TooLong { field: &'static str, max: usize },
}

/// Failure writing to or closing a bound connection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("connection closed")]
    Closed,
}
