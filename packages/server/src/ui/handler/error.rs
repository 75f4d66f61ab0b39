//! HTTP error handling

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    domain::{RoomError, ValueObjectError},
    infrastructure::dto::websocket::{ErrorCode, ServerEnvelope},
    usecase::ConnectError,
};

/// Result type for HTTP handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Error answered with an HTTP status and an `ERROR` envelope body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::InvalidRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCode::RoomNotFound, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ServerEnvelope::error(self.code, self.message));
        (self.status, body).into_response()
    }
}

impl From<RoomError> for ApiError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::RoomNotFound => Self::not_found(err.to_string()),
            RoomError::InvalidToken | RoomError::ParticipantNotFound => {
                Self::unauthorized(err.to_string())
            }
            RoomError::UnauthorizedControl => {
                Self::new(StatusCode::FORBIDDEN, ErrorCode::Unauthorized, err.to_string())
            }
            RoomError::StaleControl { .. } => {
                Self::new(StatusCode::CONFLICT, ErrorCode::ControlFailed, err.to_string())
            }
            RoomError::HostAlreadyAssigned(_) => {
                Self::new(StatusCode::CONFLICT, ErrorCode::InvalidRequest, err.to_string())
            }
        }
    }
}

impl From<ValueObjectError> for ApiError {
    fn from(err: ValueObjectError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// Every failed WebSocket authorization is a 401, including an unknown room.
impl From<ConnectError> for ApiError {
    fn from(err: ConnectError) -> Self {
        Self::unauthorized(err.to_string())
    }
}
