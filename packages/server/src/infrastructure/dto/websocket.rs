//! WebSocket envelope DTOs.
//!
//! Every frame is a JSON object `{"kind": ..., "data": ...}`. Inbound frames
//! are decoded in two steps: first the envelope with its `data` left as raw
//! JSON, then the payload once the kind is known. This lets the dispatcher
//! reject a guest's `CONTROL` before looking at its payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Frame;

pub const KIND_CONTROL: &str = "CONTROL";
pub const KIND_SYNC_REQUEST: &str = "SYNC_REQUEST";

/// Room state as it appears on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStateDto {
    pub room_id: String,
    pub video_url: String,
    pub is_playing: bool,
    pub position: f64,
    /// `null` while the room has no attached host.
    #[serde(default)]
    pub owner_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// `ROOM_STATE.data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomStatePayload {
    pub room: RoomStateDto,
}

/// Machine-readable error code carried by `ERROR` envelopes and HTTP error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    RoomNotFound,
    Unauthorized,
    ControlFailed,
    UnknownKind,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::RoomNotFound => "room_not_found",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::ControlFailed => "control_failed",
            ErrorCode::UnknownKind => "unknown_kind",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `ERROR.data`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorPayload {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Server → client envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum ServerEnvelope {
    #[serde(rename = "ROOM_STATE")]
    RoomState(RoomStatePayload),
    #[serde(rename = "ERROR")]
    Error(ErrorPayload),
}

impl ServerEnvelope {
    pub fn room_state(room: RoomStateDto) -> Self {
        ServerEnvelope::RoomState(RoomStatePayload { room })
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerEnvelope::Error(ErrorPayload::new(code, message))
    }

    /// Serialize once into a frame shared by every recipient.
    pub fn encode(&self) -> Result<Frame, serde_json::Error> {
        serde_json::to_string(self).map(Frame::from)
    }
}

/// `CONTROL.data.payload`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPayloadDto {
    pub position: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_playing: Option<bool>,
    /// Absent or zero means "now" on the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
}

/// `CONTROL.data`
///
/// `type` is a free-form label such as `play` or `seek`. `roomId` and
/// `senderId` are informational; the server trusts the authenticated
/// connection instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlDataDto {
    #[serde(rename = "type", default)]
    pub control_type: String,
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub sender_id: String,
    pub payload: ControlPayloadDto,
}

/// `SYNC_REQUEST.data`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequestDto {
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub sender_id: String,
}

/// Client → server envelope, used by clients to build frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum ClientEnvelope {
    #[serde(rename = "CONTROL")]
    Control(ControlDataDto),
    #[serde(rename = "SYNC_REQUEST")]
    SyncRequest(SyncRequestDto),
}

/// Inbound envelope with its payload not yet decoded
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawEnvelope {
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl RawEnvelope {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn control(&self) -> Result<ControlDataDto, serde_json::Error> {
        ControlDataDto::deserialize(&self.data)
    }

    /// A missing or `null` payload is accepted as an empty request.
    pub fn sync_request(&self) -> Result<SyncRequestDto, serde_json::Error> {
        if self.data.is_null() {
            return Ok(SyncRequestDto::default());
        }
        SyncRequestDto::deserialize(&self.data)
    }
}
