//! HTTP API request and response DTOs.

use serde::{Deserialize, Serialize};

use super::websocket::RoomStateDto;

/// `POST /api/rooms`
///
/// Missing fields deserialize as empty and are rejected by validation, so a
/// client gets `invalid_request` with a field name rather than a decode error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub video_url: String,
}

/// `POST /api/rooms/{roomId}/join`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    #[serde(default)]
    pub display_name: String,
}

/// `POST /api/rooms/{roomId}/rejoin`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejoinRoomRequest {
    #[serde(default)]
    pub token: String,
}

/// Session returned by create, join and rejoin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub room_id: String,
    pub user_id: String,
    pub token: String,
    pub is_host: bool,
    pub state: RoomStateDto,
}
