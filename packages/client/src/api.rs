//! REST calls to the Lockstep server.

use lockstep_server::infrastructure::dto::{
    http::{CreateRoomRequest, JoinRoomRequest, RejoinRoomRequest, SessionDto},
    websocket::{ErrorCode, ServerEnvelope},
};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::ClientError;

/// HTTP client bound to one server
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// `base_url` is the server's HTTP origin, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn create_room(
        &self,
        display_name: &str,
        video_url: &str,
    ) -> Result<SessionDto, ClientError> {
        let request = CreateRoomRequest {
            display_name: display_name.to_string(),
            video_url: video_url.to_string(),
        };
        let response = self
            .http
            .post(format!("{}/api/rooms", self.base_url))
            .json(&request)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn join_room(
        &self,
        room_id: &str,
        display_name: &str,
    ) -> Result<SessionDto, ClientError> {
        let request = JoinRoomRequest {
            display_name: display_name.to_string(),
        };
        let response = self
            .http
            .post(format!("{}/api/rooms/{}/join", self.base_url, room_id))
            .json(&request)
            .send()
            .await?;
        decode(response).await
    }

    /// Trade `token` for a fresh one; the old token stops working.
    pub async fn rejoin_room(&self, room_id: &str, token: &str) -> Result<SessionDto, ClientError> {
        let request = RejoinRoomRequest {
            token: token.to_string(),
        };
        let response = self
            .http
            .post(format!("{}/api/rooms/{}/rejoin", self.base_url, room_id))
            .json(&request)
            .send()
            .await?;
        decode(response).await
    }

    /// WebSocket URL of a room for `token`.
    pub fn websocket_url(&self, room_id: &str, token: &str) -> String {
        websocket_url(&self.base_url, room_id, token)
    }
}

fn websocket_url(base_url: &str, room_id: &str, token: &str) -> String {
    let origin = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        format!("ws://{}", base_url)
    };
    format!("{}/ws/rooms/{}?token={}", origin, room_id, token)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(error_from_body(status, &body))
}

/// Map an error response to a typed error, using the `ERROR` envelope when present.
fn error_from_body(status: StatusCode, body: &str) -> ClientError {
    let (code, message) = match serde_json::from_str::<ServerEnvelope>(body) {
        Ok(ServerEnvelope::Error(payload)) => (Some(payload.code), payload.message),
        _ => (None, format!("{} {}", status, body)),
    };
    match (code, status) {
        (Some(ErrorCode::RoomNotFound), _) | (None, StatusCode::NOT_FOUND) => {
            ClientError::RoomNotFound(message)
        }
        (Some(ErrorCode::Unauthorized), _) | (None, StatusCode::UNAUTHORIZED) => {
            ClientError::Unauthorized(message)
        }
        (Some(ErrorCode::InvalidRequest), _) | (None, StatusCode::BAD_REQUEST) => {
            ClientError::InvalidRequest(message)
        }
        _ => ClientError::ConnectionError(message),
    }
}
