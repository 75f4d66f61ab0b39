//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{
    domain::{DisplayName, RoomId, Token, VideoUrl},
    infrastructure::dto::{
        http::{CreateRoomRequest, JoinRoomRequest, RejoinRoomRequest, SessionDto},
        websocket::RoomStateDto,
    },
    ui::state::AppState,
};

use super::error::{ApiError, ApiResult};

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Create a room with the caller as host
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateRoomRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SessionDto>)> {
    let Json(request) = payload?;

    // Convert String -> Domain Models
    let display_name = DisplayName::try_from(request.display_name)?;
    let video_url = VideoUrl::try_from(request.video_url)?;

    let session = state
        .usecases
        .create_room
        .execute(display_name, video_url)
        .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// Join a room as a guest
pub async fn join_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    payload: Result<Json<JoinRoomRequest>, JsonRejection>,
) -> ApiResult<Json<SessionDto>> {
    let Json(request) = payload?;
    let display_name = DisplayName::try_from(request.display_name)?;

    let session = state
        .usecases
        .join_room
        .execute(&RoomId::from(room_id), display_name)
        .await?;
    Ok(Json(session.into()))
}

/// Trade the current token for a fresh one
pub async fn rejoin_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    payload: Result<Json<RejoinRoomRequest>, JsonRejection>,
) -> ApiResult<Json<SessionDto>> {
    let Json(request) = payload?;
    if request.token.is_empty() {
        return Err(ApiError::bad_request("token is required"));
    }

    let session = state
        .usecases
        .rejoin_room
        .execute(&RoomId::from(room_id), &Token::from(request.token))
        .await?;
    Ok(Json(session.into()))
}

/// Current state of a room
pub async fn get_room_state(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> ApiResult<Json<RoomStateDto>> {
    let room_state = state
        .usecases
        .get_room_state
        .execute(&RoomId::from(room_id))
        .await?;
    Ok(Json(room_state.into()))
}
