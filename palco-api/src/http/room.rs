//! Room lifecycle commands that arrive over HTTP: going live, closing the
//! room, invitations, and the mic/sound/auto-invite toggles that are
//! announced through the bus.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use palco_core::models::{CreateRoomRequest, Room, RoomId, UserId};

use crate::http::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoLiveRequest {
    pub host_id: UserId,
    #[serde(flatten)]
    pub room: CreateRoomRequest,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomResponse {
    pub room_id: RoomId,
    pub host_id: UserId,
    pub title: String,
    pub is_private: bool,
}

impl From<Room> for RoomResponse {
    fn from(room: Room) -> Self {
        Self {
            room_id: room.id,
            host_id: room.host_id,
            title: room.title,
            is_private: room.is_private,
        }
    }
}

/// `POST /api/rooms`: a broadcaster goes live.
pub async fn create_room(
    State(state): State<AppState>,
    Json(request): Json<GoLiveRequest>,
) -> AppResult<impl IntoResponse> {
    let room = state.rooms.create_room(&request.host_id, request.room).await?;
    Ok(Json(RoomResponse::from(room)))
}

/// `DELETE /api/rooms/{room_id}`: end the broadcast and cascade teardown.
pub async fn close_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let room = state.rooms.close_room(&RoomId::from_string(room_id))?;
    Ok(Json(RoomResponse::from(room)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub inviter_id: UserId,
    pub invitee_id: UserId,
}

/// `POST /api/rooms/{room_id}/invite`
pub async fn invite(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<InviteRequest>,
) -> AppResult<impl IntoResponse> {
    let invitation = state
        .rooms
        .invite(
            &RoomId::from_string(room_id),
            &request.inviter_id,
            &request.invitee_id,
        )
        .await?;
    Ok(Json(invitation))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    pub user_id: UserId,
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub success: bool,
}

/// `POST /api/rooms/{room_id}/mic`
pub async fn toggle_mic(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<ToggleRequest>,
) -> AppResult<impl IntoResponse> {
    state
        .rooms
        .toggle_mic(&RoomId::from_string(room_id), &request.user_id, request.enabled)?;
    Ok(Json(ToggleResponse { success: true }))
}

/// `POST /api/rooms/{room_id}/sound`
pub async fn toggle_sound(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<ToggleRequest>,
) -> AppResult<impl IntoResponse> {
    state
        .rooms
        .toggle_sound(&RoomId::from_string(room_id), &request.user_id, request.enabled)?;
    Ok(Json(ToggleResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct AutoInviteRequest {
    pub enabled: bool,
}

/// `POST /api/users/{user_id}/auto-invite`
pub async fn toggle_auto_invite(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<AutoInviteRequest>,
) -> AppResult<impl IntoResponse> {
    state
        .rooms
        .toggle_auto_invite(&UserId::from_string(user_id), request.enabled);
    Ok(Json(ToggleResponse { success: true }))
}
