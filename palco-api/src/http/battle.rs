//! PK battle commands: start, heart taps, end.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use palco_core::models::{PkTeam, RoomId, UserId};

use crate::http::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBattleRequest {
    pub opponent_id: UserId,
}

/// `POST /api/rooms/{room_id}/pk`
pub async fn start(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<StartBattleRequest>,
) -> AppResult<impl IntoResponse> {
    let battle = state
        .battles
        .start(&RoomId::from_string(room_id), &request.opponent_id)?;
    Ok(Json(battle))
}

#[derive(Debug, Deserialize)]
pub struct HeartRequest {
    pub team: PkTeam,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartResponse {
    pub hearts_a: u64,
    pub hearts_b: u64,
}

/// `POST /api/rooms/{room_id}/pk/heart`
pub async fn add_heart(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<HeartRequest>,
) -> AppResult<impl IntoResponse> {
    let (hearts_a, hearts_b) = state
        .battles
        .add_heart(&RoomId::from_string(room_id), request.team)?;
    Ok(Json(HeartResponse { hearts_a, hearts_b }))
}

/// `DELETE /api/rooms/{room_id}/pk`
pub async fn end(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let battle = state.battles.end(&RoomId::from_string(room_id))?;
    Ok(Json(battle))
}
