//! Gift-send endpoint.
//!
//! `POST /api/rooms/{room_id}/gift` is the command path behind the gift
//! button. Domain failures come back in the contract body
//! (`{success: false, error}`) with a matching status code.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use palco_core::models::{RoomId, UserId, UserView};

use crate::http::error::{status_code, AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendGiftRequest {
    pub from_user_id: UserId,
    pub gift_name: String,
    pub quantity: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendGiftResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_sender: Option<UserView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_receiver: Option<UserView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn send_gift(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<SendGiftRequest>,
) -> AppResult<impl IntoResponse> {
    let room_id = RoomId::from_string(room_id);

    match state
        .gifts
        .send_gift(
            &request.from_user_id,
            &room_id,
            &request.gift_name,
            request.quantity,
        )
        .await
    {
        Ok(outcome) => Ok((
            StatusCode::OK,
            Json(SendGiftResponse {
                success: true,
                updated_sender: Some(outcome.sender),
                updated_receiver: Some(outcome.receiver),
                error: None,
            }),
        )),
        Err(e) if e.is_client_error() => Ok((
            status_code(&e),
            Json(SendGiftResponse {
                success: false,
                updated_sender: None,
                updated_receiver: None,
                error: Some(e.to_string()),
            }),
        )),
        Err(e) => Err(AppError::from(e)),
    }
}
