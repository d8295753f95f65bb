//! Earnings endpoints: the conversion preview and withdrawal execution.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use palco_core::models::{UserId, UserView};

use crate::http::error::{status_code, AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CalculateResponse {
    pub gross: Decimal,
    pub fee: Decimal,
    pub net: Decimal,
}

/// `POST /api/earnings/calculate`: pure preview, no state change.
pub async fn calculate(
    State(state): State<AppState>,
    Json(request): Json<AmountRequest>,
) -> AppResult<impl IntoResponse> {
    let quote = state.wallet.preview(request.amount)?;
    Ok(Json(CalculateResponse {
        gross: quote.gross,
        fee: quote.fee,
        net: quote.net,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `POST /api/earnings/{user_id}/withdraw`
pub async fn withdraw(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<AmountRequest>,
) -> AppResult<impl IntoResponse> {
    let user_id = UserId::from_string(user_id);

    match state.wallet.withdraw(&user_id, request.amount).await {
        Ok(outcome) => Ok((
            StatusCode::OK,
            Json(WithdrawResponse {
                success: true,
                user: Some(outcome.user),
                error: None,
            }),
        )),
        Err(e) if e.is_client_error() => Ok((
            status_code(&e),
            Json(WithdrawResponse {
                success: false,
                user: None,
                error: Some(e.to_string()),
            }),
        )),
        Err(e) => Err(AppError::from(e)),
    }
}
