// Module: http
// HTTP/JSON API for the gift and wallet contract, plus the WebSocket bus.

pub mod battle;
pub mod error;
pub mod gift;
pub mod health;
pub mod room;
pub mod wallet;

use axum::{
    routing::{any, delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{AppError, AppResult};

use crate::state::AppState;
use crate::ws;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/rooms", post(room::create_room))
        .route("/api/rooms/{room_id}", delete(room::close_room))
        .route("/api/rooms/{room_id}/invite", post(room::invite))
        .route("/api/rooms/{room_id}/mic", post(room::toggle_mic))
        .route("/api/rooms/{room_id}/sound", post(room::toggle_sound))
        .route("/api/users/{user_id}/auto-invite", post(room::toggle_auto_invite))
        .route("/api/rooms/{room_id}/gift", post(gift::send_gift))
        .route(
            "/api/rooms/{room_id}/pk",
            post(battle::start).delete(battle::end),
        )
        .route("/api/rooms/{room_id}/pk/heart", post(battle::add_heart))
        .route("/api/earnings/calculate", post(wallet::calculate))
        .route("/api/earnings/{user_id}/withdraw", post(wallet::withdraw))
        .route("/api/ws", any(ws::websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
