mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{build_state, seed_room, seed_user};
use palco_core::models::WithdrawalMethod;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn test_gift_send_success_over_http() {
    let state = build_state();
    let sender = seed_user(&state, "fan", 100).await;
    let host = seed_user(&state, "host", 0).await;
    let room = seed_room(&state, &host).await;
    let router = palco_api::create_router(state.clone());

    let response = router
        .oneshot(post(
            &format!("/api/rooms/{}/gift", room.id),
            json!({ "fromUserId": sender, "giftName": "perfume", "quantity": 1 }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["updatedSender"]["diamonds"], 50);
    assert_eq!(body["updatedReceiver"]["earnings"], 50);
}

#[tokio::test]
async fn test_gift_send_insufficient_balance() {
    let state = build_state();
    let sender = seed_user(&state, "fan", 10).await;
    let host = seed_user(&state, "host", 0).await;
    let room = seed_room(&state, &host).await;
    let router = palco_api::create_router(state.clone());

    let response = router
        .oneshot(post(
            &format!("/api/rooms/{}/gift", room.id),
            json!({ "fromUserId": sender, "giftName": "perfume", "quantity": 1 }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().expect("error").contains("balance"));

    // No mutation happened.
    let sender_record = state.users.require(&sender).await.expect("sender");
    assert_eq!(sender_record.diamonds, 10);
}

#[tokio::test]
async fn test_gift_to_unknown_room_is_404() {
    let state = build_state();
    let sender = seed_user(&state, "fan", 100).await;
    let router = palco_api::create_router(state);

    let response = router
        .oneshot(post(
            "/api/rooms/no-such-room/gift",
            json!({ "fromUserId": sender, "giftName": "rose", "quantity": 1 }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_calculate_preview() {
    let state = build_state();
    let router = palco_api::create_router(state);

    let response = router
        .oneshot(post("/api/earnings/calculate", json!({ "amount": 10000 })))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["gross"], json!("100.00"));
    assert_eq!(body["fee"], json!("20.00"));
    assert_eq!(body["net"], json!("80.00"));
}

#[tokio::test]
async fn test_withdraw_flow() {
    let state = build_state();
    let broadcaster = seed_user(&state, "host", 0).await;
    state
        .users
        .update(&broadcaster, |u| {
            u.earnings = 10_000;
            u.withdrawal_method = Some(WithdrawalMethod::Pix {
                key: "host@example.com".to_string(),
            });
            Ok(())
        })
        .await
        .expect("seed earnings");
    let router = palco_api::create_router(state.clone());

    let response = router
        .oneshot(post(
            &format!("/api/earnings/{broadcaster}/withdraw"),
            json!({ "amount": 10000 }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["earnings"], 0);

    // The fee landed in the platform accumulator; nothing else did.
    assert_eq!(state.wallet.platform_earnings(), dec!(20.00));
}

#[tokio::test]
async fn test_withdraw_without_method() {
    let state = build_state();
    let broadcaster = seed_user(&state, "host", 0).await;
    state
        .users
        .update(&broadcaster, |u| {
            u.earnings = 10_000;
            Ok(())
        })
        .await
        .expect("seed earnings");
    let router = palco_api::create_router(state);

    let response = router
        .oneshot(post(
            &format!("/api/earnings/{broadcaster}/withdraw"),
            json!({ "amount": 1000 }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_go_live_and_close() {
    let state = build_state();
    let host = seed_user(&state, "host", 0).await;
    let router = palco_api::create_router(state.clone());

    let response = router
        .clone()
        .oneshot(post(
            "/api/rooms",
            json!({ "hostId": host, "title": "sexta ao vivo", "isPrivate": false }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let room_id = body["roomId"].as_str().expect("room id").to_string();
    assert_eq!(body["hostId"], host.as_str());

    let response = router
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/rooms/{room_id}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(state
        .rooms
        .get_room(&palco_core::models::RoomId::from(room_id))
        .is_err());
}

#[tokio::test]
async fn test_pk_battle_flow() {
    let state = build_state();
    let host = seed_user(&state, "host", 0).await;
    let opponent = seed_user(&state, "rival", 0).await;
    let room = seed_room(&state, &host).await;
    let router = palco_api::create_router(state);

    let response = router
        .clone()
        .oneshot(post(
            &format!("/api/rooms/{}/pk", room.id),
            json!({ "opponentId": opponent }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    for _ in 0..3 {
        let response = router
            .clone()
            .oneshot(post(
                &format!("/api/rooms/{}/pk/heart", room.id),
                json!({ "team": "a" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = router
        .clone()
        .oneshot(post(
            &format!("/api/rooms/{}/pk/heart", room.id),
            json!({ "team": "b" }),
        ))
        .await
        .expect("response");
    let body = body_json(response).await;
    assert_eq!(body["heartsA"], 3);
    assert_eq!(body["heartsB"], 1);

    let response = router
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/rooms/{}/pk", room.id))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_mic_toggle_broadcasts() {
    let state = build_state();
    let host = seed_user(&state, "host", 0).await;
    let room = seed_room(&state, &host).await;

    // Subscribe a connection to the room feed straight through the hub.
    let mut rx = state.hub.register("conn-1".to_string(), host.clone());
    state.hub.join_room("conn-1", &room.id);

    let router = palco_api::create_router(state);
    let response = router
        .oneshot(post(
            &format!("/api/rooms/{}/mic", room.id),
            json!({ "userId": host, "enabled": false }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let event = rx.try_recv().expect("mic event");
    let value = serde_json::to_value(&event).expect("encode");
    assert_eq!(value["type"], "MIC_TOGGLED");
    assert_eq!(value["enabled"], false);
}

#[tokio::test]
async fn test_health() {
    let state = build_state();
    let router = palco_api::create_router(state);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
}
