//! HTTP surface exercised in-process through the router

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use casino_engine::{
    api::{create_app, AppState},
    clock::ManualClock,
    config::CasinoConfig,
    games::draws::ScriptedDraws,
    storage::OptimizedStorage,
    CasinoEngine,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn app(dir: &TempDir, draws: ScriptedDraws) -> Router {
    let config = CasinoConfig::default();
    let api_config = config.api.clone();
    let engine = CasinoEngine::with_parts(
        config,
        OptimizedStorage::new(dir.path()).unwrap(),
        Box::new(draws),
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 4, 2, 12, 0, 0).unwrap(),
        )),
    )
    .unwrap();
    create_app(Arc::new(AppState::new(Arc::new(engine))), &api_config)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn test_health_echoes_request_id() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, ScriptedDraws::new());

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn test_request_id_generated_when_absent() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, ScriptedDraws::new());

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let generated = response.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());

    // Routing misses are answered inside the stack and still get an ID
    let request = Request::builder().uri("/nowhere").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_bet_take_flow_over_http() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, ScriptedDraws::new().with_bps([7_000]));

    let (status, body) = call(&app, "POST", "/players/5/deposit", Some(json!({ "amount": 1000 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], 1000);

    let (status, body) = call(&app, "POST", "/players/5/enter", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], true);
    assert_eq!(body["reason"], "ok");

    let (status, body) = call(&app, "POST", "/players/5/bet", Some(json!({ "stake": 100 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["wager"]["value"], 150);

    let (status, body) = call(&app, "POST", "/players/5/bet", Some(json!({ "stake": 100 }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, body) = call(&app, "GET", "/players/5/pending", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pending"]["stake"], 100);

    let (status, body) = call(&app, "POST", "/players/5/take", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payout"], 150);
    assert_eq!(body["balance"], 1050);

    let (status, body) = call(&app, "POST", "/players/5/take", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = call(&app, "GET", "/players/5/games?limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["games"].as_array().map(Vec::len), Some(1));

    let (status, body) = call(&app, "GET", "/jackpot", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pool"], 505);
}

#[tokio::test]
async fn test_rejections_map_to_http_errors() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, ScriptedDraws::new());

    let (status, _) = call(&app, "POST", "/players/9/bet", Some(json!({ "stake": 5 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, "POST", "/players/9/self-exclude", Some(json!({ "days": 3 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["excluded_until"].is_string());

    call(&app, "POST", "/players/9/deposit", Some(json!({ "amount": 100 }))).await;
    let (status, body) = call(&app, "POST", "/players/9/bet", Some(json!({ "stake": 10 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "ACCESS_DENIED");
    assert_eq!(body["error"]["details"]["reason"], "self_blocked");
    assert_eq!(body["error"]["details"]["context"]["days_remaining"], 3);
}

#[tokio::test]
async fn test_metrics_exposition() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, ScriptedDraws::new());

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("casino_jackpot_pool 500"));
}
