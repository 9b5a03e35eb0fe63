//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use skirmish_core::clock::Clock;
use skirmish_core::model::UserContext;
use skirmish_core::settings::CombatSettings;
use skirmish_lifecycle::application::controller::CombatLifecycleController;
use skirmish_rules::GenericRules;
use skirmish_test_support::{FixedClock, InMemorySettingsStore, MockRng, SequenceRng};
use tower::ServiceExt;
use uuid::Uuid;

use skirmish_api::routes;
use skirmish_api::state::{AppState, Engine};
use skirmish_api::table::Table;

/// 2026-01-15 10:00 UTC.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build the full app router with default settings.
pub fn build_test_app() -> (Router, AppState) {
    build_test_app_with(CombatSettings::default(), SequenceRng::new(vec![15]))
}

/// Build the full app router with the given settings and table dice. Uses
/// the same route structure as `main.rs`.
pub fn build_test_app_with(settings: CombatSettings, dice: SequenceRng) -> (Router, AppState) {
    let gm = Uuid::new_v4();
    let controller = CombatLifecycleController::new(
        Box::new(GenericRules),
        settings.clone(),
        UserContext::gm(gm),
        fixed_clock(),
        Box::new(MockRng),
    );
    let table = Table::new(gm, Box::new(dice));
    let state = AppState::new(
        Engine::new(table, controller),
        Arc::new(InMemorySettingsStore::new(settings)),
    );
    (routes::api_router().with_state(state.clone()), state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn request(method: Method, uri: &str, body: Option<&Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn post_json(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    send(app, request(Method::POST, uri, Some(body))).await
}

pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, request(Method::POST, uri, None)).await
}

pub async fn put_json(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    send(app, request(Method::PUT, uri, Some(body))).await
}

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, request(Method::GET, uri, None)).await
}

/// Places a token; returns the response body.
pub async fn place_token(app: Router, body: Value) -> Value {
    let (status, json) = post_json(app, "/api/v1/table/tokens", &body).await;
    assert_eq!(status, StatusCode::OK, "placing token failed: {json}");
    json
}

/// Register a playlist and return its id.
pub async fn register_playlist(app: Router, body: Value) -> Uuid {
    let (status, json) = post_json(app, "/api/v1/table/playlists", &body).await;
    assert_eq!(status, StatusCode::OK, "registering playlist failed: {json}");
    json["id"].as_str().unwrap().parse().unwrap()
}

/// Run one polling tick.
pub async fn tick(state: &AppState) {
    skirmish_api::ticker::run_tick(&state.engine).await;
}
