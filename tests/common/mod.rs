// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use pulse_board::config::Config;
use pulse_board::db::{CounterStore, FirestoreDb, MemoryStore};
use pulse_board::routes::create_router;
use pulse_board::services::{ActivityService, BroadcastChannel, InProcessBroadcast};
use pulse_board::AppState;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Build app state around any store and broadcast channel.
#[allow(dead_code)]
pub fn test_state(
    store: Arc<dyn CounterStore>,
    broadcast: Arc<dyn BroadcastChannel>,
) -> Arc<AppState> {
    Arc::new(AppState {
        config: Config::test_default(),
        activities: ActivityService::new(store, broadcast),
    })
}

/// Create a test app backed by a fresh in-memory store.
/// Returns the router, the shared state and a handle on the store.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, MemoryStore) {
    let store = MemoryStore::new();
    let state = test_state(
        Arc::new(store.clone()),
        Arc::new(InProcessBroadcast::new(16)),
    );
    (create_router(state.clone()), state, store)
}

/// Create a test app whose Firestore client is offline (every store call fails).
#[allow(dead_code)]
pub fn create_offline_test_app() -> (axum::Router, Arc<AppState>) {
    let state = test_state(
        Arc::new(FirestoreDb::new_mock()),
        Arc::new(InProcessBroadcast::new(16)),
    );
    (create_router(state.clone()), state)
}

/// POST a JSON body and return the status and parsed JSON response.
#[allow(dead_code)]
pub async fn post_json(
    app: &axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    read_json(response).await
}

/// GET a URI and return the status and parsed JSON response.
#[allow(dead_code)]
pub async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}
