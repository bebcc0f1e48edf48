// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fan-out and failure-isolation tests for counter broadcasts.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::StreamExt;
use pulse_board::db::{CounterStore, MemoryStore};
use pulse_board::error::{AppError, Result};
use pulse_board::models::{ActivityAction, BroadcastEvent, ClientView, LocationCount, ViewEntry};
use pulse_board::routes::create_router;
use pulse_board::services::{BroadcastChannel, EventStream};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

mod common;
use common::{create_test_app, get_json, post_json, test_state};

/// Transport that is always down.
struct DownBroadcast;

#[async_trait]
impl BroadcastChannel for DownBroadcast {
    async fn publish(&self, _event: BroadcastEvent) -> Result<()> {
        Err(AppError::BroadcastUnavailable("relay unreachable".to_string()))
    }

    fn subscribe(&self) -> EventStream {
        futures_util::stream::pending().boxed()
    }
}

#[tokio::test]
async fn test_each_subscriber_receives_exactly_one_event() {
    let (app, state, _store) = create_test_app();
    let mut first = state.activities.subscribe();
    let mut second = state.activities.subscribe();

    post_json(&app, "/api/activities/start", json!({"name": "coffee"})).await;

    for events in [&mut first, &mut second] {
        let event = events.next().await.unwrap();
        assert_eq!(event.name, "coffee");
        assert_eq!(event.count, 1);
        assert_eq!(event.action, ActivityAction::Start);

        let extra = tokio::time::timeout(Duration::from_millis(50), events.next()).await;
        assert!(extra.is_err(), "only one event per mutation");
    }
}

#[tokio::test]
async fn test_late_subscriber_uses_snapshot_not_replay() {
    let (app, state, _store) = create_test_app();
    post_json(&app, "/api/activities/start", json!({"name": "coffee"})).await;

    let mut late = state.activities.subscribe();
    let replay = tokio::time::timeout(Duration::from_millis(50), late.next()).await;
    assert!(replay.is_err());

    let (_, snapshot) = get_json(&app, "/api/activities").await;
    assert_eq!(snapshot[0]["name"], "coffee");
    assert_eq!(snapshot[0]["count"], 1);
}

fn view_from(snapshot: &serde_json::Value) -> ClientView {
    ClientView::from_snapshot(snapshot.as_array().unwrap().iter().map(|r| ViewEntry {
        name: r["name"].as_str().unwrap().to_string(),
        count: r["count"].as_u64().unwrap() as u32,
        locations: serde_json::from_value::<Vec<LocationCount>>(r["locations"].clone()).unwrap(),
    }))
}

#[tokio::test]
async fn test_viewers_converge() {
    let (app, state, _store) = create_test_app();
    let here = json!({"name": "run", "location": {"lat": 1.0, "lng": 2.0}});

    // One viewer joins before any activity, another after the first two starts.
    let mut early_events = state.activities.subscribe();
    let mut early_view = ClientView::new();

    post_json(&app, "/api/activities/start", here.clone()).await;
    post_json(&app, "/api/activities/start", json!({"name": "run"})).await;

    let (_, snapshot) = get_json(&app, "/api/activities").await;
    let mut late_view = view_from(&snapshot);
    let mut late_events = state.activities.subscribe();

    post_json(&app, "/api/activities/start", json!({"name": "tea"})).await;
    // Removes the only location sub-counter of "run".
    post_json(&app, "/api/activities/end", here).await;

    for _ in 0..4 {
        early_view.apply(&early_events.next().await.unwrap());
    }
    for _ in 0..2 {
        late_view.apply(&late_events.next().await.unwrap());
    }

    let (_, snapshot) = get_json(&app, "/api/activities").await;
    let fresh_view = view_from(&snapshot);

    assert_eq!(early_view, late_view);
    // Ties may order differently in a fresh snapshot; contents must match.
    assert_eq!(early_view.len(), fresh_view.len());
    for name in ["run", "tea"] {
        assert_eq!(early_view.get(name), fresh_view.get(name), "{}", name);
    }
    let run = early_view.get("run").unwrap();
    assert_eq!(run.count, 1);
    assert!(run.locations.is_empty());
}

#[tokio::test]
async fn test_broadcast_failure_keeps_commit() {
    let store = MemoryStore::new();
    let state = test_state(Arc::new(store.clone()), Arc::new(DownBroadcast));
    let app = create_router(state);

    let (status, body) = post_json(&app, "/api/activities/start", json!({"name": "coffee"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(store.find_by_name("coffee").await.unwrap().unwrap().count, 1);
}

#[tokio::test]
async fn test_storage_failure_broadcasts_nothing() {
    let (app, state, store) = create_test_app();
    let mut events = state.activities.subscribe();
    store.set_available(false);

    let (status, body) = post_json(&app, "/api/activities/start", json!({"name": "coffee"})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "storage_unavailable");

    let next = tokio::time::timeout(Duration::from_millis(50), events.next()).await;
    assert!(next.is_err());

    store.set_available(true);
    assert!(store.find_by_name("coffee").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sse_stream_delivers_updates() {
    let (app, state, _store) = create_test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/activities/events")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    state.activities.start("coffee", None).await.unwrap();

    let mut body = response.into_body().into_data_stream();
    let frame = tokio::time::timeout(Duration::from_secs(1), body.next())
        .await
        .expect("event should arrive")
        .unwrap()
        .unwrap();
    let text = String::from_utf8(frame.to_vec()).unwrap();

    assert!(text.contains("event: activity-update"));
    assert!(text.contains(r#""name":"coffee""#));
    assert!(text.contains(r#""action":"start""#));
}
