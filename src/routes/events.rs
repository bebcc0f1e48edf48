// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-Sent Events stream of counter changes.

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::{Stream, StreamExt};
use std::sync::Arc;

/// SSE event name carried by every counter change.
pub const ACTIVITY_UPDATE_EVENT: &str = "activity-update";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/activities/events", get(activity_events))
}

/// Subscribe to every start/end from now on.
///
/// The subscription is taken before the response starts, so a client that
/// loads `GET /api/activities` after opening this stream misses nothing.
async fn activity_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    tracing::debug!("Event stream subscriber connected");

    let stream = state.activities.subscribe().map(|event| {
        Event::default()
            .event(ACTIVITY_UPDATE_EVENT)
            .json_data(&event)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
