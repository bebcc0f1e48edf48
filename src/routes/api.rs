// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity API routes.

use crate::error::{AppError, Result};
use crate::models::{ActivityCounter, Location, LocationCount};
use crate::services::{CheckResult, RankedActivity};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", get(list_active))
        .route("/api/activities/all", get(list_all))
        .route("/api/activities/check", get(check_activity))
        .route("/api/activities/start", post(start_activity))
        .route("/api/activities/end", post(end_activity))
}

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ─── Start / End ─────────────────────────────────────────────

/// Body of `start` and `end` requests.
#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityRequest {
    /// Missing names deserialize as empty and are rejected as invalid input.
    #[serde(default)]
    #[validate(length(min = 1, message = "Activity name is required"))]
    pub name: String,
    #[validate(nested)]
    pub location: Option<Location>,
}

impl ActivityRequest {
    fn validated(self) -> Result<Self> {
        self.validate()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        Ok(self)
    }
}

/// Counter as returned by the API.
#[derive(Serialize, Debug, Clone)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityResponse {
    pub id: String,
    pub name: String,
    pub count: u32,
    pub locations: Vec<LocationCount>,
    pub created_at: String,
    pub updated_at: String,
    /// Only present in the active list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trending: Option<bool>,
}

impl From<ActivityCounter> for ActivityResponse {
    fn from(counter: ActivityCounter) -> Self {
        Self {
            id: counter.id,
            name: counter.name,
            count: counter.count,
            locations: counter.locations,
            created_at: format_utc_rfc3339(counter.created_at),
            updated_at: format_utc_rfc3339(counter.updated_at),
            trending: None,
        }
    }
}

impl From<RankedActivity> for ActivityResponse {
    fn from(ranked: RankedActivity) -> Self {
        Self {
            trending: Some(ranked.trending),
            ..ranked.counter.into()
        }
    }
}

/// Declare an activity.
async fn start_activity(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ActivityRequest>,
) -> Result<Json<ActivityResponse>> {
    let request = request.validated()?;
    let counter = state
        .activities
        .start(&request.name, request.location)
        .await?;
    Ok(Json(counter.into()))
}

/// End an activity. 404 if the name has never been started.
async fn end_activity(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ActivityRequest>,
) -> Result<Json<ActivityResponse>> {
    let request = request.validated()?;
    let counter = state
        .activities
        .end(&request.name, request.location)
        .await?;
    Ok(Json(counter.into()))
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct ListQuery {
    /// Maximum number of entries (clamped to the list's cap)
    limit: Option<usize>,
}

/// Active activities, most popular first. Used for the initial load and refreshes.
async fn list_active(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<ActivityResponse>>> {
    tracing::debug!(limit = ?params.limit, "Listing active activities");

    let active = state.activities.list_active(params.limit).await?;
    Ok(Json(active.into_iter().map(Into::into).collect()))
}

/// Autocomplete entry.
#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityNameEntry {
    pub id: String,
    pub name: String,
    pub count: u32,
}

/// Every known activity name, dormant ones included.
async fn list_all(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<ActivityNameEntry>>> {
    let all = state.activities.list_all(params.limit).await?;
    Ok(Json(
        all.into_iter()
            .map(|c| ActivityNameEntry {
                id: c.id,
                name: c.name,
                count: c.count,
            })
            .collect(),
    ))
}

// ─── Check ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct CheckQuery {
    #[serde(default)]
    name: String,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CheckResponse {
    pub exists: bool,
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<CheckResult> for CheckResponse {
    fn from(result: CheckResult) -> Self {
        match result {
            CheckResult::Exists(counter) => Self {
                exists: true,
                count: counter.count,
                id: Some(counter.id),
                name: Some(counter.name),
            },
            CheckResult::Missing => Self {
                exists: false,
                count: 0,
                id: None,
                name: None,
            },
        }
    }
}

/// Whether a name has a counter, and its current count.
///
/// Clients use this on load to decide if their remembered activity is still live.
async fn check_activity(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CheckQuery>,
) -> Result<Json<CheckResponse>> {
    let result = state.activities.check(&params.name).await?;
    Ok(Json(result.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_request_validation() {
        let ok = ActivityRequest {
            name: "coffee".to_string(),
            location: Some(Location {
                lat: 39.93,
                lng: 32.85,
            }),
        };
        assert!(ok.validated().is_ok());

        let empty = ActivityRequest {
            name: String::new(),
            location: None,
        };
        assert!(matches!(empty.validated(), Err(AppError::InvalidInput(_))));

        let off_globe = ActivityRequest {
            name: "coffee".to_string(),
            location: Some(Location {
                lat: 91.0,
                lng: 0.0,
            }),
        };
        assert!(matches!(
            off_globe.validated(),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_missing_name_deserializes_empty() {
        let request: ActivityRequest = serde_json::from_str(r#"{"location": null}"#).unwrap();
        assert!(request.name.is_empty());
    }

    #[test]
    fn test_response_timestamps_use_z_suffix() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let counter = ActivityCounter::new("coffee", 1, None, ts);
        let response = ActivityResponse::from(counter);

        assert_eq!(response.created_at, "2024-01-15T10:00:00.000Z");
        assert_eq!(response.trending, None);
    }

    #[test]
    fn test_check_response_shape() {
        let missing = serde_json::to_value(CheckResponse::from(CheckResult::Missing)).unwrap();
        assert_eq!(missing, serde_json::json!({"exists": false, "count": 0}));
    }
}
