// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity counter model for storage, API and broadcast events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// A geographic point reported by a client when starting or ending an activity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Location {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}

/// Per-location sub-counter of an activity.
///
/// Keyed by exact `(lat, lng)` equality. Entries never persist with a zero count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LocationCount {
    pub lat: f64,
    pub lng: f64,
    pub count: u32,
}

impl LocationCount {
    fn matches(&self, location: &Location) -> bool {
        self.lat == location.lat && self.lng == location.lng
    }
}

/// Stored counter record, one per distinct activity name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityCounter {
    /// Document ID, derived from the name (see [`counter_id`])
    pub id: String,
    /// Trimmed activity name (unique, case-sensitive)
    pub name: String,
    /// Number of clients currently declaring this activity
    pub count: u32,
    /// Optional geographic sub-counts
    #[serde(default)]
    pub locations: Vec<LocationCount>,
    /// Set once, when the record is first created
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
    /// Stamped on every mutation
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl ActivityCounter {
    /// Build a fresh counter for a name that has never been seen.
    pub fn new(name: &str, count: u32, location: Option<Location>, now: DateTime<Utc>) -> Self {
        let locations = location
            .map(|l| {
                vec![LocationCount {
                    lat: l.lat,
                    lng: l.lng,
                    count: 1,
                }]
            })
            .unwrap_or_default();

        Self {
            id: counter_id(name),
            name: name.to_string(),
            count,
            locations,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether anyone currently declares this activity.
    pub fn is_active(&self) -> bool {
        self.count > 0
    }

    /// Apply one `start` to this counter (dormant counters are revived in place).
    pub fn record_start(&mut self, location: Option<Location>, now: DateTime<Utc>) {
        self.count = self.count.saturating_add(1);

        if let Some(location) = location {
            match self.locations.iter_mut().find(|l| l.matches(&location)) {
                Some(entry) => entry.count = entry.count.saturating_add(1),
                None => self.locations.push(LocationCount {
                    lat: location.lat,
                    lng: location.lng,
                    count: 1,
                }),
            }
        }

        self.updated_at = now;
    }

    /// Apply one `end` to this counter. Both the total and the matching
    /// location are floored at zero; an emptied location is dropped.
    pub fn record_end(&mut self, location: Option<Location>, now: DateTime<Utc>) {
        self.count = self.count.saturating_sub(1);

        if let Some(location) = location {
            if let Some(idx) = self.locations.iter().position(|l| l.matches(&location)) {
                let entry = &mut self.locations[idx];
                entry.count = entry.count.saturating_sub(1);
                if entry.count == 0 {
                    self.locations.remove(idx);
                }
            }
        }

        self.updated_at = now;
    }
}

/// Derive the document ID for an activity name.
///
/// Firestore document IDs cannot contain `/`, be `.` or `..`, or match `__.*__`,
/// so the name is percent-encoded with `.` and `_` escaped as well.
pub fn counter_id(name: &str) -> String {
    urlencoding::encode(name)
        .replace('.', "%2E")
        .replace('_', "%5F")
}

/// Ordering for the active list: count descending, then newest first.
pub fn by_count_then_created(a: &ActivityCounter, b: &ActivityCounter) -> Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

/// Ordering for the full list: count descending, then most recently touched first.
pub fn by_count_then_updated(a: &ActivityCounter, b: &ActivityCounter) -> Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| b.updated_at.cmp(&a.updated_at))
}

/// Which transition produced a broadcast event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ActivityAction {
    Start,
    End,
}

/// State-change notification fanned out to every subscriber.
///
/// Carries the post-mutation snapshot, so receivers replace their copy
/// instead of accumulating deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BroadcastEvent {
    pub id: String,
    pub name: String,
    pub count: u32,
    pub locations: Vec<LocationCount>,
    pub action: ActivityAction,
}

impl BroadcastEvent {
    pub fn from_counter(counter: &ActivityCounter, action: ActivityAction) -> Self {
        Self {
            id: counter.id.clone(),
            name: counter.name.clone(),
            count: counter.count,
            locations: counter.locations.clone(),
            action,
        }
    }
}
