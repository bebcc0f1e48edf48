// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side view of the active list.
//!
//! Each connected client keeps its own copy of the active list, seeded from
//! `GET /api/activities` and kept current by folding in broadcast events.
//! Events carry absolute counts, so applying the same event twice is a no-op
//! and events for different names commute. Two events for the *same* name
//! that arrive out of publish order leave the older count in place until the
//! next event or snapshot refresh.

use crate::models::counter::{BroadcastEvent, LocationCount};
use serde::{Deserialize, Serialize};

/// Number of leading entries flagged as trending.
pub const TRENDING_SLOTS: usize = 3;

/// One row of a client's local list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewEntry {
    pub name: String,
    pub count: u32,
    #[serde(default)]
    pub locations: Vec<LocationCount>,
}

/// A client's local list, unique by name and sorted by count descending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientView {
    entries: Vec<ViewEntry>,
}

impl ClientView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the view from a full snapshot. Zero counts and repeated names are dropped.
    pub fn from_snapshot(snapshot: impl IntoIterator<Item = ViewEntry>) -> Self {
        let mut view = Self::new();
        for entry in snapshot {
            if entry.count > 0 && view.position(&entry.name).is_none() {
                view.entries.push(entry);
            }
        }
        view.sort();
        view
    }

    /// Fold one broadcast event into the view.
    ///
    /// Returns `true` if the view changed.
    pub fn apply(&mut self, event: &BroadcastEvent) -> bool {
        let changed = apply_event(&mut self.entries, event);
        if changed {
            self.sort();
        }
        changed
    }

    pub fn entries(&self) -> &[ViewEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&ViewEntry> {
        self.position(name).map(|idx| &self.entries[idx])
    }

    /// The leading entries flagged as trending (rank only, no count threshold).
    pub fn trending(&self) -> &[ViewEntry] {
        &self.entries[..self.entries.len().min(TRENDING_SLOTS)]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    // Vec::sort_by is stable, so equal counts keep their arrival order.
    fn sort(&mut self) {
        self.entries.sort_by(|a, b| b.count.cmp(&a.count));
    }
}

/// Merge rule for a single event against an unsorted list.
///
/// - positive count, present: replace count and locations
/// - positive count, absent: append
/// - zero count, present: remove
/// - zero count, absent: nothing
pub fn apply_event(entries: &mut Vec<ViewEntry>, event: &BroadcastEvent) -> bool {
    let existing = entries.iter().position(|e| e.name == event.name);

    match (event.count > 0, existing) {
        (true, Some(idx)) => {
            let entry = &mut entries[idx];
            let mut changed = entry.count != event.count;
            entry.count = event.count;
            // Locations are a full snapshot; empty means none are left.
            if entry.locations != event.locations {
                entry.locations = event.locations.clone();
                changed = true;
            }
            changed
        }
        (true, None) => {
            entries.push(ViewEntry {
                name: event.name.clone(),
                count: event.count,
                locations: event.locations.clone(),
            });
            true
        }
        (false, Some(idx)) => {
            entries.remove(idx);
            true
        }
        (false, None) => false,
    }
}
