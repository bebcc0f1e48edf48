// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity counting service.
//!
//! Handles the core workflow for `start` and `end`:
//! 1. Normalize and validate the activity name
//! 2. Serialize on a per-name lock
//! 3. Read, mutate and persist the counter
//! 4. Broadcast the post-mutation snapshot
//!
//! A failed store operation aborts before anything is broadcast. A failed
//! broadcast after a successful write is logged and the write stands.

use crate::db::CounterStore;
use crate::error::{AppError, Result};
use crate::models::view::TRENDING_SLOTS;
use crate::models::{ActivityAction, ActivityCounter, BroadcastEvent, Location};
use crate::services::broadcast::{BroadcastChannel, EventStream};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Longest accepted activity name, in characters, after trimming.
pub const MAX_NAME_LEN: usize = 100;
/// Default and maximum size of the active list.
pub const MAX_ACTIVE_LIMIT: usize = 50;
/// Default and maximum size of the full (autocomplete) list.
pub const MAX_ALL_LIMIT: usize = 100;

/// Per-name mutexes serializing read-modify-write on one counter.
///
/// Entries live only while a call holds or waits on them.
pub type NameLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Exclusive access to one name. Dropping it unlocks the name and forgets
/// the lock if nobody else is waiting on it.
struct NameGuard<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    name: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for NameGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Waiters hold their own clone, so only an idle lock has a count of 1.
        self.locks
            .remove_if(&self.name, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Active counter with its rank-based trend flag.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedActivity {
    pub counter: ActivityCounter,
    pub trending: bool,
}

/// Result of looking up a name without mutating it.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    Exists(ActivityCounter),
    Missing,
}

/// Reconciles concurrent start/end calls into one canonical count per name.
#[derive(Clone)]
pub struct ActivityService {
    store: Arc<dyn CounterStore>,
    broadcast: Arc<dyn BroadcastChannel>,
    /// Locks are shared by every clone of the service.
    name_locks: NameLocks,
}

impl ActivityService {
    pub fn new(store: Arc<dyn CounterStore>, broadcast: Arc<dyn BroadcastChannel>) -> Self {
        Self {
            store,
            broadcast,
            name_locks: Arc::new(DashMap::new()),
        }
    }

    /// Declare one more participant in `name`.
    ///
    /// Revives a dormant counter in place; only a never-seen name creates a record.
    pub async fn start(&self, name: &str, location: Option<Location>) -> Result<ActivityCounter> {
        let name = normalize_name(name)?;
        let _guard = self.lock_name(&name).await;

        let counter = match self.store.find_by_name(&name).await? {
            Some(counter) => self.record_start(counter, location).await?,
            None => match self.store.create(&name, 1, location).await {
                Ok(counter) => counter,
                // Another instance may have inserted the record since the lookup.
                Err(create_err) => match self.store.find_by_name(&name).await? {
                    Some(counter) => {
                        tracing::debug!(name = %name, "Counter created concurrently, updating it");
                        self.record_start(counter, location).await?
                    }
                    None => return Err(create_err),
                },
            },
        };

        tracing::info!(
            name = %counter.name,
            count = counter.count,
            with_location = location.is_some(),
            "Activity started"
        );

        // Published under the lock so events for one name leave in commit order.
        self.publish(&counter, ActivityAction::Start).await;
        Ok(counter)
    }

    /// Remove one participant from `name`.
    ///
    /// Returns `NotFound` (and changes nothing) for a name with no record.
    /// A counter that reaches zero is kept as a dormant record.
    pub async fn end(&self, name: &str, location: Option<Location>) -> Result<ActivityCounter> {
        let name = normalize_name(name)?;
        let _guard = self.lock_name(&name).await;

        let mut counter = self
            .store
            .find_by_name(&name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {:?}", name)))?;

        counter.record_end(location, Utc::now());
        self.store.save(&counter).await?;

        tracing::info!(
            name = %counter.name,
            count = counter.count,
            with_location = location.is_some(),
            "Activity ended"
        );

        self.publish(&counter, ActivityAction::End).await;
        Ok(counter)
    }

    /// Active counters, most popular first, with the leading entries flagged trending.
    pub async fn list_active(&self, limit: Option<usize>) -> Result<Vec<RankedActivity>> {
        let limit = clamp_limit(limit, MAX_ACTIVE_LIMIT)?;
        let counters = self.store.list_active(limit).await?;

        Ok(counters
            .into_iter()
            .enumerate()
            .map(|(rank, counter)| RankedActivity {
                counter,
                trending: rank < TRENDING_SLOTS,
            })
            .collect())
    }

    /// Every known counter including dormant ones (for autocomplete).
    pub async fn list_all(&self, limit: Option<usize>) -> Result<Vec<ActivityCounter>> {
        let limit = clamp_limit(limit, MAX_ALL_LIMIT)?;
        self.store.list_all(limit).await
    }

    /// Look up a name without changing it.
    ///
    /// A name too long to ever be stored is simply missing.
    pub async fn check(&self, name: &str) -> Result<CheckResult> {
        let name = match normalize_name(name) {
            Ok(name) => name,
            Err(_) if !name.trim().is_empty() => return Ok(CheckResult::Missing),
            Err(e) => return Err(e),
        };
        Ok(match self.store.find_by_name(&name).await? {
            Some(counter) => CheckResult::Exists(counter),
            None => CheckResult::Missing,
        })
    }

    /// Follow every mutation from now on.
    pub fn subscribe(&self) -> EventStream {
        self.broadcast.subscribe()
    }

    async fn lock_name(&self, name: &str) -> NameGuard<'_> {
        let lock = self
            .name_locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        NameGuard {
            locks: &self.name_locks,
            name: name.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Count one more participant on an existing (possibly dormant) counter.
    async fn record_start(
        &self,
        mut counter: ActivityCounter,
        location: Option<Location>,
    ) -> Result<ActivityCounter> {
        let revived = !counter.is_active();
        counter.record_start(location, Utc::now());
        self.store.save(&counter).await?;
        if revived {
            tracing::debug!(name = %counter.name, id = %counter.id, "Dormant counter reused");
        }
        Ok(counter)
    }

    async fn publish(&self, counter: &ActivityCounter, action: ActivityAction) {
        let event = BroadcastEvent::from_counter(counter, action);
        if let Err(e) = self.broadcast.publish(event).await {
            // The counter is already committed; subscribers catch up on their next refresh.
            tracing::warn!(
                error = %e,
                name = %counter.name,
                ?action,
                "Broadcast failed after commit"
            );
        }
    }
}

/// Trim a user-supplied activity name and reject empty or oversized names.
pub fn normalize_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput(
            "Activity name is required".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::InvalidInput(format!(
            "Activity name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

fn clamp_limit(limit: Option<usize>, max: usize) -> Result<usize> {
    match limit {
        Some(0) => Err(AppError::InvalidInput(
            "Limit must be greater than 0".to_string(),
        )),
        Some(n) => Ok(n.min(max)),
        None => Ok(max),
    }
}
