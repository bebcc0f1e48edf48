// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-local counter store.

use crate::db::CounterStore;
use crate::error::{AppError, Result};
use crate::models::counter::{by_count_then_created, by_count_then_updated};
use crate::models::{ActivityCounter, Location};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// In-memory counter store keyed by activity name.
///
/// Clones share the same map. [`MemoryStore::set_available`] simulates an
/// outage: every operation then fails with `StorageUnavailable`.
#[derive(Clone)]
pub struct MemoryStore {
    counters: Arc<DashMap<String, ActivityCounter>>,
    available: Arc<AtomicBool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(DashMap::new()),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored records (dormant included).
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::StorageUnavailable(
                "Memory store marked unavailable".to_string(),
            ))
        }
    }

    fn sorted<K, F>(&self, limit: usize, keep: K, order: F) -> Vec<ActivityCounter>
    where
        K: Fn(&ActivityCounter) -> bool,
        F: Fn(&ActivityCounter, &ActivityCounter) -> std::cmp::Ordering,
    {
        let mut counters: Vec<ActivityCounter> = self
            .counters
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        counters.sort_by(order);
        counters.truncate(limit);
        counters
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<ActivityCounter>> {
        self.check_available()?;
        Ok(self.counters.get(name).map(|c| c.value().clone()))
    }

    async fn create(
        &self,
        name: &str,
        initial_count: u32,
        initial_location: Option<Location>,
    ) -> Result<ActivityCounter> {
        self.check_available()?;

        match self.counters.entry(name.to_string()) {
            Entry::Occupied(_) => Err(AppError::Internal(anyhow::anyhow!(
                "Counter for {:?} already exists",
                name
            ))),
            Entry::Vacant(slot) => {
                let counter = ActivityCounter::new(
                    name,
                    initial_count,
                    initial_location,
                    chrono::Utc::now(),
                );
                slot.insert(counter.clone());
                Ok(counter)
            }
        }
    }

    async fn save(&self, counter: &ActivityCounter) -> Result<()> {
        self.check_available()?;
        self.counters.insert(counter.name.clone(), counter.clone());
        Ok(())
    }

    async fn list_active(&self, limit: usize) -> Result<Vec<ActivityCounter>> {
        self.check_available()?;
        Ok(self.sorted(limit, ActivityCounter::is_active, by_count_then_created))
    }

    async fn list_all(&self, limit: usize) -> Result<Vec<ActivityCounter>> {
        self.check_available()?;
        Ok(self.sorted(limit, |_| true, by_count_then_updated))
    }
}
