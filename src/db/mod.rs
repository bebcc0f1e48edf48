// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: durable activity counters.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::config::{Config, StoreBackend};
use crate::error::{AppError, Result};
use crate::models::{ActivityCounter, Location};
use async_trait::async_trait;
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    /// Activity counters (keyed by encoded activity name)
    pub const ACTIVITY_COUNTERS: &str = "activity_counters";
}

/// Keyed counter storage.
///
/// Each call is atomic on its own; read-modify-write across calls is
/// serialized by the caller. Any backend failure surfaces as
/// [`AppError::StorageUnavailable`].
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Look up the single counter for `name`, dormant or not.
    async fn find_by_name(&self, name: &str) -> Result<Option<ActivityCounter>>;

    /// Insert a new counter. Fails if a counter for `name` already exists.
    async fn create(
        &self,
        name: &str,
        initial_count: u32,
        initial_location: Option<Location>,
    ) -> Result<ActivityCounter>;

    /// Persist a mutated counter.
    async fn save(&self, counter: &ActivityCounter) -> Result<()>;

    /// Counters with `count > 0`, by count desc then `created_at` desc.
    async fn list_active(&self, limit: usize) -> Result<Vec<ActivityCounter>>;

    /// All counters including dormant ones, by count desc then `updated_at` desc.
    async fn list_all(&self, limit: usize) -> Result<Vec<ActivityCounter>>;
}

/// Open the store selected by the configuration.
pub async fn connect(config: &Config) -> Result<Arc<dyn CounterStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory counter store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Firestore => {
            let project_id = config.gcp_project_id.as_deref().ok_or_else(|| {
                AppError::StorageUnavailable("GCP_PROJECT_ID is not configured".to_string())
            })?;
            Ok(Arc::new(FirestoreDb::new(project_id).await?))
        }
    }
}
