// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed counter operations.
//!
//! Each activity counter is one document in `activity_counters`, with the
//! document ID derived from the activity name. Name uniqueness is therefore
//! enforced by Firestore itself: a dormant counter is the same document that
//! the next `start` revives.

use crate::db::{collections, CounterStore};
use crate::error::{AppError, Result};
use crate::models::counter::counter_id;
use crate::models::{ActivityCounter, Location};
use async_trait::async_trait;
use firestore::FirestoreQueryDirection;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self> {
        // The emulator accepts any bearer token; skip ADC lookup entirely.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            AppError::StorageUnavailable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::StorageUnavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return `StorageUnavailable`.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb> {
        self.client.as_ref().ok_or_else(|| {
            AppError::StorageUnavailable("Database not connected (offline mode)".to_string())
        })
    }
}

fn storage_error(e: impl std::fmt::Display) -> AppError {
    AppError::StorageUnavailable(e.to_string())
}

fn query_limit(limit: usize) -> u32 {
    u32::try_from(limit).unwrap_or(u32::MAX)
}

#[async_trait]
impl CounterStore for FirestoreDb {
    async fn find_by_name(&self, name: &str) -> Result<Option<ActivityCounter>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITY_COUNTERS)
            .obj()
            .one(&counter_id(name))
            .await
            .map_err(storage_error)
    }

    /// Insert a new counter document.
    ///
    /// Uses a Firestore insert rather than an upsert, so a concurrent creator
    /// on another instance fails instead of silently replacing the record.
    /// `ActivityService::start` then re-reads and updates the existing one.
    async fn create(
        &self,
        name: &str,
        initial_count: u32,
        initial_location: Option<Location>,
    ) -> Result<ActivityCounter> {
        let counter =
            ActivityCounter::new(name, initial_count, initial_location, chrono::Utc::now());

        let created: ActivityCounter = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::ACTIVITY_COUNTERS)
            .document_id(&counter.id)
            .object(&counter)
            .execute()
            .await
            .map_err(|e| AppError::StorageUnavailable(format!("Failed to create counter: {}", e)))?;

        tracing::debug!(name, id = %created.id, "Counter document created");
        Ok(created)
    }

    async fn save(&self, counter: &ActivityCounter) -> Result<()> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACTIVITY_COUNTERS)
            .document_id(&counter.id)
            .object(counter)
            .execute()
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    /// Requires a composite index on `(count DESC, created_at DESC)`.
    async fn list_active(&self, limit: usize) -> Result<Vec<ActivityCounter>> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITY_COUNTERS)
            .filter(|q| q.for_all([q.field("count").greater_than(0)]))
            .order_by([
                ("count", FirestoreQueryDirection::Descending),
                ("created_at", FirestoreQueryDirection::Descending),
            ])
            .limit(query_limit(limit))
            .obj()
            .query()
            .await
            .map_err(storage_error)
    }

    /// Requires a composite index on `(count DESC, updated_at DESC)`.
    async fn list_all(&self, limit: usize) -> Result<Vec<ActivityCounter>> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITY_COUNTERS)
            .order_by([
                ("count", FirestoreQueryDirection::Descending),
                ("updated_at", FirestoreQueryDirection::Descending),
            ])
            .limit(query_limit(limit))
            .obj()
            .query()
            .await
            .map_err(storage_error)
    }
}
