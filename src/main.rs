// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pulse Board API Server
//!
//! Keeps a live count of what people are doing right now and streams every
//! change to connected viewers.

use pulse_board::{
    config::Config,
    db,
    services::{ActivityService, InProcessBroadcast},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.store_backend,
        "Starting Pulse Board API"
    );

    // Open the counter store
    let store = db::connect(&config).await?;

    // Single fan-out channel for all viewers of this instance
    let broadcast = Arc::new(InProcessBroadcast::new(config.broadcast_capacity));
    tracing::info!(
        capacity = config.broadcast_capacity,
        "Broadcast channel initialized"
    );

    let activities = ActivityService::new(store, broadcast);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        activities,
    });

    // Build router
    let app = pulse_board::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pulse_board=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
