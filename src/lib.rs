// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pulse Board: what are people doing right now?
//!
//! This crate provides the backend API for a live activity counter board.
//! Clients declare an activity, the service keeps one shared counter per
//! activity name and pushes every change to all connected viewers.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use services::ActivityService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub activities: ActivityService,
}
