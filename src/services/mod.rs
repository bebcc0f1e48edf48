// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity;
pub mod broadcast;

pub use activity::{ActivityService, CheckResult, RankedActivity};
pub use broadcast::{BroadcastChannel, EventStream, InProcessBroadcast};
