// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod counter;
pub mod view;

pub use counter::{ActivityAction, ActivityCounter, BroadcastEvent, Location, LocationCount};
pub use view::{ClientView, ViewEntry};
