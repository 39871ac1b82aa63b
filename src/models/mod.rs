// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod cached;
pub mod totals;

pub use activity::{ActivityRecord, ActivityType, SourceKind, WorkoutSource};
pub use cached::{CachedActivityRecord, MalformedRecordError};
pub use totals::{ActivityTotals, RunningTotal};
