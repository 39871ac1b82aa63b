// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod aggregator;
pub mod cache;
pub mod dedup;
pub mod events;

pub use aggregator::{Aggregator, AggregatorOptions, LiveOutcome, LiveSubscription, TimelinePhase};
pub use cache::{AggregationCache, CacheError};
pub use dedup::{deduplicate, deduplicate_with, DedupConfig};
pub use events::{ActivityEvent, EventBus, Topic};
