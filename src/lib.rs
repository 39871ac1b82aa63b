// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! activity-sync: reconcile workouts from several fitness providers
//!
//! This crate fetches activities from every configured provider, collapses
//! records that describe the same workout, and keeps the reconciled
//! timeline cached across restarts along with incremental totals.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod providers;
pub mod routes;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use providers::PushRegistry;
use services::Aggregator;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub aggregator: Arc<Aggregator>,
    pub push: PushRegistry,
}
