// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read API over the reconciled timeline, plus a manual refresh trigger.

use crate::error::{AppError, Result};
use crate::models::{ActivityRecord, ActivityType, WorkoutSource};
use crate::services::TimelinePhase;
use crate::time_utils::{format_local, format_utc_rfc3339, parse_utc_rfc3339};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", get(get_activities))
        .route("/api/totals", get(get_totals))
        .route("/api/status", get(get_status))
        .route("/api/refresh", post(refresh))
}

// ─── Activities ──────────────────────────────────────────────

const MAX_LIMIT: u32 = 200;

#[derive(Deserialize, Validate)]
struct ActivitiesQuery {
    /// Only activities starting after this instant (RFC3339)
    after: Option<String>,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 200))]
    limit: u32,
    #[serde(default)]
    offset: u32,
}

fn default_limit() -> u32 {
    50
}

#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitySummary {
    pub id: String,
    pub activity_type: ActivityType,
    pub workout_source: WorkoutSource,
    pub start_date: String,
    pub start_date_local: String,
    pub distance_meters: f64,
    pub moving_time_seconds: f64,
    pub total_elevation_gain_meters: f64,
    pub active_calories: f64,
    pub step_count: Option<i64>,
}

impl From<&ActivityRecord> for ActivitySummary {
    fn from(a: &ActivityRecord) -> Self {
        Self {
            id: a.id.clone(),
            activity_type: a.activity_type,
            workout_source: a.workout_source(),
            start_date: format_utc_rfc3339(a.start_date),
            start_date_local: format_local(a.start_date_local),
            distance_meters: a.distance_meters,
            moving_time_seconds: a.moving_time_seconds,
            total_elevation_gain_meters: a.total_elevation_gain_meters,
            active_calories: a.active_calories,
            step_count: a.step_count,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitiesResponse {
    pub activities: Vec<ActivitySummary>,
    pub limit: u32,
    pub offset: u32,
    /// Number of activities matching the filter, before paging.
    pub total: u32,
}

/// Page through the current timeline snapshot, newest first.
async fn get_activities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActivitiesQuery>,
) -> Result<Json<ActivitiesResponse>> {
    params
        .validate()
        .map_err(|e| AppError::BadRequest(format!("Invalid paging parameters: {}", e)))?;

    let after = params
        .after
        .as_deref()
        .map(|raw| {
            parse_utc_rfc3339(raw).map_err(|_| {
                AppError::BadRequest("Invalid 'after' parameter: must be RFC3339 datetime".to_string())
            })
        })
        .transpose()?;

    let snapshot = state.aggregator.snapshot().await;

    // Newest first, so everything after the cutoff is a prefix.
    let matching = match after {
        Some(cutoff) => snapshot.partition_point(|a| a.start_date > cutoff),
        None => snapshot.len(),
    };

    let start = (params.offset as usize).min(matching);
    let end = start.saturating_add(params.limit.min(MAX_LIMIT) as usize).min(matching);

    Ok(Json(ActivitiesResponse {
        activities: snapshot[start..end].iter().map(ActivitySummary::from).collect(),
        limit: params.limit,
        offset: params.offset,
        total: matching as u32,
    }))
}

// ─── Totals ──────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TotalsResponse {
    pub total_distance_meters: f64,
    pub total_time_seconds: f64,
    pub distance_counted_through: Option<String>,
    pub time_counted_through: Option<String>,
}

async fn get_totals(State(state): State<Arc<AppState>>) -> Json<TotalsResponse> {
    let totals = state.aggregator.totals().await;
    Json(TotalsResponse {
        total_distance_meters: totals.distance.total,
        total_time_seconds: totals.time.total,
        distance_counted_through: totals.distance.last_refresh_date.map(format_local),
        time_counted_through: totals.time.last_refresh_date.map(format_local),
    })
}

// ─── Status / Refresh ────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StatusResponse {
    pub phase: TimelinePhase,
    pub activity_count: u32,
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        phase: state.aggregator.phase().await,
        activity_count: state.aggregator.snapshot().await.len() as u32,
    })
}

/// Run a full reload and report the reconciled size.
async fn refresh(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    tracing::info!("Manual refresh requested");
    let activities = state.aggregator.load_all().await;
    Json(StatusResponse {
        phase: state.aggregator.phase().await,
        activity_count: activities.len() as u32,
    })
}
