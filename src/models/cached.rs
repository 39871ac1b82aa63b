// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Flattened activity snapshot stored in the aggregation cache.

use serde::{Deserialize, Serialize};

use crate::models::activity::{ActivityRecord, ActivityType, SourceKind};
use crate::time_utils::{format_local, format_utc_rfc3339, parse_local, parse_utc_rfc3339};

/// Cache-boundary projection of an [`ActivityRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedActivityRecord {
    pub id: String,
    /// Activity type code (e.g. "trail_run")
    pub activity_type: String,
    pub distance_meters: f64,
    pub moving_time_seconds: f64,
    pub total_elevation_gain_meters: f64,
    pub active_calories: f64,
    pub step_count: Option<i64>,
    /// RFC3339, UTC
    pub start_date: String,
    pub end_date: String,
    /// Local wall clock, `YYYY-MM-DDTHH:MM:SS`
    pub start_date_local: String,
    pub end_date_local: String,
    pub source_bundle_id: Option<String>,
}

impl From<&ActivityRecord> for CachedActivityRecord {
    fn from(record: &ActivityRecord) -> Self {
        Self {
            id: record.id.clone(),
            activity_type: record.activity_type.as_code().to_string(),
            distance_meters: record.distance_meters,
            moving_time_seconds: record.moving_time_seconds,
            total_elevation_gain_meters: record.total_elevation_gain_meters,
            active_calories: record.active_calories,
            step_count: record.step_count,
            start_date: format_utc_rfc3339(record.start_date),
            end_date: format_utc_rfc3339(record.end_date),
            start_date_local: format_local(record.start_date_local),
            end_date_local: format_local(record.end_date_local),
            source_bundle_id: record.source_bundle_id.clone(),
        }
    }
}

/// A cached record that could not be turned back into an activity.
#[derive(Debug, thiserror::Error)]
#[error("Malformed cached record {id}: {reason}")]
pub struct MalformedRecordError {
    pub id: String,
    pub reason: String,
}

impl TryFrom<CachedActivityRecord> for ActivityRecord {
    type Error = MalformedRecordError;

    fn try_from(cached: CachedActivityRecord) -> Result<Self, Self::Error> {
        let malformed = |reason: String| MalformedRecordError {
            id: cached.id.clone(),
            reason,
        };

        if cached.id.is_empty() {
            return Err(malformed("empty id".to_string()));
        }

        let activity_type = ActivityType::from_code(&cached.activity_type)
            .ok_or_else(|| malformed(format!("unknown activity type {}", cached.activity_type)))?;
        let start_date = parse_utc_rfc3339(&cached.start_date)
            .map_err(|e| malformed(format!("start_date: {}", e)))?;
        let end_date = parse_utc_rfc3339(&cached.end_date)
            .map_err(|e| malformed(format!("end_date: {}", e)))?;
        let start_date_local = parse_local(&cached.start_date_local)
            .map_err(|e| malformed(format!("start_date_local: {}", e)))?;
        let end_date_local = parse_local(&cached.end_date_local)
            .map_err(|e| malformed(format!("end_date_local: {}", e)))?;

        Ok(ActivityRecord {
            id: cached.id,
            activity_type,
            distance_meters: cached.distance_meters,
            moving_time_seconds: cached.moving_time_seconds,
            total_elevation_gain_meters: cached.total_elevation_gain_meters,
            active_calories: cached.active_calories,
            step_count: cached.step_count,
            start_date,
            end_date,
            start_date_local,
            end_date_local,
            source_bundle_id: cached.source_bundle_id,
            source_kind: SourceKind::Cache,
        })
    }
}
