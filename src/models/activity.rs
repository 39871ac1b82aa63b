// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Canonical activity record shared by every provider.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Canonical activity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Run,
    TrailRun,
    TreadmillRun,
    VirtualRun,
    Walk,
    Hike,
    IndoorWalk,
    Ride,
    VirtualRide,
    MountainBikeRide,
    GravelRide,
    EBikeRide,
    Swim,
    OpenWaterSwim,
    Rowing,
    Yoga,
    Workout,
    /// Daily step total from the on-device health store.
    StepCount,
    #[serde(other)]
    Other,
}

const RUNNING: &[ActivityType] = &[
    ActivityType::Run,
    ActivityType::TrailRun,
    ActivityType::TreadmillRun,
    ActivityType::VirtualRun,
];

const WALKING: &[ActivityType] = &[
    ActivityType::Walk,
    ActivityType::Hike,
    ActivityType::IndoorWalk,
];

const CYCLING: &[ActivityType] = &[
    ActivityType::Ride,
    ActivityType::VirtualRide,
    ActivityType::MountainBikeRide,
    ActivityType::GravelRide,
    ActivityType::EBikeRide,
];

const SWIMMING: &[ActivityType] = &[ActivityType::Swim, ActivityType::OpenWaterSwim];

impl ActivityType {
    /// Types that count toward the same goal as this one (always includes itself).
    pub fn matching_goal_activity_types(self) -> &'static [ActivityType] {
        [RUNNING, WALKING, CYCLING, SWIMMING]
            .into_iter()
            .find(|group| group.contains(&self))
            .unwrap_or(match self {
                ActivityType::Rowing => &[ActivityType::Rowing],
                ActivityType::Yoga => &[ActivityType::Yoga],
                ActivityType::Workout => &[ActivityType::Workout],
                ActivityType::StepCount => &[ActivityType::StepCount],
                _ => &[ActivityType::Other],
            })
    }

    /// True when both types are equal or each lists the other as a goal match.
    pub fn matches(self, other: ActivityType) -> bool {
        self == other
            || (self.matching_goal_activity_types().contains(&other)
                && other.matching_goal_activity_types().contains(&self))
    }

    /// Stable snake_case code used in the cached form.
    pub fn as_code(self) -> &'static str {
        match self {
            ActivityType::Run => "run",
            ActivityType::TrailRun => "trail_run",
            ActivityType::TreadmillRun => "treadmill_run",
            ActivityType::VirtualRun => "virtual_run",
            ActivityType::Walk => "walk",
            ActivityType::Hike => "hike",
            ActivityType::IndoorWalk => "indoor_walk",
            ActivityType::Ride => "ride",
            ActivityType::VirtualRide => "virtual_ride",
            ActivityType::MountainBikeRide => "mountain_bike_ride",
            ActivityType::GravelRide => "gravel_ride",
            ActivityType::EBikeRide => "e_bike_ride",
            ActivityType::Swim => "swim",
            ActivityType::OpenWaterSwim => "open_water_swim",
            ActivityType::Rowing => "rowing",
            ActivityType::Yoga => "yoga",
            ActivityType::Workout => "workout",
            ActivityType::StepCount => "step_count",
            ActivityType::Other => "other",
        }
    }

    /// Parse a code produced by [`ActivityType::as_code`].
    pub fn from_code(code: &str) -> Option<Self> {
        let parsed = match code {
            "run" => ActivityType::Run,
            "trail_run" => ActivityType::TrailRun,
            "treadmill_run" => ActivityType::TreadmillRun,
            "virtual_run" => ActivityType::VirtualRun,
            "walk" => ActivityType::Walk,
            "hike" => ActivityType::Hike,
            "indoor_walk" => ActivityType::IndoorWalk,
            "ride" => ActivityType::Ride,
            "virtual_ride" => ActivityType::VirtualRide,
            "mountain_bike_ride" => ActivityType::MountainBikeRide,
            "gravel_ride" => ActivityType::GravelRide,
            "e_bike_ride" => ActivityType::EBikeRide,
            "swim" => ActivityType::Swim,
            "open_water_swim" => ActivityType::OpenWaterSwim,
            "rowing" => ActivityType::Rowing,
            "yoga" => ActivityType::Yoga,
            "workout" => ActivityType::Workout,
            "step_count" => ActivityType::StepCount,
            "other" => ActivityType::Other,
            _ => return None,
        };
        Some(parsed)
    }
}

/// Which adapter produced a record value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    HealthStore,
    Garmin,
    Wahoo,
    /// Restored from the aggregation cache snapshot.
    Cache,
}

impl SourceKind {
    /// Map a configured provider name onto a source kind.
    pub fn from_provider_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "garmin" => SourceKind::Garmin,
            "wahoo" => SourceKind::Wahoo,
            _ => SourceKind::HealthStore,
        }
    }
}

/// Vendor that originally recorded the workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "snake_case")]
pub enum WorkoutSource {
    Garmin,
    Wahoo,
    HealthStore,
    Other,
}

/// One workout or step-count entry from any provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// `<providerPrefix>_<providerNativeID>`
    pub id: String,
    pub activity_type: ActivityType,
    #[serde(default)]
    pub distance_meters: f64,
    #[serde(default)]
    pub moving_time_seconds: f64,
    #[serde(default)]
    pub total_elevation_gain_meters: f64,
    #[serde(default)]
    pub active_calories: f64,
    #[serde(default)]
    pub step_count: Option<i64>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Wall clock at the activity location.
    pub start_date_local: NaiveDateTime,
    pub end_date_local: NaiveDateTime,
    #[serde(default)]
    pub source_bundle_id: Option<String>,
    #[serde(default)]
    pub source_kind: SourceKind,
}

impl ActivityRecord {
    pub fn is_step_count(&self) -> bool {
        self.activity_type == ActivityType::StepCount
    }

    pub fn is_cached(&self) -> bool {
        self.source_kind == SourceKind::Cache
    }

    /// Integration name: the id prefix before the first `_`.
    pub fn integration(&self) -> &str {
        self.id.split_once('_').map_or(&self.id, |(prefix, _)| prefix)
    }

    /// Resolve the originating vendor from the bundle id, the id prefix,
    /// and finally the adapter that produced the record.
    pub fn workout_source(&self) -> WorkoutSource {
        if let Some(bundle) = self.source_bundle_id.as_deref() {
            let bundle = bundle.to_ascii_lowercase();
            if bundle.contains("garmin") {
                return WorkoutSource::Garmin;
            }
            if bundle.contains("wahoo") {
                return WorkoutSource::Wahoo;
            }
        }

        match self.integration().to_ascii_lowercase().as_str() {
            "garmin" => return WorkoutSource::Garmin,
            "wahoo" => return WorkoutSource::Wahoo,
            "hk" | "healthkit" | "health" => return WorkoutSource::HealthStore,
            _ => {}
        }

        match self.source_kind {
            SourceKind::Garmin => WorkoutSource::Garmin,
            SourceKind::Wahoo => WorkoutSource::Wahoo,
            SourceKind::HealthStore => WorkoutSource::HealthStore,
            SourceKind::Cache => WorkoutSource::Other,
        }
    }
}
