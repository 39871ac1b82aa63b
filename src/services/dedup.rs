// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cross-provider activity deduplication.
//!
//! Providers report the same workout under different ids (a Garmin ride is
//! usually mirrored into the health store too). After sorting by start time,
//! each record is compared against its neighbours within a fixed index window
//! and every group of matching records collapses to one winner:
//!
//! 1. a Garmin record
//! 2. a Wahoo record
//! 3. a record with both distance and elevation gain
//! 4. a record with distance
//! 5. a record with elevation gain
//! 6. the record being examined
//!
//! Step-count records never take part in matching.

use std::collections::HashSet;

use chrono::Duration;

use crate::models::{ActivityRecord, WorkoutSource};

/// Neighbours examined on each side of a record.
pub const DEFAULT_WINDOW_RADIUS: usize = 10;
/// Maximum start-time difference between duplicates.
pub const DEFAULT_TIME_TOLERANCE_SECS: i64 = 30;
/// Distance difference below which two records may be duplicates.
pub const DEFAULT_DISTANCE_TOLERANCE_METERS: f64 = 10.0;

/// Matching thresholds.
#[derive(Debug, Clone, Copy)]
pub struct DedupConfig {
    pub window_radius: usize,
    pub time_tolerance: Duration,
    pub distance_tolerance_meters: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window_radius: DEFAULT_WINDOW_RADIUS,
            time_tolerance: Duration::seconds(DEFAULT_TIME_TOLERANCE_SECS),
            distance_tolerance_meters: DEFAULT_DISTANCE_TOLERANCE_METERS,
        }
    }
}

impl DedupConfig {
    /// Whether `candidate` describes the same workout as `current`.
    fn is_match(&self, current: &ActivityRecord, candidate: &ActivityRecord) -> bool {
        !candidate.is_step_count()
            && current.activity_type.matches(candidate.activity_type)
            && (candidate.start_date - current.start_date).abs() <= self.time_tolerance
            && (candidate.distance_meters - current.distance_meters).abs()
                < self.distance_tolerance_meters
    }
}

/// Deduplicate with the default thresholds.
pub fn deduplicate(activities: Vec<ActivityRecord>) -> Vec<ActivityRecord> {
    deduplicate_with(activities, &DedupConfig::default())
}

/// Collapse duplicate workouts and return the survivors sorted by
/// `start_date`, newest first.
///
/// Records repeating an id already seen are dropped first, keeping the
/// earliest delivery, so every id appears at most once in the output.
pub fn deduplicate_with(
    activities: Vec<ActivityRecord>,
    config: &DedupConfig,
) -> Vec<ActivityRecord> {
    let mut activities = drop_repeated_ids(activities);
    sort_newest_first(&mut activities);

    // Parallel to the sorted list
    let mut removed = vec![false; activities.len()];

    for i in 0..activities.len() {
        let current = &activities[i];
        if removed[i] || current.is_step_count() {
            continue;
        }

        let lo = i.saturating_sub(config.window_radius);
        let hi = (i + config.window_radius).min(activities.len() - 1);

        let matches: Vec<usize> = (lo..=hi)
            .filter(|&j| !removed[j])
            .filter(|&j| config.is_match(current, &activities[j]))
            .collect();

        if matches.len() <= 1 {
            continue;
        }

        let winner = pick_winner(&activities, &matches, i);

        tracing::debug!(
            winner = %activities[winner].id,
            group_size = matches.len(),
            "Collapsed duplicate activities"
        );

        for &j in &matches {
            if j != winner {
                removed[j] = true;
            }
        }
    }

    let mut flags = removed.into_iter();
    activities.retain(|_| !flags.next().unwrap_or(false));
    activities
}

/// Keep the first record for each id.
fn drop_repeated_ids(activities: Vec<ActivityRecord>) -> Vec<ActivityRecord> {
    let total = activities.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(total);
    let unique: Vec<ActivityRecord> = activities
        .into_iter()
        .filter(|a| seen.insert(a.id.clone()))
        .collect();

    if unique.len() < total {
        tracing::debug!(dropped = total - unique.len(), "Dropped repeated activity ids");
    }
    unique
}

/// Stable sort by start date, descending.
pub fn sort_newest_first(activities: &mut [ActivityRecord]) {
    activities.sort_by(|a, b| b.start_date.cmp(&a.start_date));
}

/// Apply the source-priority rules to a match group.
///
/// `matches` is in sorted order, so `find` resolves ties to the first record.
fn pick_winner(activities: &[ActivityRecord], matches: &[usize], current: usize) -> usize {
    let first = |pred: &dyn Fn(&ActivityRecord) -> bool| {
        matches.iter().copied().find(|&j| pred(&activities[j]))
    };

    first(&|a| a.workout_source() == WorkoutSource::Garmin)
        .or_else(|| first(&|a| a.workout_source() == WorkoutSource::Wahoo))
        .or_else(|| first(&|a| a.distance_meters > 0.0 && a.total_elevation_gain_meters > 0.0))
        .or_else(|| first(&|a| a.distance_meters > 0.0))
        .or_else(|| first(&|a| a.total_elevation_gain_meters > 0.0))
        .unwrap_or(current)
}
