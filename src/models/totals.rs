//! Running activity totals with incremental watermarks.
//!
//! Each total remembers the local start time up to which activities have
//! already been counted, so a refresh only sums activities newer than that
//! instead of rescanning the whole history.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::ActivityRecord;

/// A single additive total and its watermark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningTotal {
    pub total: f64,
    /// Activities starting at or before this local time are already counted.
    /// `None` means nothing has been counted yet.
    pub last_refresh_date: Option<NaiveDateTime>,
}

impl RunningTotal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting after the earliest known activity.
    #[cfg(test)]
    pub fn starting_at(earliest_start_local: NaiveDateTime) -> Self {
        Self {
            total: 0.0,
            last_refresh_date: Some(earliest_start_local + Duration::seconds(1)),
        }
    }

    /// Fold in activities newer than the watermark.
    ///
    /// Returns the amount added. An empty list leaves the watermark untouched.
    pub fn update<F>(&mut self, activities: &[ActivityRecord], metric: F) -> f64
    where
        F: Fn(&ActivityRecord) -> f64,
    {
        let Some(newest) = activities.iter().map(|a| a.start_date_local).max() else {
            return 0.0;
        };

        let added: f64 = activities
            .iter()
            .filter(|a| !a.is_step_count())
            .filter(|a| {
                self.last_refresh_date
                    .is_none_or(|watermark| a.start_date_local > watermark)
            })
            .map(metric)
            .sum();

        self.total += added;

        // Never move backwards, even when handed an older slice.
        let candidate = newest + Duration::seconds(1);
        self.last_refresh_date = Some(match self.last_refresh_date {
            Some(current) if current > candidate => current,
            _ => candidate,
        });

        added
    }

    /// Remove a previously counted contribution (deleted activity).
    pub fn subtract(&mut self, amount: f64) {
        self.total = (self.total - amount).max(0.0);
    }
}

/// Distance and moving-time totals, each with its own watermark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityTotals {
    /// Meters
    pub distance: RunningTotal,
    /// Seconds
    pub time: RunningTotal,
}

impl ActivityTotals {
    #[cfg(test)]
    pub fn starting_at(earliest_start_local: NaiveDateTime) -> Self {
        Self {
            distance: RunningTotal::starting_at(earliest_start_local),
            time: RunningTotal::starting_at(earliest_start_local),
        }
    }

    /// Update both totals from the reconciled timeline.
    pub fn update(&mut self, activities: &[ActivityRecord]) {
        self.distance.update(activities, |a| a.distance_meters);
        self.time.update(activities, |a| a.moving_time_seconds);
    }

    /// Back out an activity that was deleted after being counted.
    pub fn subtract(&mut self, activity: &ActivityRecord) {
        if activity.is_step_count() {
            return;
        }
        self.distance.subtract(activity.distance_meters);
        self.time.subtract(activity.moving_time_seconds);
    }
}
