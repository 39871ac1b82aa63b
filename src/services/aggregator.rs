// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity aggregation service.
//!
//! Handles the core workflow:
//! 1. Fetch every provider concurrently (failures become empty results)
//! 2. Deduplicate the combined list into the reconciled timeline
//! 3. Commit the timeline in one step (last writer wins)
//! 4. Fold the new timeline into the running totals
//! 5. Write through to the aggregation cache and notify subscribers
//!
//! Live updates bypass the windowed dedup: a record is inserted only when
//! its id is not already on the timeline.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{ActivityRecord, ActivityTotals};
use crate::providers::ProviderAdapter;
use crate::services::cache::AggregationCache;
use crate::services::dedup::{deduplicate_with, DedupConfig};
use crate::services::events::{ActivityEvent, EventBus};

/// Readiness of the reconciled timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "snake_case")]
pub enum TimelinePhase {
    Uninitialized,
    Loading,
    Ready,
}

/// Tunables for the aggregator.
#[derive(Debug, Clone)]
pub struct AggregatorOptions {
    /// Visibility preference for step-count records.
    pub show_step_count: bool,
    /// Upper bound on each provider's authorization check.
    pub authorization_timeout: Duration,
    /// Upper bound on each provider's bulk load.
    pub load_timeout: Duration,
    pub dedup: DedupConfig,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            show_step_count: true,
            authorization_timeout: Duration::from_secs(10),
            load_timeout: Duration::from_secs(60),
            dedup: DedupConfig::default(),
        }
    }
}

/// What happened to a live update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveOutcome {
    Inserted,
    /// Same id already on the timeline.
    Duplicate,
    /// Step-count record while step counts are hidden.
    Hidden,
    /// Timeline not ready yet; applied after the next commit.
    Deferred,
}

struct TimelineState {
    phase: TimelinePhase,
    activities: Arc<Vec<ActivityRecord>>,
    totals: ActivityTotals,
    /// Set once a full load has committed; cache seeding stops after that.
    loaded: bool,
    pending: Vec<ActivityRecord>,
}

/// Owns the reconciled timeline.
pub struct Aggregator {
    providers: Vec<Arc<dyn ProviderAdapter>>,
    step_count_feed: Option<Arc<dyn ProviderAdapter>>,
    cache: Arc<AggregationCache>,
    bus: EventBus,
    options: AggregatorOptions,
    state: RwLock<TimelineState>,
    /// Serializes every mutation of `state`.
    commit_lock: Mutex<()>,
}

impl Aggregator {
    pub fn new(
        providers: Vec<Arc<dyn ProviderAdapter>>,
        cache: Arc<AggregationCache>,
        bus: EventBus,
        options: AggregatorOptions,
    ) -> Self {
        Self {
            providers,
            step_count_feed: None,
            cache,
            bus,
            options,
            state: RwLock::new(TimelineState {
                phase: TimelinePhase::Uninitialized,
                activities: Arc::new(Vec::new()),
                totals: ActivityTotals::default(),
                loaded: false,
                pending: Vec::new(),
            }),
            commit_lock: Mutex::new(()),
        }
    }

    /// Add the on-device step-count feed, fetched alongside the providers.
    pub fn with_step_count_feed(mut self, feed: Arc<dyn ProviderAdapter>) -> Self {
        self.step_count_feed = Some(feed);
        self
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn options(&self) -> &AggregatorOptions {
        &self.options
    }

    /// Current committed timeline, newest first.
    pub async fn snapshot(&self) -> Arc<Vec<ActivityRecord>> {
        self.state.read().await.activities.clone()
    }

    pub async fn phase(&self) -> TimelinePhase {
        self.state.read().await.phase
    }

    pub async fn totals(&self) -> ActivityTotals {
        self.state.read().await.totals.clone()
    }

    /// Seed the timeline from the cache before the first load completes.
    ///
    /// Returns the number of seeded records (0 once a load has committed).
    pub async fn seed_from_cache(&self) -> usize {
        let seed = self.cache.load_seed(self.options.show_step_count).await;

        let _guard = self.commit_lock.lock().await;
        let mut state = self.state.write().await;
        if state.loaded || seed.is_empty() {
            return 0;
        }

        state.totals.update(&seed);
        let count = seed.len();
        state.activities = Arc::new(seed);
        tracing::info!(count, "Seeded timeline from cache");
        count
    }

    /// Fetch every provider, reconcile, and commit the result.
    ///
    /// Never fails: a provider that errors, panics, or exceeds its
    /// authorization or load timeout contributes nothing.
    pub async fn load_all(&self) -> Arc<Vec<ActivityRecord>> {
        {
            let _guard = self.commit_lock.lock().await;
            self.state.write().await.phase = TimelinePhase::Loading;
        }

        let mut sources: Vec<Arc<dyn ProviderAdapter>> = self.providers.clone();
        if self.options.show_step_count {
            sources.extend(self.step_count_feed.clone());
        }

        let timeouts = (self.options.authorization_timeout, self.options.load_timeout);
        let handles: Vec<(String, JoinHandle<Vec<ActivityRecord>>)> = sources
            .into_iter()
            .map(|provider| {
                let name = provider.name().to_string();
                (name, tokio::spawn(fetch_provider(provider, timeouts)))
            })
            .collect();

        let (names, tasks): (Vec<String>, Vec<_>) = handles.into_iter().unzip();
        let mut combined = Vec::new();
        for (name, result) in names.into_iter().zip(join_all(tasks).await) {
            match result {
                Ok(records) => combined.extend(records),
                Err(e) => tracing::error!(provider = %name, error = %e, "Provider task failed"),
            }
        }

        let fetched = combined.len();
        let mut reconciled = deduplicate_with(combined, &self.options.dedup);
        if !self.options.show_step_count {
            reconciled.retain(|a| !a.is_step_count());
        }

        tracing::info!(fetched, kept = reconciled.len(), "Reconciled provider activities");

        self.commit(reconciled).await
    }

    async fn commit(&self, reconciled: Vec<ActivityRecord>) -> Arc<Vec<ActivityRecord>> {
        let _guard = self.commit_lock.lock().await;

        let (activities, synced) = {
            let mut state = self.state.write().await;
            state.activities = Arc::new(reconciled);
            state.phase = TimelinePhase::Ready;
            state.loaded = true;

            let pending = std::mem::take(&mut state.pending);
            let synced: Vec<ActivityRecord> = pending
                .into_iter()
                .filter(|activity| insert_if_absent(&mut state, activity.clone()))
                .collect();

            let activities = state.activities.clone();
            state.totals.update(&activities);
            (activities, synced)
        };

        self.cache.set_activities(&activities);
        for activity in synced {
            self.bus.publish(ActivityEvent::ActivitySynced { activity }).await;
        }
        self.bus
            .publish(ActivityEvent::TimelineChanged {
                activities: activities.clone(),
            })
            .await;

        activities
    }

    /// Fold one live update into the timeline.
    pub async fn apply_live_event(&self, activity: ActivityRecord) -> LiveOutcome {
        if activity.is_step_count() && !self.options.show_step_count {
            return LiveOutcome::Hidden;
        }

        let _guard = self.commit_lock.lock().await;

        let activities = {
            let mut state = self.state.write().await;
            if state.phase != TimelinePhase::Ready {
                if !state.pending.iter().any(|p| p.id == activity.id) {
                    state.pending.push(activity);
                }
                return LiveOutcome::Deferred;
            }

            if !insert_if_absent(&mut state, activity.clone()) {
                tracing::debug!(id = %activity.id, "Live activity already on timeline");
                return LiveOutcome::Duplicate;
            }

            let activities = state.activities.clone();
            state.totals.update(&activities);
            activities
        };

        tracing::info!(id = %activity.id, "Live activity synced");

        self.cache.set_activities(&activities);
        self.bus.publish(ActivityEvent::ActivitySynced { activity }).await;
        self.bus
            .publish(ActivityEvent::TimelineChanged { activities })
            .await;

        LiveOutcome::Inserted
    }

    /// Remove a deleted activity's contribution from the running totals.
    pub async fn subtract_from_totals(&self, activity: &ActivityRecord) {
        let _guard = self.commit_lock.lock().await;
        self.state.write().await.totals.subtract(activity);
    }

    /// Start one listener task per provider live stream.
    pub fn spawn_live_listeners(self: &Arc<Self>) -> Vec<LiveSubscription> {
        let mut sources = self.providers.clone();
        if self.options.show_step_count {
            sources.extend(self.step_count_feed.clone());
        }

        sources
            .into_iter()
            .map(|provider| {
                let name = provider.name().to_string();
                let aggregator = Arc::clone(self);
                let task_name = name.clone();
                // Open the stream before spawning so pushes are accepted on return.
                let mut stream = provider.live_updates();
                let handle = tokio::spawn(async move {
                    while let Some(activity) = stream.next().await {
                        aggregator.apply_live_event(activity).await;
                    }
                    tracing::debug!(provider = %task_name, "Live stream ended");
                });
                LiveSubscription {
                    provider: name,
                    handle,
                }
            })
            .collect()
    }
}

/// Handle to one provider's live listener.
pub struct LiveSubscription {
    provider: String,
    handle: JoinHandle<()>,
}

impl LiveSubscription {
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Tear down this provider's listener only.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Insert keeping newest-first order. Returns false when the id exists.
fn insert_if_absent(state: &mut TimelineState, activity: ActivityRecord) -> bool {
    if state.activities.iter().any(|a| a.id == activity.id) {
        return false;
    }
    let activities = Arc::make_mut(&mut state.activities);
    let pos = activities.partition_point(|a| a.start_date > activity.start_date);
    activities.insert(pos, activity);
    true
}

/// Authorize and load one provider. Any failure yields no records.
async fn fetch_provider(
    provider: Arc<dyn ProviderAdapter>,
    (auth_timeout, load_timeout): (Duration, Duration),
) -> Vec<ActivityRecord> {
    let name = provider.name().to_string();

    match tokio::time::timeout(auth_timeout, provider.is_authorized()).await {
        Ok(Ok(true)) => {}
        Ok(Ok(false)) => {
            tracing::debug!(provider = %name, "Provider not authorized, skipping");
            return Vec::new();
        }
        Ok(Err(e)) => {
            tracing::warn!(provider = %name, error = %e, "Provider authorization check failed");
            return Vec::new();
        }
        Err(_) => {
            tracing::warn!(provider = %name, timeout_ms = auth_timeout.as_millis() as u64, "Provider authorization timed out");
            return Vec::new();
        }
    }

    match tokio::time::timeout(load_timeout, provider.load()).await {
        Ok(Ok(records)) => {
            tracing::debug!(provider = %name, count = records.len(), "Provider loaded");
            records
        }
        Ok(Err(e)) => {
            tracing::warn!(provider = %name, error = %e, "Provider load failed");
            Vec::new()
        }
        Err(_) => {
            tracing::warn!(provider = %name, timeout_ms = load_timeout.as_millis() as u64, "Provider load timed out");
            Vec::new()
        }
    }
}
