// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Two-tier aggregation cache for the reconciled timeline.
//!
//! - Memory tier: bounded LRU, no expiry, authoritative for the running process
//! - Durable tier: any [`KeyValueStore`], written in the background
//!
//! Durable writes are ordered by a generation counter so a slow, older write
//! can never overwrite a newer snapshot.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use lru::LruCache;
use tokio::task::JoinHandle;

use crate::db::{keys, KeyValueStore};
use crate::models::{ActivityRecord, CachedActivityRecord};
use crate::services::dedup::sort_newest_first;

type Snapshot = Arc<Vec<CachedActivityRecord>>;

/// Cache errors. None of these escape the cache; they are logged.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache read failed: {0}")]
    Read(String),

    #[error("Cache write failed: {0}")]
    Write(String),

    #[error("Malformed cached record: {0}")]
    MalformedRecord(String),
}

/// Memory + durable cache keyed by [`keys::ACTIVITIES`].
pub struct AggregationCache {
    memory: Mutex<LruCache<String, Snapshot>>,
    durable: Arc<dyn KeyValueStore>,
    generation: AtomicU64,
    persisted_generation: Arc<tokio::sync::Mutex<u64>>,
    last_write: Mutex<Option<JoinHandle<()>>>,
}

impl AggregationCache {
    /// `capacity` is the item ceiling of the memory tier (minimum 1).
    pub fn new(durable: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            memory: Mutex::new(LruCache::new(capacity)),
            durable,
            generation: AtomicU64::new(0),
            persisted_generation: Arc::new(tokio::sync::Mutex::new(0)),
            last_write: Mutex::new(None),
        }
    }

    /// Read the cached timeline. Misses and read failures both return `None`.
    pub async fn get(&self) -> Option<Vec<CachedActivityRecord>> {
        if let Some(hit) = self.memory_get() {
            return Some(hit.as_ref().clone());
        }

        match self.read_durable().await {
            Ok(Some(records)) => {
                let snapshot = Arc::new(records);
                self.memory_put(snapshot.clone());
                Some(snapshot.as_ref().clone())
            }
            Ok(None) => {
                tracing::debug!("Aggregation cache miss (cold start)");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Aggregation cache unreadable, treating as miss");
                None
            }
        }
    }

    /// Replace the cached timeline.
    ///
    /// The memory tier is updated before returning; the durable write runs in
    /// the background and only logs on failure.
    pub fn set(&self, records: Vec<CachedActivityRecord>) {
        let snapshot: Snapshot = Arc::new(records);
        self.memory_put(snapshot.clone());

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let durable = self.durable.clone();
        let persisted = self.persisted_generation.clone();

        let handle = tokio::spawn(async move {
            let mut last = persisted.lock().await;
            if *last >= generation {
                tracing::debug!(generation, "Skipping superseded cache write");
                return;
            }

            let outcome = match serde_json::to_vec(snapshot.as_ref()) {
                Ok(bytes) => durable
                    .set(keys::ACTIVITIES, bytes)
                    .await
                    .map_err(|e| CacheError::Write(e.to_string())),
                Err(e) => Err(CacheError::Write(e.to_string())),
            };

            match outcome {
                Ok(()) => {
                    *last = generation;
                    tracing::debug!(generation, count = snapshot.len(), "Timeline persisted");
                }
                Err(e) => tracing::error!(error = %e, generation, "Failed to persist timeline"),
            }
        });

        if let Ok(mut slot) = self.last_write.lock() {
            *slot = Some(handle);
        }
    }

    /// Convenience wrapper projecting live records into the cached form.
    pub fn set_activities(&self, activities: &[ActivityRecord]) {
        self.set(activities.iter().map(CachedActivityRecord::from).collect());
    }

    /// Wait for the most recent durable write to finish.
    pub async fn flush(&self) {
        let handle = self.last_write.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Cache write task failed");
            }
        }
    }

    /// Decode the cached timeline for a cold start.
    ///
    /// Records that fail to decode are dropped individually. Step-count
    /// records are removed when `show_step_count` is false.
    pub async fn load_seed(&self, show_step_count: bool) -> Vec<ActivityRecord> {
        let Some(cached) = self.get().await else {
            return Vec::new();
        };

        let mut activities: Vec<ActivityRecord> = cached
            .into_iter()
            .filter_map(|record| match ActivityRecord::try_from(record) {
                Ok(activity) => Some(activity),
                Err(e) => {
                    tracing::debug!(error = %e, "Dropping malformed cached record");
                    None
                }
            })
            .filter(|a| show_step_count || !a.is_step_count())
            .collect();

        sort_newest_first(&mut activities);
        activities
    }

    fn memory_get(&self) -> Option<Snapshot> {
        self.memory
            .lock()
            .ok()
            .and_then(|mut lru| lru.get(keys::ACTIVITIES).cloned())
    }

    fn memory_put(&self, snapshot: Snapshot) {
        if let Ok(mut lru) = self.memory.lock() {
            lru.put(keys::ACTIVITIES.to_string(), snapshot);
        }
    }

    /// Read and decode the durable tier, skipping entries that are not
    /// valid cached records.
    async fn read_durable(&self) -> Result<Option<Vec<CachedActivityRecord>>, CacheError> {
        let bytes = self
            .durable
            .get(keys::ACTIVITIES)
            .await
            .map_err(|e| CacheError::Read(e.to_string()))?;
        let Some(bytes) = bytes else {
            return Ok(None);
        };

        let entries: Vec<serde_json::Value> =
            serde_json::from_slice(&bytes).map_err(|e| CacheError::Read(e.to_string()))?;

        let records = entries
            .into_iter()
            .filter_map(|entry| {
                serde_json::from_value::<CachedActivityRecord>(entry)
                    .map_err(|e| CacheError::MalformedRecord(e.to_string()))
                    .inspect_err(|e| tracing::debug!(error = %e, "Skipping cached entry"))
                    .ok()
            })
            .collect();

        Ok(Some(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{ActivityType, SourceKind};
    use chrono::{Duration, TimeZone, Utc};

    fn make(id: &str, ty: ActivityType, hour: u32) -> ActivityRecord {
        let start = Utc.with_ymd_and_hms(2024, 2, 1, hour, 0, 0).unwrap();
        ActivityRecord {
            id: id.to_string(),
            activity_type: ty,
            distance_meters: 1000.0,
            moving_time_seconds: 600.0,
            total_elevation_gain_meters: 0.0,
            active_calories: 50.0,
            step_count: None,
            start_date: start,
            end_date: start + Duration::minutes(10),
            start_date_local: start.naive_utc(),
            end_date_local: (start + Duration::minutes(10)).naive_utc(),
            source_bundle_id: None,
            source_kind: SourceKind::Garmin,
        }
    }

    #[tokio::test]
    async fn test_cold_start_miss() {
        let cache = AggregationCache::new(Arc::new(MemoryStore::new()), 4);
        assert!(cache.get().await.is_none());
        assert!(cache.load_seed(true).await.is_empty());
    }

    #[tokio::test]
    async fn test_set_is_visible_immediately_and_persists() {
        let store = MemoryStore::new();
        let cache = AggregationCache::new(Arc::new(store.clone()), 4);

        cache.set_activities(&[make("garmin_1", ActivityType::Run, 8)]);
        assert_eq!(cache.get().await.map(|v| v.len()), Some(1));

        cache.flush().await;
        assert!(store.contains(keys::ACTIVITIES));

        // A fresh cache over the same store reads it back
        let reopened = AggregationCache::new(Arc::new(store), 4);
        let seed = reopened.load_seed(true).await;
        assert_eq!(seed.len(), 1);
        assert!(seed[0].is_cached());
    }

    #[tokio::test]
    async fn test_write_failure_keeps_memory_tier() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        let cache = AggregationCache::new(Arc::new(store.clone()), 4);

        cache.set_activities(&[make("garmin_1", ActivityType::Run, 8)]);
        cache.flush().await;

        assert!(!store.contains(keys::ACTIVITIES));
        assert_eq!(cache.get().await.map(|v| v.len()), Some(1));
    }

    #[tokio::test]
    async fn test_garbage_blob_is_a_miss() {
        let store = MemoryStore::new();
        store.insert_raw(keys::ACTIVITIES, b"not json".to_vec());
        let cache = AggregationCache::new(Arc::new(store), 4);
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn test_seed_hides_step_counts_and_sorts() {
        let cache = AggregationCache::new(Arc::new(MemoryStore::new()), 4);
        cache.set_activities(&[
            make("hk_steps", ActivityType::StepCount, 23),
            make("garmin_1", ActivityType::Run, 6),
            make("garmin_2", ActivityType::Run, 18),
        ]);

        let hidden = cache.load_seed(false).await;
        let ids: Vec<&str> = hidden.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["garmin_2", "garmin_1"]);

        let shown = cache.load_seed(true).await;
        assert_eq!(shown.len(), 3);
        assert_eq!(shown[0].id, "hk_steps");
    }

    #[tokio::test]
    async fn test_latest_write_wins_on_disk() {
        let store = MemoryStore::new();
        let cache = AggregationCache::new(Arc::new(store.clone()), 4);

        cache.set_activities(&[make("garmin_1", ActivityType::Run, 6)]);
        cache.set_activities(&[
            make("garmin_1", ActivityType::Run, 6),
            make("garmin_2", ActivityType::Run, 7),
        ]);
        cache.flush().await;

        let reopened = AggregationCache::new(Arc::new(store), 4);
        assert_eq!(reopened.load_seed(true).await.len(), 2);
    }
}
