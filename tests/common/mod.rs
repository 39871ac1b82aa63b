// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use activity_sync::config::Config;
use activity_sync::db::MemoryStore;
use activity_sync::models::{ActivityRecord, ActivityType, SourceKind};
use activity_sync::providers::{empty_live_stream, LiveStream, ProviderAdapter, ProviderError, PushRegistry};
use activity_sync::routes::create_router;
use activity_sync::services::{AggregationCache, Aggregator, AggregatorOptions, EventBus};
use activity_sync::AppState;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

/// Fixed reference instant all test records are offset from.
#[allow(dead_code)]
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Build a record starting `offset_secs` after [`base_time`].
///
/// The source kind follows the id prefix (`garmin_`, `wahoo_`, else health store).
#[allow(dead_code)]
pub fn make_activity(
    id: &str,
    activity_type: ActivityType,
    offset_secs: i64,
    distance: f64,
    elevation: f64,
) -> ActivityRecord {
    let start = base_time() + Duration::seconds(offset_secs);
    let end = start + Duration::minutes(30);
    let source_kind = SourceKind::from_provider_name(id.split('_').next().unwrap_or(""));
    ActivityRecord {
        id: id.to_string(),
        activity_type,
        distance_meters: distance,
        moving_time_seconds: 1800.0,
        total_elevation_gain_meters: elevation,
        active_calories: 300.0,
        step_count: None,
        start_date: start,
        end_date: end,
        start_date_local: start.naive_utc(),
        end_date_local: end.naive_utc(),
        source_bundle_id: None,
        source_kind,
    }
}

/// Daily step total record.
#[allow(dead_code)]
pub fn make_step_count(id: &str, offset_secs: i64, steps: i64) -> ActivityRecord {
    let mut record = make_activity(id, ActivityType::StepCount, offset_secs, 0.0, 0.0);
    record.step_count = Some(steps);
    record.moving_time_seconds = 0.0;
    record
}

#[allow(dead_code)]
#[derive(Clone, Copy, PartialEq)]
pub enum MockBehavior {
    Ok,
    Unauthorized,
    FailLoad,
    /// Authorization check never answers in time.
    Hang,
    /// Authorized, but the bulk load never finishes.
    HangLoad,
    Panic,
}

/// In-memory provider with scripted behavior.
#[allow(dead_code)]
pub struct MockProvider {
    name: String,
    records: Mutex<Vec<ActivityRecord>>,
    behavior: MockBehavior,
    live: Mutex<Option<mpsc::Receiver<ActivityRecord>>>,
    /// One gate per upcoming `load()`, consumed in call order.
    gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    loads_started: AtomicUsize,
}

#[allow(dead_code)]
impl MockProvider {
    pub fn new(name: &str, records: Vec<ActivityRecord>) -> Self {
        Self::with_behavior(name, records, MockBehavior::Ok)
    }

    pub fn with_behavior(name: &str, records: Vec<ActivityRecord>, behavior: MockBehavior) -> Self {
        Self {
            name: name.to_string(),
            records: Mutex::new(records),
            behavior,
            live: Mutex::new(None),
            gates: Mutex::new(VecDeque::new()),
            loads_started: AtomicUsize::new(0),
        }
    }

    /// Attach a live channel; returns the sending side.
    pub fn with_live(self) -> (Self, mpsc::Sender<ActivityRecord>) {
        let (tx, rx) = mpsc::channel(16);
        *self.live.lock().unwrap() = Some(rx);
        (self, tx)
    }

    /// Make the next `load()` wait, after reading its records, until the
    /// returned sender fires or is dropped.
    pub fn gate_next_load(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push_back(rx);
        tx
    }

    /// Number of `load()` calls that have read their records.
    pub fn loads_started(&self) -> usize {
        self.loads_started.load(Ordering::SeqCst)
    }

    /// Replace what the next `load()` returns.
    pub fn set_records(&self, records: Vec<ActivityRecord>) {
        *self.records.lock().unwrap() = records;
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_authorized(&self) -> Result<bool, ProviderError> {
        match self.behavior {
            MockBehavior::Unauthorized => Ok(false),
            MockBehavior::Hang => {
                tokio::time::sleep(StdDuration::from_secs(3600)).await;
                Ok(true)
            }
            _ => Ok(true),
        }
    }

    async fn load(&self) -> Result<Vec<ActivityRecord>, ProviderError> {
        match self.behavior {
            MockBehavior::FailLoad => Err(ProviderError::Unavailable("scripted failure".to_string())),
            MockBehavior::Panic => panic!("scripted provider panic"),
            MockBehavior::HangLoad => {
                tokio::time::sleep(StdDuration::from_secs(3600)).await;
                Ok(Vec::new())
            }
            _ => {
                let records = self.records.lock().unwrap().clone();
                let gate = self.gates.lock().unwrap().pop_front();
                self.loads_started.fetch_add(1, Ordering::SeqCst);
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                Ok(records)
            }
        }
    }

    fn live_updates(&self) -> LiveStream {
        match self.live.lock().unwrap().take() {
            Some(rx) => Box::pin(ReceiverStream::new(rx)),
            None => empty_live_stream(),
        }
    }
}

/// Options with short timeouts so hung providers resolve fast.
#[allow(dead_code)]
pub fn test_options() -> AggregatorOptions {
    AggregatorOptions {
        authorization_timeout: StdDuration::from_millis(200),
        load_timeout: StdDuration::from_millis(300),
        ..AggregatorOptions::default()
    }
}

/// Aggregator over the given providers with an in-memory durable tier.
#[allow(dead_code)]
pub fn test_aggregator(
    providers: Vec<Arc<dyn ProviderAdapter>>,
    options: AggregatorOptions,
) -> (Arc<Aggregator>, MemoryStore) {
    let store = MemoryStore::new();
    let cache = Arc::new(AggregationCache::new(Arc::new(store.clone()), 4));
    let aggregator = Aggregator::new(providers, cache, EventBus::default(), options);
    (Arc::new(aggregator), store)
}

/// Create a test app with no providers.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Vec::new(), PushRegistry::new())
}

/// Create a test app over the given providers.
#[allow(dead_code)]
pub fn create_test_app_with(
    providers: Vec<Arc<dyn ProviderAdapter>>,
    push: PushRegistry,
) -> (axum::Router, Arc<AppState>) {
    let (aggregator, _store) = test_aggregator(providers, test_options());

    let state = Arc::new(AppState {
        config: Config::default(),
        aggregator,
        push,
    });

    (create_router(state.clone()), state)
}

/// Poll until `check` holds or a second passes.
#[allow(dead_code)]
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    false
}
