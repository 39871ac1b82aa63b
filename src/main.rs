// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! activity-sync API Server
//!
//! Pulls workouts from every configured provider, reconciles duplicates
//! into one timeline, and serves it over HTTP.

use activity_sync::{
    config::Config,
    db::FileStore,
    providers::{HttpFeedProvider, ProviderAdapter, PushRegistry},
    services::{AggregationCache, Aggregator, EventBus},
    AppState,
};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().context("failed to load configuration")?;
    tracing::info!(
        port = config.port,
        providers = config.providers.len(),
        "Starting activity-sync API"
    );

    // Durable tier + bounded memory tier
    let store = FileStore::new(&config.cache_dir)
        .await
        .with_context(|| format!("failed to open cache directory {}", config.cache_dir.display()))?;
    tracing::info!(path = %config.cache_dir.display(), "Cache store opened");
    let cache = Arc::new(AggregationCache::new(
        Arc::new(store),
        config.memory_cache_capacity,
    ));

    let push = PushRegistry::new();
    let request_timeout = Duration::from_secs(config.load_timeout_secs);
    let providers = config
        .providers
        .iter()
        .map(|p| {
            let provider = HttpFeedProvider::new(&p.name, &p.feed_url, p.access_token.clone())
                .with_request_timeout(request_timeout)?
                .with_push(push.clone());
            Ok(Arc::new(provider) as Arc<dyn ProviderAdapter>)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut aggregator = Aggregator::new(
        providers,
        cache,
        EventBus::default(),
        config.aggregator_options(),
    );
    if let Some(feed) = &config.step_count_feed {
        tracing::info!(url = %feed.feed_url, "Step-count feed configured");
        let provider = HttpFeedProvider::new(&feed.name, &feed.feed_url, feed.access_token.clone())
            .with_request_timeout(request_timeout)?;
        aggregator = aggregator.with_step_count_feed(Arc::new(provider));
    }
    let aggregator = Arc::new(aggregator);

    // Serve the last known timeline while the first load runs
    let seeded = aggregator.seed_from_cache().await;
    tracing::info!(count = seeded, "Cold start seed applied");

    let subscriptions = aggregator.spawn_live_listeners();
    tracing::info!(count = subscriptions.len(), "Live listeners started");

    spawn_refresh_loop(aggregator.clone(), config.refresh_interval_secs);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        aggregator,
        push,
    });

    // Build router
    let app = activity_sync::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;

    for subscription in &subscriptions {
        subscription.cancel();
    }
    Ok(())
}

/// Initial load, then a full reload every `interval_secs` (0 = initial only).
fn spawn_refresh_loop(aggregator: Arc<Aggregator>, interval_secs: u64) {
    tokio::spawn(async move {
        if interval_secs == 0 {
            aggregator.load_all().await;
            return;
        }

        // First tick fires immediately
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let activities = aggregator.load_all().await;
            tracing::info!(count = activities.len(), "Scheduled refresh complete");
        }
    });
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("activity_sync=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
