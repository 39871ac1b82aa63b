// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP feed provider against a mock server.

use activity_sync::models::{ActivityType, SourceKind};
use activity_sync::providers::{HttpFeedProvider, ProviderAdapter, ProviderError};
use activity_sync::services::{AggregationCache, Aggregator, EventBus};
use activity_sync::db::MemoryStore;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

use common::{make_activity, test_options};

async fn mount_athlete(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path("/athlete"))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({"id": 1})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_no_token_is_unauthorized_without_request() {
    let server = MockServer::start().await;
    let provider = HttpFeedProvider::new("wahoo", server.uri(), None);

    assert!(!provider.is_authorized().await.unwrap());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_authorization_check_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/athlete"))
        .and(header("authorization", "Bearer good-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1})))
        .mount(&server)
        .await;

    let provider = HttpFeedProvider::new("garmin", server.uri(), Some("good-token".to_string()));
    assert!(provider.is_authorized().await.unwrap());
}

#[tokio::test]
async fn test_revoked_token_is_unauthorized() {
    let server = MockServer::start().await;
    mount_athlete(&server, 401).await;

    let provider = HttpFeedProvider::new("garmin", server.uri(), Some("revoked".to_string()));
    assert!(!provider.is_authorized().await.unwrap());
}

#[tokio::test]
async fn test_load_stamps_source_kind() {
    let server = MockServer::start().await;
    let mut record = make_activity("garmin_42", ActivityType::Run, 0, 5000.0, 20.0);
    record.source_kind = SourceKind::HealthStore;
    Mock::given(method("GET"))
        .and(path("/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![record]))
        .mount(&server)
        .await;

    let provider = HttpFeedProvider::new("garmin", format!("{}/", server.uri()), Some("t".to_string()));
    let loaded = provider.load().await.unwrap();

    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, "garmin_42");
    assert_eq!(loaded[0].source_kind, SourceKind::Garmin);
}

#[tokio::test]
async fn test_load_error_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/activities"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    let provider = HttpFeedProvider::new("wahoo", server.uri(), Some("t".to_string()));
    assert!(matches!(provider.load().await, Err(ProviderError::RateLimited)));

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/activities"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;
    let provider = HttpFeedProvider::new("wahoo", server.uri(), Some("t".to_string()));
    assert!(matches!(provider.load().await, Err(ProviderError::Unavailable(_))));

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[{\"nope\": true}]"))
        .mount(&server)
        .await;
    let provider = HttpFeedProvider::new("wahoo", server.uri(), Some("t".to_string()));
    assert!(matches!(provider.load().await, Err(ProviderError::Decode(_))));
}

#[tokio::test]
async fn test_stalled_feed_hits_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/activities"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(Vec::<serde_json::Value>::new())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let provider = HttpFeedProvider::new("garmin", server.uri(), Some("t".to_string()))
        .with_request_timeout(Duration::from_millis(100))
        .unwrap();

    assert!(matches!(provider.load().await, Err(ProviderError::Transport(_))));
}

#[tokio::test]
async fn test_rate_limited_provider_does_not_block_others() {
    let limited = MockServer::start().await;
    mount_athlete(&limited, 200).await;
    Mock::given(method("GET"))
        .and(path("/activities"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&limited)
        .await;

    let healthy = MockServer::start().await;
    mount_athlete(&healthy, 200).await;
    Mock::given(method("GET"))
        .and(path("/activities"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![make_activity("wahoo_1", ActivityType::Ride, 0, 40_000.0, 500.0)]),
        )
        .mount(&healthy)
        .await;

    let providers: Vec<Arc<dyn ProviderAdapter>> = vec![
        Arc::new(HttpFeedProvider::new("garmin", limited.uri(), Some("t".to_string()))),
        Arc::new(HttpFeedProvider::new("wahoo", healthy.uri(), Some("t".to_string()))),
    ];
    let cache = Arc::new(AggregationCache::new(Arc::new(MemoryStore::new()), 4));
    let aggregator = Aggregator::new(providers, cache, EventBus::default(), test_options());

    let timeline = aggregator.load_all().await;

    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].id, "wahoo_1");
    assert_eq!(timeline[0].source_kind, SourceKind::Wahoo);
}
