// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider adapters: the contract every activity source implements.
//!
//! The aggregator only depends on [`ProviderAdapter`]. Vendor specifics
//! (auth flows, API schemas) live behind it.

pub mod http;
pub mod push;

pub use http::HttpFeedProvider;
pub use push::{PushError, PushRegistry};

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::models::ActivityRecord;

/// Stream of newly observed activities from one provider.
pub type LiveStream = Pin<Box<dyn Stream<Item = ActivityRecord> + Send>>;

/// A stream that never yields, for providers without live updates.
pub fn empty_live_stream() -> LiveStream {
    Box::pin(tokio_stream::empty())
}

/// One activity source.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Short integration name, also used as the id prefix (e.g. "garmin").
    fn name(&self) -> &str;

    async fn is_authorized(&self) -> Result<bool, ProviderError>;

    /// Bulk load every activity the provider currently knows about.
    async fn load(&self) -> Result<Vec<ActivityRecord>, ProviderError>;

    /// Live updates. Providers without push support never yield.
    fn live_updates(&self) -> LiveStream {
        empty_live_stream()
    }
}

/// Per-provider fetch/authorization failures.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider rejected credentials")]
    Unauthorized,

    #[error("Provider rate limit exceeded")]
    RateLimited,

    #[error("Provider transport error: {0}")]
    Transport(String),

    #[error("Provider returned an undecodable payload: {0}")]
    Decode(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}
