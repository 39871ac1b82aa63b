// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Generic JSON activity feed over HTTP.
//!
//! Handles:
//! - Authorization probe against `{base}/athlete`
//! - Bulk listing from `{base}/activities`
//! - Rate limit and credential error mapping
//! - Live updates through the shared [`PushRegistry`]

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;

use crate::models::{ActivityRecord, SourceKind};
use crate::providers::{empty_live_stream, LiveStream, ProviderAdapter, ProviderError, PushRegistry};

/// HTTP-backed provider adapter.
#[derive(Clone)]
pub struct HttpFeedProvider {
    http: reqwest::Client,
    name: String,
    base_url: String,
    access_token: Option<String>,
    source_kind: SourceKind,
    push: Option<PushRegistry>,
}

impl HttpFeedProvider {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, access_token: Option<String>) -> Self {
        let name = name.into();
        let source_kind = SourceKind::from_provider_name(&name);
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            name,
            access_token,
            source_kind,
            push: None,
        }
    }

    /// Bound every request, connect through body, by `timeout`.
    pub fn with_request_timeout(mut self, timeout: Duration) -> anyhow::Result<Self> {
        self.http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building provider HTTP client")?;
        Ok(self)
    }

    /// Receive live updates pushed into `registry` under this provider's name.
    pub fn with_push(mut self, registry: PushRegistry) -> Self {
        self.push = Some(registry);
        self
    }

    fn token(&self) -> Result<&str, ProviderError> {
        self.access_token
            .as_deref()
            .ok_or(ProviderError::Unauthorized)
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(self.token()?)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let response = self.check_response(response).await?;

        response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("JSON parse error: {}", e)))
    }

    /// Check response status and return error if not successful.
    async fn check_response(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            429 => {
                tracing::warn!(provider = %self.name, "Provider rate limit hit (429)");
                Err(ProviderError::RateLimited)
            }
            401 | 403 => Err(ProviderError::Unauthorized),
            _ if status.is_server_error() => {
                Err(ProviderError::Unavailable(format!("HTTP {}: {}", status, body)))
            }
            _ => Err(ProviderError::Transport(format!("HTTP {}: {}", status, body))),
        }
    }
}

#[async_trait]
impl ProviderAdapter for HttpFeedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_authorized(&self) -> Result<bool, ProviderError> {
        if self.access_token.is_none() {
            return Ok(false);
        }

        match self.get_json::<serde_json::Value>("athlete").await {
            Ok(_) => Ok(true),
            Err(ProviderError::Unauthorized) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn load(&self) -> Result<Vec<ActivityRecord>, ProviderError> {
        let mut activities: Vec<ActivityRecord> = self.get_json("activities").await?;
        for activity in &mut activities {
            activity.source_kind = self.source_kind;
        }
        tracing::debug!(provider = %self.name, count = activities.len(), "Loaded provider feed");
        Ok(activities)
    }

    fn live_updates(&self) -> LiveStream {
        let Some(registry) = &self.push else {
            return empty_live_stream();
        };

        let source_kind = self.source_kind;
        Box::pin(registry.register(&self.name).map(move |mut activity| {
            activity.source_kind = source_kind;
            activity
        }))
    }
}
