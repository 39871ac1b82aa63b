// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Channels carrying pushed activities (webhooks) to provider live streams.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::models::ActivityRecord;
use crate::providers::LiveStream;

/// Buffered pushes per provider before senders see backpressure errors.
const PUSH_CHANNEL_CAPACITY: usize = 256;

/// Provider name → live channel. Clones share the same map.
#[derive(Clone, Default)]
pub struct PushRegistry {
    channels: Arc<DashMap<String, mpsc::Sender<ActivityRecord>>>,
}

impl PushRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the live channel for `provider`.
    ///
    /// Registering again replaces the previous channel, which ends the old
    /// stream.
    pub fn register(&self, provider: &str) -> LiveStream {
        let (tx, rx) = mpsc::channel(PUSH_CHANNEL_CAPACITY);
        if self.channels.insert(provider.to_string(), tx).is_some() {
            tracing::debug!(provider, "Replaced existing live channel");
        }
        Box::pin(ReceiverStream::new(rx))
    }

    pub fn is_registered(&self, provider: &str) -> bool {
        self.channels.contains_key(provider)
    }

    /// Deliver a pushed activity to the provider's live stream.
    pub fn push(&self, provider: &str, activity: ActivityRecord) -> Result<(), PushError> {
        let tx = self
            .channels
            .get(provider)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PushError::UnknownProvider(provider.to_string()))?;

        tx.try_send(activity).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PushError::Backlogged(provider.to_string()),
            mpsc::error::TrySendError::Closed(_) => {
                self.channels.remove(provider);
                PushError::ChannelClosed(provider.to_string())
            }
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("No live channel for provider {0}")]
    UnknownProvider(String),

    #[error("Live channel for provider {0} is full")]
    Backlogged(String),

    #[error("Live channel for provider {0} was closed")]
    ChannelClosed(String),
}
