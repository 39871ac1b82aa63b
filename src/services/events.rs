// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Publish/subscribe notifications for timeline changes.
//!
//! Delivery is at-most-once: each subscriber owns a bounded channel and a
//! message is dropped for any subscriber whose channel is full or closed.
//! Nothing is replayed to late subscribers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use crate::models::ActivityRecord;

/// Notifications published by the aggregator.
#[derive(Debug, Clone)]
pub enum ActivityEvent {
    /// The reconciled timeline changed; carries the full current list.
    TimelineChanged { activities: Arc<Vec<ActivityRecord>> },
    /// One new activity arrived through a live update.
    ActivitySynced { activity: ActivityRecord },
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Topic {
    TimelineChanged,
    ActivitySynced,
}

impl Topic {
    pub fn from_event(event: &ActivityEvent) -> Self {
        match event {
            ActivityEvent::TimelineChanged { .. } => Topic::TimelineChanged,
            ActivityEvent::ActivitySynced { .. } => Topic::ActivitySynced,
        }
    }
}

type Subscriber = mpsc::Sender<ActivityEvent>;

/// Topic-based event bus. Clones share subscribers.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<RwLock<HashMap<Topic, Vec<Subscriber>>>>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub async fn subscribe(&self, topic: Topic) -> mpsc::Receiver<ActivityEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut subs = self.subscribers.write().await;
        subs.entry(topic).or_default().push(tx);
        rx
    }

    /// Deliver to current subscribers of the event's topic.
    ///
    /// Returns how many subscribers accepted the event.
    pub async fn publish(&self, event: ActivityEvent) -> usize {
        let topic = Topic::from_event(&event);
        let mut delivered = 0;
        let mut saw_closed = false;

        {
            let subs = self.subscribers.read().await;
            if let Some(subscribers) = subs.get(&topic) {
                for tx in subscribers {
                    match tx.try_send(event.clone()) {
                        Ok(()) => delivered += 1,
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            tracing::debug!(?topic, "Subscriber lagging, event dropped");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => saw_closed = true,
                    }
                }
            }
        }

        if saw_closed {
            let mut subs = self.subscribers.write().await;
            if let Some(subscribers) = subs.get_mut(&topic) {
                subscribers.retain(|tx| !tx.is_closed());
            }
        }

        delivered
    }

    pub async fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscribers
            .read()
            .await
            .get(&topic)
            .map_or(0, |subs| subs.len())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
