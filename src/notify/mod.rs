// Change notification fan-out

use crate::config::MAX_CAPACITY;
use crate::model::SystemEvent;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Payload pushed to every subscriber for each store mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub event_type: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(event_type: &str, data: Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            data,
            timestamp: Utc::now(),
        }
    }
}

impl From<&SystemEvent> for ChangeEvent {
    fn from(event: &SystemEvent) -> Self {
        Self {
            event_type: event.event_type.clone(),
            data: json!({
                "id": event.id,
                "source": event.source,
                "message": event.message,
                "severity": event.severity,
                "data": event.data,
            }),
            timestamp: event.timestamp,
        }
    }
}

struct Registry {
    subscribers: DashMap<u64, mpsc::Sender<ChangeEvent>>,
    next_id: AtomicU64,
    buffer: usize,
}

/// Publish/subscribe registry with one bounded channel per subscriber
///
/// Publishing never waits: a subscriber whose buffer is full, or whose
/// receiver was dropped, is removed from the registry.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<Registry>,
}

impl Notifier {
    /// Registry whose subscribers each buffer up to `buffer` events
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(Registry {
                subscribers: DashMap::new(),
                next_id: AtomicU64::new(1),
                buffer: buffer.clamp(1, MAX_CAPACITY),
            }),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.insert(id, tx);
        debug!(subscriber_id = id, "Change subscriber registered");
        Subscription { id, rx }
    }

    /// Drop a subscriber. False if it was already gone
    pub fn unsubscribe(&self, id: u64) -> bool {
        self.inner.subscribers.remove(&id).is_some()
    }

    /// Deliver a copy of `event` to every live subscriber
    pub fn publish(&self, event: &ChangeEvent) {
        let mut dropped = Vec::new();

        for entry in self.inner.subscribers.iter() {
            match entry.value().try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(subscriber_id = *entry.key(), "Subscriber lagging, disconnecting");
                    dropped.push(*entry.key());
                }
                Err(TrySendError::Closed(_)) => dropped.push(*entry.key()),
            }
        }

        // Removal happens after iteration so no shard lock is held twice
        for id in dropped {
            self.inner.subscribers.remove(&id);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

/// Receiving side of one subscription
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next change event; `None` once the subscriber has been dropped
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.rx.try_recv().ok()
    }
}
