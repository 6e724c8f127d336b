//! Per-key event fan-out.

use crate::event::Event;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

type Sink<K, D> = mpsc::Sender<Arc<Event<K, D>>>;

/// A map from key to subscriber sinks, with non-blocking delivery.
///
/// Subscribe and unsubscribe take the write lock; publish holds the read
/// lock only long enough to snapshot the subscriber list. Delivery uses
/// `try_send`: a full or closed sink drops that one delivery. The event
/// manager's buffer is the replay source for anything dropped here.
pub struct EventBus<K, D> {
    subscribers: RwLock<HashMap<K, Vec<Sink<K, D>>>>,
}

impl<K, D> EventBus<K, D>
where
    K: Eq + Hash + Clone + Debug,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register `sink` for events keyed by `key`.
    pub fn subscribe(&self, key: K, sink: Sink<K, D>) {
        let mut subscribers = self.subscribers.write();
        subscribers.entry(key).or_default().push(sink);
    }

    /// Remove `sink` from `key`, matching by channel identity. The map
    /// entry is dropped when the last sink for the key goes.
    pub fn unsubscribe(&self, key: &K, sink: &Sink<K, D>) {
        let mut subscribers = self.subscribers.write();
        if let Some(sinks) = subscribers.get_mut(key) {
            if let Some(pos) = sinks.iter().position(|s| s.same_channel(sink)) {
                sinks.remove(pos);
            }
            if sinks.is_empty() {
                subscribers.remove(key);
            }
        }
    }

    /// Deliver `event` to every subscriber of its key.
    ///
    /// Returns the number of sinks that accepted the event. Deliveries to
    /// busy sinks are dropped, not retried.
    pub fn publish(&self, event: Arc<Event<K, D>>) -> usize {
        let sinks = {
            let subscribers = self.subscribers.read();
            match subscribers.get(&event.kind) {
                Some(sinks) => sinks.clone(),
                None => {
                    debug!(key = ?event.kind, "nothing listening for events");
                    return 0;
                }
            }
        };

        let mut delivered = 0;
        for sink in &sinks {
            match sink.try_send(Arc::clone(&event)) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(key = ?event.kind, "subscriber busy, delivery dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(key = ?event.kind, "subscriber closed, delivery dropped");
                }
            }
        }
        delivered
    }

    /// Number of sinks currently registered for `key`.
    #[must_use]
    pub fn subscriber_count(&self, key: &K) -> usize {
        self.subscribers.read().get(key).map_or(0, Vec::len)
    }
}

impl<K, D> Default for EventBus<K, D>
where
    K: Eq + Hash + Clone + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
