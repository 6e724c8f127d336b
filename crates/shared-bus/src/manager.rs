//! Buffered replay and client notification on top of the bus.

use crate::bus::EventBus;
use crate::event::Event;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, warn};

/// Tuning knobs for the event manager.
#[derive(Debug, Clone)]
pub struct EventManagerConfig {
    /// How long an event stays replayable.
    pub buffer_expiration: Duration,
    /// How often expired events are swept.
    pub cleanup_interval: Duration,
    /// Delay between notification delivery retries.
    pub retry_interval: Duration,
    /// Total delivery attempts per notification, including the first.
    pub max_retries: u32,
    /// Capacity of the internal raw-event channel subscribed to the bus.
    pub internal_capacity: usize,
}

impl Default for EventManagerConfig {
    fn default() -> Self {
        Self {
            buffer_expiration: Duration::from_secs(20),
            cleanup_interval: Duration::from_secs(30),
            retry_interval: Duration::from_secs(1),
            max_retries: 3,
            internal_capacity: crate::DEFAULT_SINK_CAPACITY,
        }
    }
}

/// Per-key event buffering, sweeping, and waiter notification.
///
/// The manager bridges the lossy bus and long-poll clients. For each key
/// with local interest it subscribes one internal raw-event channel to the
/// bus, buffers arriving events for `buffer_expiration`, and notifies
/// registered timestamp sinks that something new happened. Clients then
/// drain the buffer with [`EventManager::buffered_events`].
///
/// A key moves through `Absent -> Buffered/Live -> Absent`: the internal
/// channel subscribes to the bus when the first local subscriber arrives
/// for an absent key, and unsubscribes when the sweep finds the buffer
/// empty with no subscribers left.
pub struct EventManager<K, D> {
    bus: Arc<EventBus<K, D>>,
    state: Mutex<ManagerState<K, D>>,
    event_tx: mpsc::Sender<Arc<Event<K, D>>>,
    config: EventManagerConfig,
}

struct ManagerState<K, D> {
    buffers: HashMap<K, Vec<Arc<Event<K, D>>>>,
    subscribers: HashMap<K, Vec<mpsc::Sender<i64>>>,
}

impl<K, D> EventManager<K, D>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    /// Create the manager and start its event and sweep loops. The loops
    /// exit when `shutdown` flips to true or its sender is dropped.
    pub fn new(
        bus: Arc<EventBus<K, D>>,
        config: EventManagerConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Arc<Self> {
        let (event_tx, event_rx) = mpsc::channel(config.internal_capacity);

        let manager = Arc::new(Self {
            bus,
            state: Mutex::new(ManagerState {
                buffers: HashMap::new(),
                subscribers: HashMap::new(),
            }),
            event_tx,
            config,
        });

        tokio::spawn(Self::event_loop(
            Arc::clone(&manager),
            event_rx,
            shutdown.clone(),
        ));
        tokio::spawn(Self::sweep_loop(Arc::clone(&manager), shutdown));

        manager
    }

    /// Register a notification sink for `key`.
    ///
    /// The first registrant for a fully absent key attaches the internal
    /// raw-event channel to the bus.
    pub fn subscribe(&self, key: K, sink: mpsc::Sender<i64>) {
        let mut state = self.state.lock();
        if !state.buffers.contains_key(&key) && !state.subscribers.contains_key(&key) {
            debug!(key = ?key, "subscribing internal channel to bus");
            self.bus.subscribe(key.clone(), self.event_tx.clone());
        }
        state.subscribers.entry(key).or_default().push(sink);
    }

    /// Remove a notification sink, matching by channel identity. The key's
    /// buffer stays alive until the sweep retires it.
    pub fn unsubscribe(&self, key: &K, sink: &mpsc::Sender<i64>) {
        let mut state = self.state.lock();
        match state.subscribers.get_mut(key) {
            Some(sinks) => {
                if let Some(pos) = sinks.iter().position(|s| s.same_channel(sink)) {
                    sinks.remove(pos);
                }
                if sinks.is_empty() {
                    state.subscribers.remove(key);
                    debug!(key = ?key, "last client unsubscribed");
                }
            }
            None => warn!(key = ?key, "unsubscribe for a key with no subscribers"),
        }
    }

    /// All buffered events for `key` with `created >= since`, in append
    /// order. Never mutates the buffer.
    #[must_use]
    pub fn buffered_events(&self, key: &K, since: i64) -> Vec<Arc<Event<K, D>>> {
        let state = self.state.lock();
        state.buffers.get(key).map_or_else(Vec::new, |events| {
            events
                .iter()
                .filter(|e| e.created >= since)
                .cloned()
                .collect()
        })
    }

    async fn event_loop(
        manager: Arc<Self>,
        mut event_rx: mpsc::Receiver<Arc<Event<K, D>>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                maybe_event = event_rx.recv() => match maybe_event {
                    Some(event) => manager.process_event(event),
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("event loop stopped");
    }

    /// Append to the key's buffer and poke every notification sink.
    fn process_event(&self, event: Arc<Event<K, D>>) {
        let sinks = {
            let mut state = self.state.lock();
            debug!(key = ?event.kind, created = event.created, "event received");
            state
                .buffers
                .entry(event.kind.clone())
                .or_default()
                .push(Arc::clone(&event));
            state
                .subscribers
                .get(&event.kind)
                .cloned()
                .unwrap_or_default()
        };

        // Sends happen after the lock is released.
        for sink in sinks {
            self.notify(sink, event.created);
        }
    }

    /// Non-blocking first attempt; on a busy sink, retry on a timer for up
    /// to `max_retries` total tries, then log and drop.
    fn notify(&self, sink: mpsc::Sender<i64>, created: i64) {
        match sink.try_send(created) {
            Ok(()) => return,
            Err(mpsc::error::TrySendError::Closed(_)) => return,
            Err(mpsc::error::TrySendError::Full(_)) => {}
        }

        let retries_left = self.config.max_retries.saturating_sub(1);
        if retries_left == 0 {
            error!("notification sink busy, delivery skipped");
            return;
        }

        let retry_interval = self.config.retry_interval;
        tokio::spawn(async move {
            for attempt in 0..retries_left {
                warn!(attempt, "notification sink busy, retrying");
                tokio::time::sleep(retry_interval).await;
                match sink.try_send(created) {
                    Ok(()) | Err(mpsc::error::TrySendError::Closed(_)) => return,
                    Err(mpsc::error::TrySendError::Full(_)) => {}
                }
            }
            error!("notification sink still busy, delivery skipped");
        });
    }

    async fn sweep_loop(manager: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(manager.config.cleanup_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => manager.sweep(),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("sweep loop stopped");
    }

    /// Drop expired events; retire keys that are empty with no subscribers.
    fn sweep(&self) {
        let cutoff =
            shared_types::now_millis() - i64::try_from(self.config.buffer_expiration.as_millis()).unwrap_or(i64::MAX);

        let mut state = self.state.lock();
        let ManagerState {
            buffers,
            subscribers,
        } = &mut *state;

        let mut retired = Vec::new();
        for (key, events) in buffers.iter_mut() {
            let before = events.len();
            events.retain(|e| e.created >= cutoff);
            debug!(key = ?key, removed = before - events.len(), kept = events.len(), "swept expired events");

            if events.is_empty() && !subscribers.contains_key(key) {
                retired.push(key.clone());
            }
        }

        for key in retired {
            buffers.remove(&key);
            self.bus.unsubscribe(&key, &self.event_tx);
            debug!(key = ?key, "retired key, internal channel unsubscribed from bus");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::now_millis;
    use uuid::Uuid;

    type TestBus = EventBus<Uuid, serde_json::Value>;
    type TestManager = EventManager<Uuid, serde_json::Value>;

    fn fast_config() -> EventManagerConfig {
        EventManagerConfig {
            buffer_expiration: Duration::from_millis(200),
            cleanup_interval: Duration::from_millis(100),
            retry_interval: Duration::from_millis(20),
            max_retries: 3,
            internal_capacity: 64,
        }
    }

    fn setup(config: EventManagerConfig) -> (Arc<TestBus>, Arc<TestManager>, watch::Sender<bool>) {
        let bus = Arc::new(TestBus::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let manager = TestManager::new(Arc::clone(&bus), config, shutdown_rx);
        (bus, manager, shutdown_tx)
    }

    fn event(key: Uuid, created: i64) -> Arc<Event<Uuid, serde_json::Value>> {
        Arc::new(Event::new(key, serde_json::Value::Null, created))
    }

    #[tokio::test]
    async fn test_buffered_events_arrive_in_publish_order() {
        let (bus, manager, _shutdown) = setup(EventManagerConfig::default());
        let key = Uuid::new_v4();

        let (tx, mut rx) = mpsc::channel(8);
        manager.subscribe(key, tx);

        let base = now_millis();
        for i in 0..5 {
            bus.publish(event(key, base + i));
        }
        // One notification per event confirms processing finished.
        for _ in 0..5 {
            rx.recv().await.unwrap();
        }

        let buffered = manager.buffered_events(&key, 0);
        assert_eq!(buffered.len(), 5);
        let created: Vec<i64> = buffered.iter().map(|e| e.created).collect();
        assert_eq!(created, (0..5).map(|i| base + i).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_buffered_events_filters_by_since() {
        let (bus, manager, _shutdown) = setup(EventManagerConfig::default());
        let key = Uuid::new_v4();

        let (tx, mut rx) = mpsc::channel(8);
        manager.subscribe(key, tx);

        bus.publish(event(key, 100));
        bus.publish(event(key, 200));
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();

        assert_eq!(manager.buffered_events(&key, 150).len(), 1);
        assert_eq!(manager.buffered_events(&key, 201).len(), 0);
    }

    #[tokio::test]
    async fn test_no_subscription_means_no_buffering() {
        let (bus, manager, _shutdown) = setup(EventManagerConfig::default());
        let key = Uuid::new_v4();

        // Nothing subscribed the internal channel for this key.
        assert_eq!(bus.publish(event(key, now_millis())), 0);
        assert!(manager.buffered_events(&key, 0).is_empty());
    }

    #[tokio::test]
    async fn test_second_subscriber_does_not_duplicate_bus_subscription() {
        let (bus, manager, _shutdown) = setup(EventManagerConfig::default());
        let key = Uuid::new_v4();

        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, _rx_b) = mpsc::channel(8);
        manager.subscribe(key, tx_a);
        manager.subscribe(key, tx_b);

        assert_eq!(bus.subscriber_count(&key), 1);

        bus.publish(event(key, now_millis()));
        rx_a.recv().await.unwrap();
        // One bus delivery, one buffered copy.
        assert_eq!(manager.buffered_events(&key, 0).len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_expires_events_and_retires_key() {
        let (bus, manager, _shutdown) = setup(fast_config());
        let key = Uuid::new_v4();

        let (tx, mut rx) = mpsc::channel(8);
        manager.subscribe(key, tx.clone());

        bus.publish(event(key, now_millis()));
        rx.recv().await.unwrap();
        assert_eq!(manager.buffered_events(&key, 0).len(), 1);

        manager.unsubscribe(&key, &tx);

        // Expiration 200ms, sweep every 100ms: well past both.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(manager.buffered_events(&key, 0).is_empty());
        assert_eq!(bus.subscriber_count(&key), 0);
    }

    #[tokio::test]
    async fn test_sweep_keeps_live_keys_subscribed() {
        let (bus, manager, _shutdown) = setup(fast_config());
        let key = Uuid::new_v4();

        let (tx, _rx) = mpsc::channel(8);
        manager.subscribe(key, tx);

        tokio::time::sleep(Duration::from_millis(350)).await;
        // Still subscribed: the client is live even though nothing buffered.
        assert_eq!(bus.subscriber_count(&key), 1);
    }

    #[tokio::test]
    async fn test_notification_retry_eventually_delivers() {
        let (bus, manager, _shutdown) = setup(fast_config());
        let key = Uuid::new_v4();

        // Capacity one and pre-filled: the first try_send is busy.
        let (tx, mut rx) = mpsc::channel(1);
        tx.send(0).await.unwrap();
        manager.subscribe(key, tx);

        bus.publish(event(key, 42));
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Drain the stale entry; the retry task then lands the real one.
        assert_eq!(rx.recv().await.unwrap(), 0);
        assert_eq!(rx.recv().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_shutdown_stops_processing() {
        let (bus, manager, shutdown) = setup(EventManagerConfig::default());
        let key = Uuid::new_v4();

        let (tx, _rx) = mpsc::channel(8);
        manager.subscribe(key, tx);

        shutdown.send(true).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        bus.publish(event(key, now_millis()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(manager.buffered_events(&key, 0).is_empty());
    }
}
