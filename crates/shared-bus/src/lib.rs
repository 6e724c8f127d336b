//! # Shared Bus - Per-Key Event Fan-Out
//!
//! Two layers cooperate to wake long-poll clients:
//!
//! - [`EventBus`] - a lossy per-key fan-out. Publish snapshots the
//!   subscriber list and delivers with a non-blocking send; a busy
//!   subscriber's delivery is dropped.
//! - [`EventManager`] - the buffering layer on top. It subscribes one
//!   internal raw-event channel per interesting key, buffers recent events
//!   with a wall-clock TTL, and pokes timestamp-only notification sinks so
//!   waiters can re-drain the buffer. The manager is the authoritative
//!   replay source; the bus makes no delivery promises.
//!
//! ```text
//! publisher ──publish──→ EventBus ──raw events──→ EventManager
//!                                                   │    │
//!                                            buffers│    │notify (i64)
//!                                                   ▼    ▼
//!                                            drain ◄── long-poll waiter
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod bus;
pub mod event;
pub mod manager;

pub use bus::EventBus;
pub use event::Event;
pub use manager::{EventManager, EventManagerConfig};

/// Default capacity for subscriber sinks before deliveries drop.
pub const DEFAULT_SINK_CAPACITY: usize = 1000;
