//! # Shared Types - Common Value and Time Primitives
//!
//! Types shared by every OpaqueDB crate: the dynamic [`Value`] used for
//! payload maps that must round-trip through both token encodings, and the
//! millisecond wall-clock helpers used for all timestamps.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod time;
pub mod value;

pub use time::{millis_to_rfc3339, now_millis};
pub use value::Value;
