//! # Integration Tests Crate
//!
//! Scenario tests that drive several OpaqueDB crates together through the
//! same wiring the server binary uses, without binding a socket:
//!
//! - token lineage across compute requests (mint, carry, wrong key)
//! - long polling against the event manager (pre-buffered, timeout,
//!   wakeup from a concurrent compute request)
//! - event TTL sweeps
//! - worker-pool publication under load
//!
//! The [`pipeline_simulation::TestNode`] harness assembles bus, manager,
//! worker pool, pipeline, and both routes exactly as `main` does.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod pipeline_simulation;
