//! # OpaqueDB Node Runtime
//!
//! The server binary. Wires together the shared crates into the two
//! production routes:
//!
//! ```text
//! POST|GET /api/v1          compute: mint or touch a state, publish its DTO
//! POST|GET /api/v1/events   long poll: wait for events keyed by state id
//! ```
//!
//! ## Data flow
//!
//! ```text
//!          request bytes
//!               │
//!        gateway pipeline ── decrypt token ──► ComputeState
//!               │                                   │
//!        route handler (this crate) ◄───────────────┘
//!               │
//!        responder ──► DTO ──► worker pool ──► event bus ──► event manager
//!                                                                 │
//!                                             long-poll waiters ◄─┘
//! ```
//!
//! The server holds no per-session state; every request carries its whole
//! prior state inside the `private` token.

pub mod env;
pub mod handlers;
pub mod state;

/// Service name, shown by `--version`.
pub const NAME: &str = "OpaqueDB";

/// Crate version, shown by `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// One-line service description.
pub const DESCRIPTION: &str = "Stateless cloud-native compute server";
