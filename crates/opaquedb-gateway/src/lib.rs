// Allow missing docs for internal items in development
#![allow(missing_docs)]

//! # OpaqueDB Gateway - Encrypted Request Pipeline and HTTP Surface
//!
//! The gateway turns HTTP bodies into typed, authenticated computation:
//!
//! ```text
//! request bytes
//!      │ decode (JSON)
//!      ▼
//! ComputeRequest ── private token? ──► decrypt ──► state S
//!      │                                             │
//!      └──────────────► handler(request, state) ◄────┘
//!                                │
//!                                ▼
//!                        encrypt new state
//!                                │
//!                                ▼
//!                    responder(state, token) ──► DTO ──► response bytes
//! ```
//!
//! The pipeline is generic over the state `S`, the request `R`, and the
//! response DTO `D`; routes bind their types at construction. The server
//! itself holds no per-session state: everything a request needs arrives
//! inside its token.
//!
//! # Error surface
//!
//! Client faults map to HTTP 400 with short machine-readable codes;
//! crypto and serialization failures collapse to one generic 500 code so
//! responses cannot be used as a padding/content oracle.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod domain;
pub mod dtos;
pub mod metrics;
pub mod middleware;
pub mod requests;
pub mod service;

pub use domain::config::{EventConfig, GatewayConfig, TimeoutConfig, WorkerConfig};
pub use domain::error::{codes, ApiError, GatewayError};
pub use metrics::GatewayMetrics;
pub use requests::{
    EncryptedRequestPipeline, HandlerError, PrivateToken, ProcessError, RequestHandler, Route,
};
pub use service::{BytesRoute, GatewayService};
