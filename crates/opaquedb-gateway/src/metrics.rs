//! Request counters, exported on the debug router.

use crate::domain::error::codes;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};

/// Gateway metrics collection.
///
/// Plain atomic counters; a scrape of `/debug/metrics` gets a JSON
/// snapshot.
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    // Request counters
    pub requests_total: AtomicU64,
    pub requests_success: AtomicU64,
    pub requests_error: AtomicU64,

    // Failure counters by wire code
    pub bad_body: AtomicU64,
    pub bad_private_body: AtomicU64,
    pub decryption_failed: AtomicU64,
    pub encryption_failed: AtomicU64,
    pub writing_body_failed: AtomicU64,
    pub compute_logic_error: AtomicU64,

    // Long-poll counters
    pub longpoll_waits: AtomicU64,
    pub longpoll_wakeups: AtomicU64,
    pub longpoll_timeouts: AtomicU64,
}

impl GatewayMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed request.
    pub fn record_request(&self, success: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.requests_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_error.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a failed operation by its wire code.
    pub fn record_failure(&self, code: &str) {
        let counter = match code {
            codes::BAD_BODY => &self.bad_body,
            codes::BAD_PRIVATE_BODY => &self.bad_private_body,
            codes::DECRYPTION_FAILED => &self.decryption_failed,
            codes::ENCRYPTION_FAILED => &self.encryption_failed,
            codes::WRITING_BODY_FAILED => &self.writing_body_failed,
            codes::COMPUTE_LOGIC_ERROR => &self.compute_logic_error,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot for the debug router.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "requests": {
                "total": self.requests_total.load(Ordering::Relaxed),
                "success": self.requests_success.load(Ordering::Relaxed),
                "error": self.requests_error.load(Ordering::Relaxed),
            },
            "failures": {
                "bad_body": self.bad_body.load(Ordering::Relaxed),
                "bad_private_body": self.bad_private_body.load(Ordering::Relaxed),
                "decryption_failed": self.decryption_failed.load(Ordering::Relaxed),
                "encryption_failed": self.encryption_failed.load(Ordering::Relaxed),
                "writing_body_failed": self.writing_body_failed.load(Ordering::Relaxed),
                "compute_logic_error": self.compute_logic_error.load(Ordering::Relaxed),
            },
            "longpoll": {
                "waits": self.longpoll_waits.load(Ordering::Relaxed),
                "wakeups": self.longpoll_wakeups.load(Ordering::Relaxed),
                "timeouts": self.longpoll_timeouts.load(Ordering::Relaxed),
            },
        })
    }
}
