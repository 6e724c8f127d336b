//! Millisecond wall-clock helpers.
//!
//! Every timestamp in the system is a signed 64-bit count of milliseconds
//! since the Unix epoch, UTC. Formatting to RFC-3339 happens only at the
//! DTO boundary.

use chrono::{DateTime, SecondsFormat, Utc};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format a millisecond timestamp as RFC-3339 UTC with seconds precision.
///
/// Out-of-range timestamps fall back to the epoch rather than panicking.
pub fn millis_to_rfc3339(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}
