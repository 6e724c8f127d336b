//! Public response DTOs.
//!
//! Everything a client sees: state snapshots and event lists. Timestamps
//! are RFC-3339 UTC with seconds precision, derived from the internal
//! millisecond clock at construction time.

use serde::Serialize;
use shared_types::millis_to_rfc3339;
use uuid::Uuid;

/// Response body of the compute route.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ComputeResponse {
    /// Identifies the resource.
    pub id: String,
    /// Owner of the resource.
    pub owner: String,
    /// When the resource was created.
    pub created: String,
    /// When the resource was last updated.
    pub updated: String,
    /// Public properties of the resource.
    pub public: serde_json::Value,
    /// The encrypted state, to be echoed in the next request.
    pub private: String,
}

impl ComputeResponse {
    #[must_use]
    pub fn new(
        id: Uuid,
        owner: Uuid,
        created: i64,
        updated: i64,
        public: serde_json::Value,
        private: String,
    ) -> Self {
        Self {
            id: id.to_string(),
            owner: owner.to_string(),
            created: millis_to_rfc3339(created),
            updated: millis_to_rfc3339(updated),
            public,
            private,
        }
    }
}

/// One delivered event.
#[derive(Debug, Clone, Serialize)]
pub struct EventItem {
    /// The resource the event was published for.
    pub id: String,
    /// Payload provided by the publisher.
    pub data: serde_json::Value,
    /// When the event was received.
    pub created: String,
}

impl EventItem {
    #[must_use]
    pub fn new(id: Uuid, data: serde_json::Value, created: i64) -> Self {
        Self {
            id: id.to_string(),
            data,
            created: millis_to_rfc3339(created),
        }
    }
}

/// Response body of the events route.
#[derive(Debug, Default, Clone, Serialize)]
pub struct EventListResponse {
    /// When this list was assembled; request events after this next time.
    pub created: String,
    /// Delivered events, ordered by their creation time ascending.
    pub payload: Vec<EventItem>,
    /// Token for requesting the next batch.
    pub private: String,
}

impl EventListResponse {
    #[must_use]
    pub fn new(created: i64, payload: Vec<EventItem>, private: String) -> Self {
        Self {
            created: millis_to_rfc3339(created),
            payload,
            private,
        }
    }
}
