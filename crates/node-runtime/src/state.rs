//! The built-in compute state.

use serde::{Deserialize, Serialize};
use shared_bus::Event;
use shared_types::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// The state round-tripped through the encrypted token by the built-in
/// routes. Users of the gateway may bind their own state type instead.
///
/// `public` is echoed in responses; `private` only ever exists inside the
/// token. `events` carries long-poll replay results out of the handler and
/// must never be serialized into the token.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ComputeState {
    /// Identifies the resource. Assigned once at mint, never mutated.
    pub id: Uuid,
    /// Owner of the resource.
    pub owner: Uuid,
    /// Mint timestamp, milliseconds since epoch.
    pub created: i64,
    /// Last update timestamp; never decreases.
    pub updated: i64,
    /// Public properties, part of the response.
    #[serde(default)]
    pub public: BTreeMap<String, Value>,
    /// Private properties, token-only.
    #[serde(default)]
    pub private: BTreeMap<String, Value>,
    /// Transient event carry-over for the long-poll route.
    #[serde(skip)]
    pub events: Vec<Arc<Event<Uuid, serde_json::Value>>>,
}

impl ComputeState {
    #[must_use]
    pub fn new(
        id: Uuid,
        owner: Uuid,
        created: i64,
        updated: i64,
        public: BTreeMap<String, Value>,
        private: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            id,
            owner,
            created,
            updated,
            public,
            private,
            events: Vec::new(),
        }
    }

    /// Advance `updated`, keeping it monotonically non-decreasing.
    pub fn touch(&mut self, now: i64) {
        if now > self.updated {
            self.updated = now;
        }
    }

    /// Semantic equality: everything that survives the token round trip.
    /// The transient `events` field does not participate.
    #[must_use]
    pub fn semantic_eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.owner == other.owner
            && self.created == other.created
            && self.updated == other.updated
            && self.public == other.public
            && self.private == other.private
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::now_millis;

    fn sample() -> ComputeState {
        let now = now_millis();
        ComputeState::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            now,
            now,
            BTreeMap::from([("hp".to_string(), Value::Num(10.0))]),
            BTreeMap::from([("seed".to_string(), Value::Str("s3".to_string()))]),
        )
    }

    #[test]
    fn test_touch_is_monotonic() {
        let mut state = sample();
        let updated = state.updated;
        state.touch(updated - 5);
        assert_eq!(state.updated, updated);
        state.touch(updated + 5);
        assert_eq!(state.updated, updated + 5);
    }

    #[test]
    fn test_semantic_eq_ignores_events() {
        let state = sample();
        let mut other = state.clone();
        other.events.push(Arc::new(Event::new(
            state.id,
            serde_json::Value::Null,
            state.updated,
        )));
        assert!(state.semantic_eq(&other));
    }

    #[test]
    fn test_semantic_eq_detects_field_changes() {
        let state = sample();
        let mut other = state.clone();
        other.updated += 1;
        assert!(!state.semantic_eq(&other));
    }

    #[test]
    fn test_events_never_serialize() {
        let mut state = sample();
        state.events.push(Arc::new(Event::new(
            state.id,
            serde_json::json!({"secret": true}),
            state.updated,
        )));

        let json = serde_json::to_string(&state).unwrap();
        assert!(!json.contains("events"));
        assert!(!json.contains("secret"));

        let back: ComputeState = serde_json::from_str(&json).unwrap();
        assert!(back.events.is_empty());
        assert!(back.semantic_eq(&state));
    }
}
