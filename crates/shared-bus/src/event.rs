//! Event value type.

/// An immutable event routed by key.
///
/// `kind` is the routing key (in production a state's id); `data` is an
/// opaque payload the publisher and the DTO builder agree on; `created` is
/// the publish timestamp in milliseconds. Events are shared as
/// `Arc<Event<K, D>>` and never mutated after creation.
#[derive(Debug)]
pub struct Event<K, D> {
    pub kind: K,
    pub data: D,
    pub created: i64,
}

impl<K, D> Event<K, D> {
    #[must_use]
    pub fn new(kind: K, data: D, created: i64) -> Self {
        Self {
            kind,
            data,
            created,
        }
    }
}
