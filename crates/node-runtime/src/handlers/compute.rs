//! Compute route: mint or touch a state, publish its response DTO.

use crate::state::ComputeState;
use async_trait::async_trait;
use opaquedb_gateway::dtos::ComputeResponse;
use opaquedb_gateway::requests::{ComputeRequest, HandlerError, RequestHandler};
use opaquedb_workers::WorkerPool;
use shared_bus::{Event, EventBus};
use shared_types::value::{map_from_json, map_to_json};
use shared_types::now_millis;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// The payload published for every compute response: the DTO itself,
/// type-erased to a JSON value for bus consumers.
pub type PublishJob = Arc<Event<Uuid, serde_json::Value>>;

/// Publishes response events, preferring the worker pool over the
/// request path.
///
/// Publication is handed to the pool so the bus fan-out never extends
/// request latency; when the pool is saturated or stopped the event is
/// published inline instead of being lost.
pub struct EventPublisher {
    bus: Arc<EventBus<Uuid, serde_json::Value>>,
    pool: Arc<WorkerPool<PublishJob>>,
}

impl EventPublisher {
    #[must_use]
    pub fn new(
        bus: Arc<EventBus<Uuid, serde_json::Value>>,
        pool: Arc<WorkerPool<PublishJob>>,
    ) -> Self {
        Self { bus, pool }
    }

    /// Queue `event` for publication, falling back to inline delivery.
    pub fn publish(&self, event: PublishJob) {
        match self.pool.try_publish(Arc::clone(&event)) {
            Ok(true) => {}
            Ok(false) | Err(_) => {
                debug!(key = %event.kind, "pool unavailable, publishing inline");
                self.bus.publish(event);
            }
        }
    }
}

/// Handler for `POST|GET /api/v1`.
///
/// Without a prior token a fresh resource is minted; with one, only
/// `updated` advances. `id`, `owner`, and `created` are never mutated.
pub struct ComputeHandler;

#[async_trait]
impl RequestHandler<ComputeState, ComputeRequest> for ComputeHandler {
    async fn handle(
        &self,
        mut request: ComputeRequest,
        state: Option<ComputeState>,
    ) -> Result<ComputeState, HandlerError> {
        let now = now_millis();
        request.received = now;

        let state = match state {
            Some(mut state) => {
                state.touch(now);
                state
            }
            None => ComputeState::new(
                Uuid::new_v4(),
                Uuid::new_v4(),
                now,
                now,
                request.public.take().map(map_from_json).unwrap_or_default(),
                BTreeMap::new(),
            ),
        };

        Ok(state)
    }
}

/// Build the compute responder: assemble the DTO and publish it as an
/// event keyed by the state id, for any long-poll waiters on that id.
pub fn compute_responder(
    publisher: Arc<EventPublisher>,
) -> impl Fn(&ComputeState, String) -> ComputeResponse + Send + Sync + 'static {
    move |state: &ComputeState, private: String| {
        let dto = ComputeResponse::new(
            state.id,
            state.owner,
            state.created,
            state.updated,
            map_to_json(&state.public),
            private,
        );

        let data = serde_json::to_value(&dto).unwrap_or(serde_json::Value::Null);
        publisher.publish(Arc::new(Event::new(state.id, data, state.updated)));

        dto
    }
}
