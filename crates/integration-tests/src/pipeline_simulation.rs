//! Full pipeline simulation: both routes wired the way `main` wires them.

use axum::http::Method;
use node_runtime::handlers::{
    compute_responder, event_list_responder, ComputeHandler, EventPollHandler, EventPublisher,
};
use node_runtime::state::ComputeState;
use opaquedb_gateway::dtos::{ComputeResponse, EventListResponse};
use opaquedb_gateway::requests::{ComputeRequest, EncryptedRequestPipeline, Route};
use opaquedb_gateway::GatewayMetrics;
use opaquedb_workers::WorkerPool;
use shared_bus::{EventBus, EventManager, EventManagerConfig};
use shared_codec::{BufferPool, SecretKey};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

type Bus = EventBus<Uuid, serde_json::Value>;
type Manager = EventManager<Uuid, serde_json::Value>;

/// A fully wired node, minus the HTTP listener.
pub struct TestNode {
    pub bus: Arc<Bus>,
    pub manager: Arc<Manager>,
    pub metrics: Arc<GatewayMetrics>,
    pub compute_route: Route<ComputeState, ComputeRequest, ComputeResponse>,
    pub events_route: Route<ComputeState, ComputeRequest, EventListResponse>,
    shutdown_tx: watch::Sender<bool>,
}

impl TestNode {
    /// Assemble a node with the given key, long-poll timeout, and event
    /// manager tuning.
    pub fn build(key: &SecretKey, poll_timeout: Duration, manager_config: EventManagerConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let bus = Arc::new(Bus::new());
        let manager = Manager::new(Arc::clone(&bus), manager_config, shutdown_rx.clone());

        let pool = Arc::new(WorkerPool::new(64, shutdown_rx));
        {
            let bus = Arc::clone(&bus);
            pool.start(2, move |event| {
                bus.publish(event);
            })
            .expect("pool start");
        }
        let publisher = Arc::new(EventPublisher::new(Arc::clone(&bus), pool));

        let pipeline = Arc::new(EncryptedRequestPipeline::<ComputeState, ComputeRequest>::json(
            key,
            BufferPool::new(),
            ComputeState::default,
        ));

        let metrics = Arc::new(GatewayMetrics::new());

        let compute_route = Arc::clone(&pipeline)
            .handle_with::<ComputeResponse>(Arc::new(ComputeHandler))
            .with_responder(compute_responder(publisher))
            .with_methods([Method::GET, Method::POST]);

        let poll_handler = EventPollHandler::new(
            Arc::clone(&manager),
            poll_timeout,
            16,
            Arc::clone(&metrics),
        );
        let events_route = pipeline
            .handle_with::<EventListResponse>(Arc::new(poll_handler))
            .with_responder(event_list_responder())
            .with_methods([Method::GET, Method::POST]);

        Self {
            bus,
            manager,
            metrics,
            compute_route,
            events_route,
            shutdown_tx,
        }
    }

    /// Flip the process-wide shutdown signal.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
