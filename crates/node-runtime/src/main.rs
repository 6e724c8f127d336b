//! OpaqueDB server entry point.

use anyhow::{Context, Result};
use axum::http::Method;
use clap::Parser;
use node_runtime::handlers::{
    compute_responder, event_list_responder, ComputeHandler, EventPollHandler, EventPublisher,
};
use node_runtime::state::ComputeState;
use node_runtime::{env, DESCRIPTION, NAME, VERSION};
use opaquedb_gateway::dtos::{ComputeResponse, EventListResponse};
use opaquedb_gateway::requests::{ComputeRequest, EncryptedRequestPipeline};
use opaquedb_gateway::{GatewayConfig, GatewayService};
use opaquedb_workers::WorkerPool;
use shared_bus::{EventBus, EventManager, EventManagerConfig};
use shared_codec::BufferPool;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "opaquedb", version, about = DESCRIPTION)]
struct Cli {
    /// Change default address to listen.
    #[arg(long, default_value = "")]
    addr: String,

    /// Change default port.
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// Set private key (lowercase hex, 32 bytes).
    #[arg(long = "private-key", env = "PRIVATE_KEY")]
    private_key: Option<String>,

    /// Create a new private key, print it, and exit.
    #[arg(long = "init-private-key")]
    init_private_key: bool,

    /// Enable the diagnostics API under /debug/.
    #[arg(long = "debug-api")]
    debug_api: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // One-shot: print a fresh key in env-file form and exit.
    if cli.init_private_key {
        let key = shared_codec::generate_key().context("failed to generate key")?;
        println!("PRIVATE_KEY={}", hex::encode(key));
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!(name = NAME, version = VERSION, "starting");

    let server_key = env::resolve_private_key(cli.private_key.as_deref())
        .context("private key parsing failed")?;

    let mut config = GatewayConfig::default();
    config.port = cli.port;
    config.debug_api = cli.debug_api || env::parse_bool_env("ENABLE_DEBUG_API", false);
    if !cli.addr.is_empty() {
        config.addr = cli
            .addr
            .parse::<IpAddr>()
            .context("invalid listen address")?;
    } else {
        config.addr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    }

    // Process-wide shutdown signal; ctrl-c flips it.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    // Event plumbing: bus, buffering manager, publication pool.
    let bus = Arc::new(EventBus::<Uuid, serde_json::Value>::new());
    let manager = EventManager::new(
        Arc::clone(&bus),
        EventManagerConfig {
            buffer_expiration: config.events.buffer_expiration,
            cleanup_interval: config.events.cleanup_interval,
            retry_interval: config.events.retry_interval,
            max_retries: config.events.max_retries,
            internal_capacity: config.events.internal_capacity,
        },
        shutdown_rx.clone(),
    );

    let pool = Arc::new(WorkerPool::new(config.workers.queue, shutdown_rx.clone()));
    {
        let bus = Arc::clone(&bus);
        pool.start(config.workers.workers, move |event| {
            bus.publish(event);
        })
        .context("failed to start worker pool")?;
    }
    let publisher = Arc::new(EventPublisher::new(Arc::clone(&bus), pool));

    // The encrypted pipeline shared by both routes.
    let pipeline = Arc::new(EncryptedRequestPipeline::<ComputeState, ComputeRequest>::json(
        &server_key,
        BufferPool::new(),
        ComputeState::default,
    ));

    let mut service = GatewayService::new(config.clone(), shutdown_rx)
        .context("failed to initialize gateway")?;
    let metrics = service.metrics();

    let compute_route = Arc::clone(&pipeline)
        .handle_with::<ComputeResponse>(Arc::new(ComputeHandler))
        .with_responder(compute_responder(publisher))
        .with_methods([Method::GET, Method::POST]);
    service.route("/api/v1", Arc::new(compute_route));

    let poll_handler = EventPollHandler::new(
        manager,
        config.timeouts.request,
        config.events.notify_capacity,
        metrics,
    );
    let events_route = pipeline
        .handle_with::<EventListResponse>(Arc::new(poll_handler))
        .with_responder(event_list_responder())
        .with_methods([Method::GET, Method::POST]);
    service.route("/api/v1/events", Arc::new(events_route));

    service.start().await.context("server failed")?;
    Ok(())
}
