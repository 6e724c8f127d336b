//! HTTP service: route registration, dispatch, and lifecycle.

use crate::domain::config::GatewayConfig;
use crate::domain::error::{ApiError, GatewayError};
use crate::metrics::GatewayMetrics;
use crate::requests::{PrivateToken, Route};
use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{header, Method};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, on, MethodFilter};
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_codec::BufferPool;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

/// A route with its types erased down to bytes in, bytes out.
///
/// The service stores these; each concrete [`Route`] keeps its `S`/`R`/`D`
/// types internally and serializes its DTO before handing bytes back.
#[async_trait]
pub trait BytesRoute: Send + Sync {
    /// Process a request body into response body bytes.
    async fn process(&self, body: &[u8], pool: &BufferPool) -> Result<Vec<u8>, ApiError>;

    /// Allowed HTTP methods.
    fn methods(&self) -> &[Method];
}

#[async_trait]
impl<S, R, D> BytesRoute for Route<S, R, D>
where
    S: Serialize + DeserializeOwned + Send + Sync + 'static,
    R: DeserializeOwned + PrivateToken + Send + 'static,
    D: Serialize + Default + Send + Sync + 'static,
{
    async fn process(&self, body: &[u8], pool: &BufferPool) -> Result<Vec<u8>, ApiError> {
        let dto = self.process_bytes(body).await.map_err(|e| {
            error!(error = %e, "failed to process request");
            ApiError::from(&e)
        })?;

        let mut buf = pool.acquire();
        serde_json::to_writer(&mut buf, &dto).map_err(|e| {
            error!(error = %e, "failed to encode response body");
            ApiError::writing_body_failed()
        })?;
        Ok(buf.to_vec())
    }

    fn methods(&self) -> &[Method] {
        Route::methods(self)
    }
}

/// The OpaqueDB HTTP service.
///
/// Routes are registered before start; the server then runs until the
/// process-wide shutdown signal flips.
pub struct GatewayService {
    config: GatewayConfig,
    routes: Vec<(String, Arc<dyn BytesRoute>)>,
    metrics: Arc<GatewayMetrics>,
    response_pool: BufferPool,
    shutdown: watch::Receiver<bool>,
}

impl GatewayService {
    /// Create a service from a validated configuration.
    pub fn new(config: GatewayConfig, shutdown: watch::Receiver<bool>) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        Ok(Self {
            config,
            routes: Vec::new(),
            metrics: Arc::new(GatewayMetrics::new()),
            response_pool: BufferPool::new(),
            shutdown,
        })
    }

    /// Register a route at `path`.
    pub fn route(&mut self, path: impl Into<String>, route: Arc<dyn BytesRoute>) {
        self.routes.push((path.into(), route));
    }

    /// Get metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Build the axum router from the registered routes.
    #[must_use]
    pub fn build_router(&self) -> Router {
        let mut router = Router::new().route("/healthz", get(health_check));

        for (path, route) in &self.routes {
            let filter = method_filter(route.methods());
            let route = Arc::clone(route);
            let metrics = Arc::clone(&self.metrics);
            let pool = self.response_pool.clone();

            router = router.route(
                path,
                on(filter, move |body: Bytes| {
                    dispatch(route, metrics, pool, body)
                }),
            );
        }

        if self.config.debug_api {
            router = router.nest("/debug", self.build_debug_router());
            info!("enabled: /debug/");
        }

        router.layer(crate::middleware::TracingLayer::new())
    }

    fn build_debug_router(&self) -> Router {
        let metrics = Arc::clone(&self.metrics);
        Router::new()
            .route("/status", get(health_check))
            .route(
                "/metrics",
                get(move || {
                    let metrics = Arc::clone(&metrics);
                    async move { Json(metrics.to_json()) }
                }),
            )
    }

    /// Bind and serve until the shutdown signal flips.
    pub async fn start(&self) -> Result<(), GatewayError> {
        let addr = self.config.listen_addr();
        let router = self.build_router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(GatewayError::Bind)?;
        info!(addr = %addr, "starting server");

        let mut shutdown = self.shutdown.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
                info!("received shutdown signal");
            })
            .await
            .map_err(GatewayError::Serve)?;

        info!("server stopped");
        Ok(())
    }
}

async fn health_check() -> &'static str {
    "OK"
}

/// Fold an allowed-method set into an axum filter. Empty sets accept the
/// two methods the built-in routes use.
fn method_filter(methods: &[Method]) -> MethodFilter {
    let mut filter: Option<MethodFilter> = None;
    for method in methods {
        let f = if *method == Method::GET {
            MethodFilter::GET
        } else if *method == Method::POST {
            MethodFilter::POST
        } else if *method == Method::PUT {
            MethodFilter::PUT
        } else if *method == Method::DELETE {
            MethodFilter::DELETE
        } else {
            continue;
        };
        filter = Some(match filter {
            Some(acc) => acc.or(f),
            None => f,
        });
    }
    filter.unwrap_or(MethodFilter::GET.or(MethodFilter::POST))
}

async fn dispatch(
    route: Arc<dyn BytesRoute>,
    metrics: Arc<GatewayMetrics>,
    pool: BufferPool,
    body: Bytes,
) -> Response {
    match route.process(&body, &pool).await {
        Ok(bytes) => {
            metrics.record_request(true);
            (
                [(header::CONTENT_TYPE, "application/json")],
                bytes,
            )
                .into_response()
        }
        Err(err) => {
            metrics.record_request(false);
            metrics.record_failure(err.code);
            err.into_response()
        }
    }
}
