use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, MethodRouter};
use axum::{middleware, Router};
use prometheus_client::registry::Registry;
use tower_http::timeout::TimeoutLayer;

pub mod errors;
pub mod http;
pub mod logging;
pub mod server;

pub use logging::{Logger, TracingLogger};
pub use server::{Builder, OpsServer, DEFAULT_PORT};

const HEALTH_PATH: &str = "/ping";
const METRICS_PATH: &str = "/metrics";

/// Bound on reading the request body, running the handler, and writing the
/// response. Fixed, not tunable.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn build_router(health: MethodRouter, registry: Arc<Registry>) -> Router {
    Router::new()
        .route(HEALTH_PATH, health)
        .route(METRICS_PATH, get(http::handlers::metrics).with_state(registry))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(middleware::from_fn(logging::request_logging_middleware))
}
