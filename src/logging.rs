use std::fmt;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::debug;
use tracing_subscriber::{fmt as subscriber_fmt, EnvFilter};

/// Diagnostic sink for asynchronous server failures (bind errors, shutdown
/// timeouts). Implementations must be shareable across tasks.
pub trait Logger: Send + Sync {
    fn errorf(&self, args: fmt::Arguments<'_>);
}

/// Sink substituted when the caller supplies no logger; forwards formatted
/// errors to `tracing`.
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn errorf(&self, args: fmt::Arguments<'_>) {
        tracing::error!("{args}");
    }
}

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    subscriber_fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started_at = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started_at.elapsed().as_millis();

    // health probes and scrapes arrive every few seconds, so keep this quiet
    debug!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = elapsed_ms,
        "request summary"
    );

    response
}
