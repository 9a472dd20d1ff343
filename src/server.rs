//! Lifecycle of the operational endpoint server: spawn-on-construct serving
//! task, one-shot shutdown gate, bounded graceful drain.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, MethodRouter};
use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use prometheus_client::registry::Registry;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::http::handlers;
use crate::logging::{Logger, TracingLogger};

pub const DEFAULT_PORT: u16 = 8080;

const LISTEN_ADDR: Ipv4Addr = Ipv4Addr::UNSPECIFIED;

/// Bound on reading a request head; hyper runs the same timer while a
/// keep-alive connection sits idle between requests.
const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// How long `stop` lets in-flight requests drain before aborting them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

enum Socket {
    Port(u16),
    Bound(TcpListener),
}

impl Socket {
    fn port(&self) -> u16 {
        match self {
            Socket::Port(port) => *port,
            Socket::Bound(listener) => listener
                .local_addr()
                .map(|addr| addr.port())
                .unwrap_or_default(),
        }
    }

    async fn listen(self) -> std::io::Result<TcpListener> {
        match self {
            Socket::Port(port) => TcpListener::bind((LISTEN_ADDR, port)).await,
            Socket::Bound(listener) => Ok(listener),
        }
    }
}

pub struct Builder {
    socket: Socket,
    logger: Option<Arc<dyn Logger>>,
    health: Option<MethodRouter>,
    registry: Option<Registry>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            socket: Socket::Port(DEFAULT_PORT),
            logger: None,
            health: None,
            registry: None,
        }
    }
}

impl Builder {
    /// Listen on `0.0.0.0:<port>`. Avoiding collisions is the caller's
    /// responsibility; a conflicting bind is reported through the logger.
    pub fn port(mut self, port: u16) -> Self {
        self.socket = Socket::Port(port);
        self
    }

    /// Adopt a listener the caller already bound, e.g. on an OS-assigned
    /// port. The bind outcome is then known to the caller up front.
    pub fn listener(mut self, listener: TcpListener) -> Self {
        self.socket = Socket::Bound(listener);
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Replace the default `200 ok!!` health handler.
    pub fn health_route(mut self, route: MethodRouter) -> Self {
        self.health = Some(route);
        self
    }

    /// Registry whose contents `/metrics` exposes. Defaults to an empty one.
    pub fn metrics_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Spawns the serving task and returns the running handle. Must be called
    /// inside a tokio runtime. Never blocks on network I/O: binding happens on
    /// the serving task, and bind or serve failures are reported once through
    /// the logger rather than returned.
    pub fn spawn(self) -> OpsServer {
        let Self {
            socket,
            logger,
            health,
            registry,
        } = self;

        let logger: Arc<dyn Logger> = logger.unwrap_or_else(|| Arc::new(TracingLogger));
        let health = health.unwrap_or_else(|| get(handlers::health));
        let registry = Arc::new(registry.unwrap_or_default());
        let router = crate::build_router(health, registry);

        let port = socket.port();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(serve(socket, router, Arc::clone(&logger), cancel.clone()));

        OpsServer {
            port,
            cancel,
            stop_gate: AtomicBool::new(false),
            serve_task: Mutex::new(Some(task)),
            logger,
        }
    }
}

/// Handle to a running operational endpoint server. Dropping it does not stop
/// the serving task; call [`OpsServer::stop`].
pub struct OpsServer {
    port: u16,
    cancel: CancellationToken,
    stop_gate: AtomicBool,
    serve_task: Mutex<Option<JoinHandle<()>>>,
    logger: Arc<dyn Logger>,
}

impl OpsServer {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Shuts the server down. The first caller wins the gate, stops the accept
    /// loop, and waits for in-flight requests to drain (bounded by the grace
    /// period); every other caller, concurrent or later, returns immediately.
    /// Failures are reported through the logger, never returned.
    pub async fn stop(&self) {
        if self.stop_gate.swap(true, Ordering::AcqRel) {
            return;
        }

        self.cancel.cancel();
        let task = self.serve_task.lock().await.take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                self.logger
                    .errorf(format_args!("http server stop failed: {err}"));
            }
        }
    }
}

async fn serve(socket: Socket, router: Router, logger: Arc<dyn Logger>, cancel: CancellationToken) {
    let listener = match socket.listen().await {
        Ok(listener) => listener,
        Err(err) => {
            logger.errorf(format_args!("http server start failed: {err}"));
            return;
        }
    };

    let service = TowerToHyperService::new(router);
    let mut builder = auto::Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(HEADER_READ_TIMEOUT);
    let graceful = GracefulShutdown::new();
    let mut connections = JoinSet::new();

    let run_result = loop {
        tokio::select! {
            () = cancel.cancelled() => break Ok(()),
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    while connections.try_join_next().is_some() {}

                    let connection = builder
                        .serve_connection_with_upgrades(TokioIo::new(stream), service.clone());
                    let connection = graceful.watch(connection.into_owned());
                    connections.spawn(async move {
                        if let Err(err) = connection.await {
                            tracing::debug!(error = %err, "connection closed with error");
                        }
                    });
                }
                Err(err) => break Err(err),
            },
        }
    };

    // refuse new connections before draining the accepted ones
    drop(listener);

    if let Err(err) = run_result {
        logger.errorf(format_args!("http server failed: {err}"));
    }

    tokio::select! {
        () = graceful.shutdown() => {}
        () = tokio::time::sleep(SHUTDOWN_GRACE) => {
            logger.errorf(format_args!(
                "http server stop timed out after {SHUTDOWN_GRACE:?}, aborting open connections"
            ));
            connections.abort_all();
        }
    }
}
