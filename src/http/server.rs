//! HTTP server setup and the mock handler.
//!
//! # Responsibilities
//! - Create the Axum Router: one fallback handler serves every path
//! - Wire up middleware (tracing, request ID)
//! - Dispatch requests against the current routing table snapshot
//! - Deliver mocks (after their delay), forward, or 404
//! - Emit log events and metrics for every outcome

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    response::IntoResponse,
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::http::request::CapturedRequest;
use crate::http::response;
use crate::lifecycle::Shutdown;
use crate::net::InFlightTracker;
use crate::observability::metrics::{self, Outcome};
use crate::observability::{EventBus, LogEvent};
use crate::proxy::Forwarder;
use crate::routing::{dispatch, Dispatch, MatchKind, SharedRoutingTable};

/// Event message when more than one endpoint qualifies for a relaxed match.
pub const MULTIPLE_MATCHES_WARNING: &str = "WARNING - Multiple mocked endpoints found";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: SharedRoutingTable,
    pub forwarder: Arc<Forwarder>,
    pub events: EventBus,
    pub in_flight: InFlightTracker,
    pub max_body_size: usize,
}

/// HTTP server for the mock surface.
pub struct HttpServer {
    router: Router,
    in_flight: InFlightTracker,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let in_flight = state.in_flight.clone();
        Self {
            router: build_router(state),
            in_flight,
        }
    }

    /// Serve until `shutdown` triggers, then let in-flight requests finish.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.signalled())
            .await?;

        tracing::info!(address = %addr, "HTTP server stopped");
        Ok(())
    }

    /// Run the server on its own task.
    pub fn spawn(self, listener: TcpListener) -> io::Result<ServerHandle> {
        let local_addr = listener.local_addr()?;
        let shutdown = Shutdown::new();
        let in_flight = self.in_flight.clone();
        let task = tokio::spawn(self.run(listener, shutdown.clone()));

        Ok(ServerHandle {
            local_addr,
            shutdown,
            task,
            in_flight,
        })
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(mock_handler)
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// A running server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<io::Result<()>>,
    in_flight: InFlightTracker,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn in_flight(&self) -> u64 {
        self.in_flight.active_count()
    }

    /// Stop accepting and wait for the server task; open requests complete first.
    pub async fn stop(self) -> io::Result<()> {
        self.shutdown.trigger();
        self.task.await.map_err(io::Error::other)?
    }

    /// Stop accepting, then poll the in-flight count until it drains or `deadline` passes.
    ///
    /// Returns whether every request finished in time.
    pub async fn stop_within(self, deadline: Duration) -> io::Result<bool> {
        self.shutdown.trigger();
        let drained = tokio::time::timeout(deadline, self.in_flight.drained())
            .await
            .is_ok();
        if !drained {
            tracing::warn!(
                in_flight = self.in_flight.active_count(),
                "Requests still in flight at stop deadline"
            );
            self.task.abort();
            return Ok(false);
        }
        self.task.await.map_err(io::Error::other)??;
        Ok(true)
    }
}

/// Serves every request: mock, forward or 404.
async fn mock_handler(State(state): State<AppState>, request: Request<Body>) -> Response<Body> {
    let start = Instant::now();
    let _in_flight = state.in_flight.track();

    let captured = match CapturedRequest::capture(request, state.max_body_size).await {
        Ok(captured) => captured,
        Err(status) => return status.into_response(),
    };
    let method = captured.method().to_string();
    let path = captured.path().to_string();

    let table = state.routes.snapshot();
    match dispatch(&table, &captured.shape) {
        Dispatch::Mock { response, kind } => {
            let outcome = match kind {
                MatchKind::Exact => Outcome::Mocked,
                MatchKind::Relaxed { candidates } => {
                    if candidates > 1 {
                        state
                            .events
                            .emit(LogEvent::server_warning(MULTIPLE_MATCHES_WARNING));
                    }
                    Outcome::Relaxed
                }
            };

            let status = response.status.as_u16();
            state.events.emit(LogEvent::request(
                &method,
                &path,
                &captured.shape.query,
                &captured.shape.body,
                status,
            ));

            if !response.delay.is_zero() {
                tracing::debug!(delay_ms = response.delay.as_millis() as u64, "Delaying mock response");
                tokio::time::sleep(response.delay).await;
            }

            metrics::record_request(outcome, &method, status, start);
            response::mock(&response)
        }
        Dispatch::Forward { project } => match state.forwarder.forward(&project, &captured).await {
            Ok(upstream) => {
                let status = upstream.status().as_u16();
                state.events.emit(LogEvent::response(&method, &path, status));
                metrics::record_request(Outcome::Forwarded, &method, status, start);
                upstream
            }
            Err(e) => {
                state.events.emit(LogEvent::error(&method, &path, e.to_string()));
                let reply = response::bad_gateway();
                metrics::record_request(Outcome::UpstreamError, &method, reply.status().as_u16(), start);
                reply
            }
        },
        Dispatch::NotFound(reason) => {
            let reply = response::not_found(reason.message());
            let status = reply.status().as_u16();
            state.events.emit(LogEvent::response(&method, &path, status));
            metrics::record_request(Outcome::NotFound, &method, status, start);
            reply
        }
    }
}
