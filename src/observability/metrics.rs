//! Metrics collection and exposition.
//!
//! # Metrics
//! - `apimocker_requests_total` (counter): requests by outcome, method, status
//! - `apimocker_request_duration_seconds` (histogram): latency, delays included
//! - `apimocker_config_reloads_total` (counter): reloads by result
//!
//! # Design Decisions
//! - Without an installed recorder the macros are no-ops
//! - The exporter serves its own HTTP listener, separate from the mock surface

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// What the server did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Mocked,
    Relaxed,
    Forwarded,
    NotFound,
    UpstreamError,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Mocked => "mocked",
            Outcome::Relaxed => "relaxed",
            Outcome::Forwarded => "forwarded",
            Outcome::NotFound => "not_found",
            Outcome::UpstreamError => "upstream_error",
        }
    }
}

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, address = %addr, "Failed to install metrics exporter"),
    }
}

pub fn record_request(outcome: Outcome, method: &str, status: u16, start: Instant) {
    counter!(
        "apimocker_requests_total",
        "outcome" => outcome.as_str(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("apimocker_request_duration_seconds", "outcome" => outcome.as_str())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_reload(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("apimocker_config_reloads_total", "result" => result).increment(1);
}
