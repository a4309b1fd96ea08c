//! Metrics collection and exposition.
//!
//! # Metrics
//! - `image_proxy_requests_total` (counter): requests by outcome, status
//! - `image_proxy_request_duration_seconds` (histogram): latency by outcome
//! - `image_proxy_upstream_bytes_total` (counter): buffered upstream bytes by body kind
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op
//! - Exporter is opt-in through `observability.metrics_enabled`

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Terminal outcome of one proxied request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    MissingTarget,
    FetchFailed,
    UpstreamFailure,
    Html,
    Passthrough,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::MissingTarget => "missing_target",
            Outcome::FetchFailed => "fetch_failed",
            Outcome::UpstreamFailure => "upstream_failure",
            Outcome::Html => "html",
            Outcome::Passthrough => "passthrough",
        }
    }
}

/// Install the Prometheus exporter and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished request.
pub fn record_request(outcome: Outcome, status: u16, start_time: Instant) {
    counter!(
        "image_proxy_requests_total",
        "outcome" => outcome.as_str(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "image_proxy_request_duration_seconds",
        "outcome" => outcome.as_str()
    )
    .record(start_time.elapsed().as_secs_f64());
}

/// Record the size of a buffered upstream body.
pub fn record_upstream_bytes(outcome: Outcome, len: usize) {
    counter!("image_proxy_upstream_bytes_total", "kind" => outcome.as_str()).increment(len as u64);
}
