//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define router metrics (resolutions, requests, latency)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `netkit_resolutions_total` (counter): route lookups by outcome
//! - `netkit_requests_total` (counter): served requests by method, status
//! - `netkit_request_duration_seconds` (histogram): latency by method
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so the router
//!   works unchanged in tests and embedders without Prometheus

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Count one route resolution (`matched`, `method_not_allowed`, `not_found`).
pub fn record_resolution(outcome: &'static str) {
    metrics::counter!("netkit_resolutions_total", "outcome" => outcome).increment(1);
}

/// Count one served request and its latency.
pub fn record_request(method: &str, status: u16, started: Instant) {
    let method = method.to_owned();
    metrics::counter!(
        "netkit_requests_total",
        "method" => method.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("netkit_request_duration_seconds", "method" => method)
        .record(started.elapsed().as_secs_f64());
}
