//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define sidecar metrics (requests, latency, route misses, table swaps)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `sidecar_requests_total` (counter): forwarded requests by direction, method, status
//! - `sidecar_request_duration_seconds` (histogram): total forward time by direction
//! - `sidecar_route_misses_total` (counter): requests no resolver matched
//! - `sidecar_route_table_entries` (gauge): entries in the published table
//! - `sidecar_route_table_rebuilds_total` (counter): rebuilds by direction, result
//! - `sidecar_discovery_cache_lookups_total` (counter): dynamic discovery hit/miss/error
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Label values are low-cardinality (no paths, no module ids)

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::routing::entry::RouteDirection;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(direction: RouteDirection, method: &str, status: u16, duration: Duration) {
    ::metrics::counter!(
        "sidecar_requests_total",
        "direction" => direction.as_str(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("sidecar_request_duration_seconds", "direction" => direction.as_str())
        .record(duration.as_secs_f64());
}

pub fn record_route_miss() {
    ::metrics::counter!("sidecar_route_misses_total").increment(1);
}

pub fn record_table_swap(direction: RouteDirection, entries: usize) {
    ::metrics::gauge!("sidecar_route_table_entries", "direction" => direction.as_str()).set(entries as f64);
    ::metrics::counter!(
        "sidecar_route_table_rebuilds_total",
        "direction" => direction.as_str(),
        "result" => "published"
    )
    .increment(1);
}

pub fn record_table_rejected(direction: RouteDirection) {
    ::metrics::counter!(
        "sidecar_route_table_rebuilds_total",
        "direction" => direction.as_str(),
        "result" => "rejected"
    )
    .increment(1);
}

pub fn record_discovery_lookup(result: &'static str) {
    ::metrics::counter!("sidecar_discovery_cache_lookups_total", "result" => result).increment(1);
}
