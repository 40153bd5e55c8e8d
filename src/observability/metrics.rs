//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_connections_total` (counter): accepted connections by listener
//! - `edge_sniff_total` (counter): classifications by verdict and detector
//! - `edge_route_not_found_total` (counter): unroutable requests by response status
//! - `edge_overload_counter` (gauge): current value of the window counter
//!
//! # Design Decisions
//! - Recording is a no-op until `init_metrics` installs the exporter
//! - Labels are static strings to keep cardinality fixed

use std::net::SocketAddr;

use axum::http::StatusCode;
use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::sniff::SniffVerdict;

/// Install the Prometheus exporter and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection(listener: &'static str) {
    counter!("edge_connections_total", "listener" => listener).increment(1);
}

pub fn record_sniff(verdict: &SniffVerdict) {
    let verdict_label = if verdict.is_http_like { "http_like" } else { "other" };
    let detector = verdict.detection.map_or("none", |d| d.detector());
    counter!("edge_sniff_total", "verdict" => verdict_label, "detector" => detector).increment(1);
}

pub fn record_route_not_found(status: StatusCode) {
    let label = match status {
        StatusCode::FORBIDDEN => "403",
        StatusCode::SERVICE_UNAVAILABLE => "503",
        _ => "other",
    };
    counter!("edge_route_not_found_total", "status" => label).increment(1);
}

pub fn record_overload_count(count: u64) {
    gauge!("edge_overload_counter").set(count as f64);
}
