//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define service metrics (requests, publishes, edits, reconciles)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `confgate_requests_total` (counter): API requests by method, route, status
//! - `confgate_request_duration_seconds` (histogram): API latency
//! - `confgate_publish_total` (counter): publishes by outcome
//! - `confgate_publish_duration_seconds` (histogram): publish latency
//! - `confgate_publish_bytes` (histogram): size of published documents
//! - `confgate_flag_clear_failures_total` (counter): publishes whose KV put
//!   succeeded but whose outdated flag could not be cleared
//! - `confgate_items_changed_total` (counter): items updated/inserted by edits
//! - `confgate_parse_warnings_total` (counter): skipped malformed lines
//! - `confgate_associations_changed_total` (counter): files added/removed by reconciles
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   exporter every call is a no-op, so tests need no setup
//! - Labels are low-cardinality: never namespace or file names

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

const REQUESTS_TOTAL: &str = "confgate_requests_total";
const REQUEST_DURATION: &str = "confgate_request_duration_seconds";
const PUBLISH_TOTAL: &str = "confgate_publish_total";
const PUBLISH_DURATION: &str = "confgate_publish_duration_seconds";
const PUBLISH_BYTES: &str = "confgate_publish_bytes";
const FLAG_CLEAR_FAILURES: &str = "confgate_flag_clear_failures_total";
const ITEMS_CHANGED: &str = "confgate_items_changed_total";
const PARSE_WARNINGS: &str = "confgate_parse_warnings_total";
const ASSOCIATIONS_CHANGED: &str = "confgate_associations_changed_total";

/// Install the Prometheus exporter with its own HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(metrics_addr = %addr, "Prometheus metrics exporter started"),
        Err(e) => tracing::error!(error = %e, metrics_addr = %addr, "Failed to install Prometheus exporter"),
    }
}

/// Record a served API request.
pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!(REQUESTS_TOTAL, "method" => method.to_string(), "route" => route.to_string(), "status" => status.clone())
        .increment(1);
    histogram!(REQUEST_DURATION, "method" => method.to_string(), "route" => route.to_string(), "status" => status)
        .record(start.elapsed().as_secs_f64());
}

/// Record a publish attempt. `outcome` is "ok" or "error".
pub fn record_publish(backend: &'static str, outcome: &'static str, bytes: usize, start: Instant) {
    counter!(PUBLISH_TOTAL, "backend" => backend, "outcome" => outcome).increment(1);
    histogram!(PUBLISH_DURATION, "backend" => backend, "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
    if outcome == "ok" {
        histogram!(PUBLISH_BYTES).record(bytes as f64);
    }
}

pub fn record_flag_clear_failure(reason: &'static str) {
    counter!(FLAG_CLEAR_FAILURES, "reason" => reason).increment(1);
}

pub fn record_edit(updated: usize, inserted: usize) {
    counter!(ITEMS_CHANGED, "change" => "updated").increment(updated as u64);
    counter!(ITEMS_CHANGED, "change" => "inserted").increment(inserted as u64);
}

pub fn record_parse_warnings(count: usize) {
    if count > 0 {
        counter!(PARSE_WARNINGS).increment(count as u64);
    }
}

pub fn record_reconcile(added: usize, removed: usize) {
    counter!(ASSOCIATIONS_CHANGED, "change" => "added").increment(added as u64);
    counter!(ASSOCIATIONS_CHANGED, "change" => "removed").increment(removed as u64);
}
