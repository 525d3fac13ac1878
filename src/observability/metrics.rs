//! Metrics collection and exposition.
//!
//! # Metrics
//! - `zakatgo_writes_total` (counter): money-moving operations by operation, outcome
//! - `zakatgo_reads_total` (counter): ledger reads by operation, outcome
//! - `zakatgo_confirmation_seconds` (histogram): submit → confirmed latency
//! - `zakatgo_transaction_count` (gauge): last count read from the contract
//! - `zakatgo_http_requests_total` (counter): API requests by route, status
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter, so
//! library users and tests pay nothing.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with its own HTTP listener.
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_write(operation: &'static str, outcome: &'static str) {
    counter!("zakatgo_writes_total", "operation" => operation, "outcome" => outcome).increment(1);
}

pub fn record_read(operation: &'static str, outcome: &'static str) {
    counter!("zakatgo_reads_total", "operation" => operation, "outcome" => outcome).increment(1);
}

pub fn record_confirmation(operation: &'static str, started: Instant) {
    histogram!("zakatgo_confirmation_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_transaction_count(count: u64) {
    gauge!("zakatgo_transaction_count").set(count as f64);
}

pub fn record_http_request(route: &str, status: u16) {
    counter!(
        "zakatgo_http_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
