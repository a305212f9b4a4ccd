//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fx_requests_total` (counter): requests by method, status
//! - `fx_request_duration_seconds` (histogram): latency distribution
//! - `fx_breaker_transitions_total` (counter): breaker state changes by from/to
//! - `fx_breaker_rejections_total` (counter): calls refused by the breaker
//! - `fx_rate_refresh_total` (counter): feed refreshes by outcome
//! - `fx_rate_table_size` (gauge): currencies in the current table
//! - `fx_rate_limited_total` (counter): requests rejected by the limiter
//!
//! Recording is a no-op until [`init_metrics`] installs a recorder, so the
//! library and its tests can call these freely.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus recorder"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    counter!("fx_requests_total", &labels).increment(1);
    histogram!("fx_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_breaker_transition(from: &'static str, to: &'static str) {
    counter!("fx_breaker_transitions_total", "from" => from, "to" => to).increment(1);
}

pub fn record_breaker_rejection() {
    counter!("fx_breaker_rejections_total").increment(1);
}

pub fn record_rate_refresh(outcome: &'static str) {
    counter!("fx_rate_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_rate_table_size(size: usize) {
    gauge!("fx_rate_table_size").set(size as f64);
}

pub fn record_rate_limited() {
    counter!("fx_rate_limited_total").increment(1);
}
