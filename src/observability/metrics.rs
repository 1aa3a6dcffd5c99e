//! Metrics collection and exposition.
//!
//! # Metrics
//! - `essen_requests_total` (counter): requests by method, status
//! - `essen_request_duration_seconds` (histogram): handler latency
//! - `essen_params_total` (counter): parameter lookups by source, outcome
//! - `essen_uploads_total` (counter): files written to the upload directory
//! - `essen_upload_bytes_total` (counter): bytes written by uploads

use std::net::SocketAddr;
use std::time::Instant;

use ::metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    counter!("essen_requests_total", "method" => method.clone(), "status" => status.clone())
        .increment(1);
    histogram!("essen_request_duration_seconds", "method" => method, "status" => status)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_param(source: &'static str, outcome: &'static str) {
    counter!("essen_params_total", "source" => source, "outcome" => outcome).increment(1);
}

pub fn record_upload(bytes: usize) {
    counter!("essen_uploads_total").increment(1);
    counter!("essen_upload_bytes_total").increment(bytes as u64);
}
