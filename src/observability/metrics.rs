//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bgremove_requests_total` (counter): requests to `/remove-bg` by outcome
//! - `bgremove_processing_duration_seconds` (histogram): remover latency
//! - `bgremove_cleanup_failures_total` (counter): temp files that could not be deleted
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests can call these freely.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Final state of a `/remove-bg` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    MissingImage,
    InvalidUpload,
    StorageError,
    ProcessingError,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::MissingImage => "missing_image",
            Outcome::InvalidUpload => "invalid_upload",
            Outcome::StorageError => "storage_error",
            Outcome::ProcessingError => "processing_error",
        }
    }
}

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_request(outcome: Outcome) {
    metrics::counter!("bgremove_requests_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn record_processing(elapsed: Duration) {
    metrics::histogram!("bgremove_processing_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_cleanup_failure() {
    metrics::counter!("bgremove_cleanup_failures_total").increment(1);
}
