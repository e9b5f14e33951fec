//! Prometheus metrics for the build board.

use metrics::{counter, gauge, histogram};

/// Initialize metrics exporter (Prometheus).
pub fn init_metrics() {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    if let Err(e) = builder.install() {
        tracing::warn!("Failed to install Prometheus exporter: {}", e);
    }
}

/// Record a finished board request by outcome (`ok` or `error`).
pub fn request_completed(outcome: &'static str) {
    counter!("board_requests_total", "outcome" => outcome).increment(1);
}

/// Record a failure in one of the request stages.
pub fn failure_recorded(stage: &'static str) {
    counter!("board_failures_total", "stage" => stage).increment(1);
}

/// Record how long the upstream builds call took.
pub fn upstream_fetch_duration(duration_ms: u64) {
    histogram!("board_upstream_fetch_ms").record(duration_ms as f64);
}

/// Set the number of builds returned by the last successful fetch.
pub fn builds_fetched(count: usize) {
    gauge!("board_builds_fetched").set(count as f64);
}
