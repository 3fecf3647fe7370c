//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the parcelwatch server:
//! - HTTP request metrics (latency, counts)
//! - Shipment counts by status (collected dynamically)
//! - Worker state (collected dynamically)
//! - Core worker/carrier metrics (registered from `parcelwatch_core::metrics`)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "parcelwatch_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("parcelwatch_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "parcelwatch_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Shipment Metrics (collected dynamically)
// =============================================================================

/// Shipments by current status.
pub static SHIPMENTS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "parcelwatch_shipments_by_status",
            "Current shipment count by status",
        ),
        &["status"],
    )
    .unwrap()
});

/// Tracking worker busy state (1 = cycle running, 0 = idle).
pub static WORKER_BUSY: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "parcelwatch_worker_busy",
        "Whether a tracking cycle is running (1) or not (0)",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Shipments
    registry
        .register(Box::new(SHIPMENTS_BY_STATUS.clone()))
        .unwrap();
    registry.register(Box::new(WORKER_BUSY.clone())).unwrap();

    // Core metrics (worker cycles, shipment checks, carrier requests)
    for metric in parcelwatch_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the store and worker as they are now.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    WORKER_BUSY.set(if state.worker().is_busy() { 1 } else { 0 });

    if let Ok(shipments) = state.store().list_shipments() {
        SHIPMENTS_BY_STATUS.reset();
        for shipment in &shipments {
            SHIPMENTS_BY_STATUS
                .with_label_values(&[shipment.status.key.as_str()])
                .inc();
        }
    }
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let numeric_regex = regex_lite::Regex::new(r"/\d+(/|$)").unwrap();
    numeric_regex.replace_all(path, "/{id}$1").to_string()
}
