//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Tracking worker cycles
//! - Per-shipment checks
//! - Carrier tracking requests

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Tracking Worker
// =============================================================================

/// Worker cycles total by outcome.
pub static CYCLES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("parcelwatch_worker_cycles_total", "Total tracking worker cycles"),
        &["outcome"], // "completed", "skipped", "failed"
    )
    .unwrap()
});

/// Worker cycle duration in seconds.
pub static CYCLE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "parcelwatch_worker_cycle_duration_seconds",
            "Duration of tracking worker cycles",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
    )
    .unwrap()
});

/// Open shipments seen by the last cycle.
pub static OPEN_SHIPMENTS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "parcelwatch_open_shipments",
        "Open shipments seen by the last worker cycle",
    )
    .unwrap()
});

// =============================================================================
// Shipment Checks
// =============================================================================

/// Shipment checks total by carrier and result.
pub static SHIPMENT_CHECKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("parcelwatch_shipment_checks_total", "Total shipment checks"),
        &["carrier", "result"], // result: "updated", "failed"
    )
    .unwrap()
});

// =============================================================================
// Carrier Requests
// =============================================================================

/// Carrier processor call duration in seconds.
pub static CARRIER_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "parcelwatch_carrier_request_duration_seconds",
            "Duration of carrier tracking requests",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0]),
        &["processor"],
    )
    .unwrap()
});

/// Returns all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Worker
        Box::new(CYCLES_TOTAL.clone()),
        Box::new(CYCLE_DURATION.clone()),
        Box::new(OPEN_SHIPMENTS.clone()),
        // Checks
        Box::new(SHIPMENT_CHECKS.clone()),
        // Carriers
        Box::new(CARRIER_REQUEST_DURATION.clone()),
    ]
}
