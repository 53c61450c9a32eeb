// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for dnsbridge.
//!
//! All metrics carry the `dnsbridge_` prefix and are registered in
//! [`METRICS_REGISTRY`], which `main.rs` serves on `/metrics`.
//!
//! # Metrics Categories
//!
//! - **Sync Metrics** - Outcome and duration of reconciliation passes
//! - **Endpoint Metrics** - Size of the desired endpoint set
//! - **Change Metrics** - Provider writes per change class
//!
//! # Example
//!
//! ```rust,no_run
//! use dnsbridge::metrics::record_sync_success;
//!
//! record_sync_success(std::time::Duration::from_secs(1));
//! ```

use prometheus::{CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all dnsbridge metrics
const METRICS_NAMESPACE: &str = "dnsbridge";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Sync Metrics
// ============================================================================

/// Total number of reconciliation passes by outcome
///
/// Labels:
/// - `status`: `success` or `error`
pub static SYNC_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_syncs_total"),
        "Total number of reconciliation passes by status",
    );
    let counter = CounterVec::new(opts, &["status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliation passes in seconds
pub static SYNC_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_sync_duration_seconds"),
        "Duration of reconciliation passes in seconds",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = Histogram::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Unix timestamp of the last successful pass
pub static LAST_SYNC_TIMESTAMP_SECONDS: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        format!("{METRICS_NAMESPACE}_last_sync_timestamp_seconds"),
        "Unix timestamp of the last successful reconciliation pass",
    )
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Failed passes by the stage that failed
///
/// Labels:
/// - `stage`: `source` or `provider`
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of failed passes by stage",
    );
    let counter = CounterVec::new(opts, &["stage"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Endpoint and Change Metrics
// ============================================================================

/// Number of desired endpoints produced by the last pass
pub static ENDPOINTS_DESIRED: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        format!("{METRICS_NAMESPACE}_endpoints_desired"),
        "Number of endpoints synthesized by the last pass",
    )
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Endpoints sent to the provider by change class
///
/// Labels:
/// - `change`: `create`, `update_old`, `update_new` or `delete`
pub static CHANGES_APPLIED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_changes_applied_total"),
        "Total number of endpoints applied to the provider by change class",
    );
    let counter = CounterVec::new(opts, &["change"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Record a successful pass and stamp the last-sync gauge
pub fn record_sync_success(duration: Duration) {
    SYNC_TOTAL.with_label_values(&["success"]).inc();
    SYNC_DURATION_SECONDS.observe(duration.as_secs_f64());
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    LAST_SYNC_TIMESTAMP_SECONDS.set(now.as_secs_f64());
}

/// Record a failed pass
///
/// # Arguments
/// * `stage` - Where the pass failed (`source` or `provider`)
/// * `duration` - Duration of the pass before failure
pub fn record_sync_error(stage: &str, duration: Duration) {
    SYNC_TOTAL.with_label_values(&["error"]).inc();
    SYNC_DURATION_SECONDS.observe(duration.as_secs_f64());
    ERRORS_TOTAL.with_label_values(&[stage]).inc();
}

/// Record the size of the desired endpoint set
#[allow(clippy::cast_precision_loss)]
pub fn record_endpoints(count: usize) {
    ENDPOINTS_DESIRED.set(count as f64);
}

/// Record endpoints applied for one change class
#[allow(clippy::cast_precision_loss)]
pub fn record_changes(change: &str, count: usize) {
    if count > 0 {
        CHANGES_APPLIED_TOTAL
            .with_label_values(&[change])
            .inc_by(count as f64);
    }
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod metrics_tests;
