// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the Backsync operator.
//!
//! This module provides metrics collection with the namespace prefix
//! `backsync_firestoned_io_` (prometheus-safe version of
//! "backsync.firestoned.io").
//!
//! # Example
//!
//! ```rust,no_run
//! use backsync::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("BackrestVolSyncBinding", std::time::Duration::from_secs(1));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

/// Namespace prefix for all Backsync metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "backsync_firestoned_io";

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via the `/metrics`
/// endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (e.g., `BackrestVolSyncBinding`)
/// - `status`: Outcome (`success`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by resource type and status",
    );
    let counter =
        CounterVec::new(opts, &["resource_type", "status"]).expect("metric can be created");
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
});

/// Reconciliation duration in seconds by resource type
pub static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Reconciliation duration in seconds by resource type",
    );
    let histogram = HistogramVec::new(opts, &["resource_type"]).expect("metric can be created");
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("metric can be registered");
    histogram
});

/// Total number of Backrest API calls by procedure and status
///
/// Labels:
/// - `procedure`: `add_repo` or `do_repo_task`
/// - `status`: Outcome (`success`, `error`)
pub static BACKREST_CALLS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_backrest_calls_total"),
        "Total number of Backrest API calls by procedure and status",
    );
    let counter = CounterVec::new(opts, &["procedure", "status"]).expect("metric can be created");
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
});

/// Record a successful reconciliation and its duration.
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation and its duration.
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Render all registered metrics in the Prometheus text exposition format.
#[must_use]
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod metrics_tests;
