// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the metrics module.

use super::*;

#[test]
fn test_record_reconciliation_outcomes() {
    record_reconciliation_success("BackrestVolSyncBinding", Duration::from_millis(10));
    record_reconciliation_error("BackrestVolSyncBinding", Duration::from_millis(10));

    let success = RECONCILIATION_TOTAL
        .with_label_values(&["BackrestVolSyncBinding", "success"])
        .get();
    let error = RECONCILIATION_TOTAL
        .with_label_values(&["BackrestVolSyncBinding", "error"])
        .get();

    assert!(success >= 1.0, "success counter should have incremented");
    assert!(error >= 1.0, "error counter should have incremented");
}

#[test]
fn test_gather_metrics_renders_text_format() {
    record_reconciliation_success("BackrestVolSyncBinding", Duration::from_millis(1));

    let output = gather_metrics();
    assert!(
        output.contains("backsync_firestoned_io_reconciliations_total"),
        "exposition output should contain the counter name: {output}"
    );
}
