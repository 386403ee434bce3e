// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for Backrest error classification.

use super::*;

#[test]
fn test_already_initialized_detected_case_insensitively() {
    let err = BackrestError::Api {
        status: 500,
        message: "repo \"volsync-ns-rs-demo\" ALREADY Initialized".to_string(),
    };

    assert!(
        err.is_already_initialized(),
        "detection must be case-insensitive"
    );
}

#[test]
fn test_already_initialized_substring_match() {
    let err = BackrestError::Api {
        status: 409,
        message: "rpc error: repository already initialized, skipping init".to_string(),
    };

    assert!(err.is_already_initialized());
}

#[test]
fn test_other_errors_not_recognized() {
    let err = BackrestError::Api {
        status: 401,
        message: "unauthenticated".to_string(),
    };

    assert!(!err.is_already_initialized());
}

#[test]
fn test_transport_errors_not_recognized() {
    let err = BackrestError::Transport {
        message: "connection refused".to_string(),
    };

    assert!(!err.is_already_initialized());
}

#[test]
fn test_error_display_includes_status() {
    let err = BackrestError::Api {
        status: 503,
        message: "service unavailable".to_string(),
    };

    let text = err.to_string();
    assert!(text.contains("503"), "display should carry the status: {text}");
    assert!(text.contains("service unavailable"));
}
