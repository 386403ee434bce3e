// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the auto-binding generator's decision logic.

use super::autobinding::{desired_binding_name, is_auto_binding_allowed};
use super::operator_config::BindingGenerationPolicy;

#[test]
fn test_is_auto_binding_allowed_matrix() {
    use BindingGenerationPolicy::{All, Annotated};

    // (policy, annotation, expected)
    let cases: &[(BindingGenerationPolicy, Option<&str>, bool)] = &[
        (All, None, true),
        (All, Some("true"), true),
        (All, Some("false"), false),
        (Annotated, None, false),
        (Annotated, Some("true"), true),
        (Annotated, Some("yes"), true),
        (Annotated, Some("1"), true),
        (Annotated, Some("false"), false),
        (Annotated, Some("0"), false),
        (Annotated, Some("no"), false),
    ];

    for (policy, annotation, expected) in cases {
        assert_eq!(
            is_auto_binding_allowed(*policy, *annotation),
            *expected,
            "policy {policy:?} with annotation {annotation:?}"
        );
    }
}

#[test]
fn test_is_auto_binding_allowed_disabled_always_false() {
    assert!(!is_auto_binding_allowed(
        BindingGenerationPolicy::Disabled,
        Some("true")
    ));
}

#[test]
fn test_is_auto_binding_allowed_normalizes_annotation() {
    assert!(is_auto_binding_allowed(
        BindingGenerationPolicy::Annotated,
        Some(" True ")
    ));
    assert!(!is_auto_binding_allowed(
        BindingGenerationPolicy::All,
        Some("FALSE")
    ));
}

#[test]
fn test_desired_binding_name_abbreviates_kind() {
    assert_eq!(
        desired_binding_name("ReplicationSource", "demo"),
        "bvsb-rs-demo"
    );
    assert_eq!(
        desired_binding_name("ReplicationDestination", "demo"),
        "bvsb-rd-demo"
    );
}

#[test]
fn test_desired_binding_name_truncates() {
    let long = format!("A{}", "b".repeat(100));

    let name = desired_binding_name("ReplicationSource", &long);

    assert!(name.len() <= 63, "name must fit the DNS label limit");
    assert!(!name.is_empty());
    assert!(name.starts_with("bvsb-rs-a"));
}

#[test]
fn test_desired_binding_name_no_trailing_dash() {
    // Truncation at a '-' boundary must not leave a trailing dash
    let awkward = format!("{}-x", "b".repeat(54));

    let name = desired_binding_name("ReplicationSource", &awkward);

    assert!(!name.ends_with('-'), "got: {name}");
}
