// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for repository-secret extraction and auth-secret parsing.

use super::secrets::{auth_from_secret, extract_restic_secret};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;

fn secret(entries: &[(&str, &str)]) -> Secret {
    let data: BTreeMap<String, ByteString> = entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), ByteString(v.as_bytes().to_vec())))
        .collect();
    Secret {
        data: Some(data),
        ..Secret::default()
    }
}

// ========== Tests for extract_restic_secret() ==========

#[test]
fn test_extract_minimal_secret() {
    let s = secret(&[
        ("RESTIC_REPOSITORY", "s3://bucket/repo"),
        ("RESTIC_PASSWORD", "hunter2"),
    ]);

    let restic = extract_restic_secret(&s, &[]).expect("extract");
    assert_eq!(restic.repository, "s3://bucket/repo");
    assert_eq!(restic.password, "hunter2");
    assert!(restic.env.is_empty());
}

#[test]
fn test_extract_trims_repository_not_password() {
    let s = secret(&[
        ("RESTIC_REPOSITORY", "  s3://bucket/repo\n"),
        ("RESTIC_PASSWORD", " hunter2 "),
    ]);

    let restic = extract_restic_secret(&s, &[]).expect("extract");
    assert_eq!(restic.repository, "s3://bucket/repo");
    assert_eq!(restic.password, " hunter2 ", "passphrase must not be trimmed");
}

#[test]
fn test_extract_missing_repository() {
    let s = secret(&[("RESTIC_PASSWORD", "hunter2")]);

    let err = extract_restic_secret(&s, &[]).unwrap_err();
    assert!(
        err.to_string().contains("RESTIC_REPOSITORY"),
        "error should name the missing key: {err}"
    );
}

#[test]
fn test_extract_missing_password() {
    let s = secret(&[("RESTIC_REPOSITORY", "s3://bucket/repo")]);

    let err = extract_restic_secret(&s, &[]).unwrap_err();
    assert!(err.to_string().contains("RESTIC_PASSWORD"));
}

#[test]
fn test_extract_error_never_contains_values() {
    let s = secret(&[("RESTIC_REPOSITORY", "s3://top-secret-bucket/repo")]);

    let err = extract_restic_secret(&s, &[]).unwrap_err();
    assert!(
        !err.to_string().contains("top-secret-bucket"),
        "error text must never carry secret values: {err}"
    );
}

#[test]
fn test_extract_env_entries() {
    let s = secret(&[
        ("RESTIC_REPOSITORY", "s3://bucket/repo"),
        ("RESTIC_PASSWORD", "hunter2"),
        ("AWS_ACCESS_KEY_ID", "AKIA"),
        ("AWS_SECRET_ACCESS_KEY", "abc123"),
    ]);

    let mut restic = extract_restic_secret(&s, &[]).expect("extract");
    restic.env.sort();
    assert_eq!(
        restic.env,
        vec![
            "AWS_ACCESS_KEY_ID=AKIA".to_string(),
            "AWS_SECRET_ACCESS_KEY=abc123".to_string(),
        ]
    );
}

#[test]
fn test_extract_excludes_restic_prefixed_keys() {
    let s = secret(&[
        ("RESTIC_REPOSITORY", "s3://bucket/repo"),
        ("RESTIC_PASSWORD", "hunter2"),
        ("RESTIC_COMPRESSION", "max"),
        ("AWS_ACCESS_KEY_ID", "AKIA"),
    ]);

    let restic = extract_restic_secret(&s, &[]).expect("extract");
    assert_eq!(restic.env, vec!["AWS_ACCESS_KEY_ID=AKIA".to_string()]);
}

#[test]
fn test_extract_allowlist_filters_env() {
    let s = secret(&[
        ("RESTIC_REPOSITORY", "s3://bucket/repo"),
        ("RESTIC_PASSWORD", "hunter2"),
        ("AWS_ACCESS_KEY_ID", "AKIA"),
        ("AWS_SECRET_ACCESS_KEY", "abc123"),
        ("HTTP_PROXY", "http://proxy"),
    ]);
    let allowlist = vec![
        "AWS_ACCESS_KEY_ID".to_string(),
        "AWS_SECRET_ACCESS_KEY".to_string(),
    ];

    let mut restic = extract_restic_secret(&s, &allowlist).expect("extract");
    restic.env.sort();
    assert_eq!(
        restic.env,
        vec![
            "AWS_ACCESS_KEY_ID=AKIA".to_string(),
            "AWS_SECRET_ACCESS_KEY=abc123".to_string(),
        ],
        "HTTP_PROXY is not allow-listed and must be dropped"
    );
}

#[test]
fn test_extract_empty_allowlist_forwards_all() {
    let s = secret(&[
        ("RESTIC_REPOSITORY", "s3://bucket/repo"),
        ("RESTIC_PASSWORD", "hunter2"),
        ("HTTP_PROXY", "http://proxy"),
    ]);

    let restic = extract_restic_secret(&s, &[]).expect("extract");
    assert_eq!(restic.env, vec!["HTTP_PROXY=http://proxy".to_string()]);
}

// ========== Tests for auth_from_secret() ==========

#[test]
fn test_auth_token_yields_bearer() {
    let s = secret(&[("token", "tok123")]);

    let auth = auth_from_secret(&s).expect("auth");
    assert_eq!(auth.bearer_token.as_deref(), Some("tok123"));
    assert_eq!(auth.basic_username, None);
}

#[test]
fn test_auth_token_priority_over_basic() {
    // Arrange: all three keys present
    let s = secret(&[
        ("token", "tok123"),
        ("username", "admin"),
        ("password", "pw"),
    ]);

    // Act
    let auth = auth_from_secret(&s).expect("auth");

    // Assert: token takes priority
    assert_eq!(auth.bearer_token.as_deref(), Some("tok123"));
    assert_eq!(auth.basic_username, None);
    assert_eq!(auth.basic_password, None);
}

#[test]
fn test_auth_basic_credentials() {
    let s = secret(&[("username", "admin"), ("password", "pw")]);

    let auth = auth_from_secret(&s).expect("auth");
    assert_eq!(auth.bearer_token, None);
    assert_eq!(auth.basic_username.as_deref(), Some("admin"));
    assert_eq!(auth.basic_password.as_deref(), Some("pw"));
}

#[test]
fn test_auth_empty_token_falls_back_to_basic() {
    let s = secret(&[("token", ""), ("username", "admin"), ("password", "pw")]);

    let auth = auth_from_secret(&s).expect("auth");
    assert_eq!(auth.bearer_token, None);
    assert_eq!(auth.basic_username.as_deref(), Some("admin"));
}

#[test]
fn test_auth_neither_key_fails() {
    let s = secret(&[("something-else", "x")]);

    let err = auth_from_secret(&s).unwrap_err();
    assert!(
        err.to_string().contains("'token' or 'username'/'password'"),
        "got: {err}"
    );
}
