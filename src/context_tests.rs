// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the reverse-lookup store queries.

use super::*;
use crate::crd::{
    BackrestConnection, BackrestVolSyncBindingSpec, BackrestVolSyncBindingStatus, VolSyncSourceRef,
};
use kube::runtime::{reflector, watcher};
use kube::Resource;

fn binding(
    namespace: &str,
    name: &str,
    source_kind: &str,
    source_name: &str,
    resolved_secret: Option<&str>,
) -> BackrestVolSyncBinding {
    let spec = BackrestVolSyncBindingSpec {
        backrest: BackrestConnection {
            url: "http://example.invalid".to_string(),
            auth_ref: None,
        },
        source: VolSyncSourceRef {
            kind: source_kind.to_string(),
            name: source_name.to_string(),
        },
        repo: Default::default(),
    };
    let mut b = BackrestVolSyncBinding::new(name, spec);
    b.meta_mut().namespace = Some(namespace.to_string());
    if let Some(secret) = resolved_secret {
        b.status = Some(BackrestVolSyncBindingStatus {
            resolved_repository_secret: Some(secret.to_string()),
            ..BackrestVolSyncBindingStatus::default()
        });
    }
    b
}

fn stores_with(bindings: Vec<BackrestVolSyncBinding>) -> Stores {
    let (store, mut writer) = reflector::store();
    for b in bindings {
        writer.apply_watcher_event(&watcher::Event::Apply(b));
    }
    Stores { bindings: store }
}

#[test]
fn test_bindings_for_secret_matches_namespace_and_name() {
    let stores = stores_with(vec![
        binding("workload", "b1", "ReplicationSource", "demo", Some("repo-secret")),
        binding("workload", "b2", "ReplicationSource", "other", Some("other-secret")),
        binding("elsewhere", "b3", "ReplicationSource", "demo", Some("repo-secret")),
    ]);

    let hits = stores.bindings_for_secret("workload", "repo-secret");

    assert_eq!(hits, vec![("b1".to_string(), "workload".to_string())]);
}

#[test]
fn test_bindings_for_secret_ignores_unresolved() {
    let stores = stores_with(vec![binding(
        "workload",
        "b1",
        "ReplicationSource",
        "demo",
        None,
    )]);

    assert!(stores.bindings_for_secret("workload", "repo-secret").is_empty());
}

#[test]
fn test_bindings_for_volsync_key() {
    let stores = stores_with(vec![
        binding("workload", "b1", "ReplicationSource", "demo", None),
        binding("workload", "b2", "ReplicationDestination", "demo", None),
    ]);

    let hits = stores.bindings_for_volsync("workload", "replicationsource/demo");
    assert_eq!(hits, vec![("b1".to_string(), "workload".to_string())]);

    let hits = stores.bindings_for_volsync("workload", "replicationdestination/demo");
    assert_eq!(hits, vec![("b2".to_string(), "workload".to_string())]);
}

#[test]
fn test_all_bindings_spans_namespaces() {
    let stores = stores_with(vec![
        binding("workload", "b1", "ReplicationSource", "demo", None),
        binding("elsewhere", "b2", "ReplicationSource", "demo", None),
    ]);

    let mut all = stores.all_bindings();
    all.sort();
    assert_eq!(
        all,
        vec![
            ("b1".to_string(), "workload".to_string()),
            ("b2".to_string(), "elsewhere".to_string()),
        ]
    );
}
