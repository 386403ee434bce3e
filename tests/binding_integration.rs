// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Integration tests for the Backsync operator.
//!
//! These tests verify CRD round trips against a real Kubernetes cluster and
//! are skipped automatically when no cluster is reachable.
//!
//! Run with: cargo test --test binding_integration -- --ignored

use backsync::crd::{
    BackrestConnection, BackrestVolSyncBinding, BackrestVolSyncBindingSpec,
    BackrestVolSyncOperatorConfig, BackrestVolSyncOperatorConfigSpec, VolSyncSourceRef,
};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use kube::client::Client;
use std::collections::BTreeMap;

/// Test helper to check if running in a Kubernetes cluster
async fn get_kube_client_or_skip() -> Option<Client> {
    match Client::try_default().await {
        Ok(client) => {
            println!("✓ Successfully connected to Kubernetes cluster");
            Some(client)
        }
        Err(e) => {
            eprintln!("⊘ Skipping integration test: not running in Kubernetes cluster: {e}");
            None
        }
    }
}

/// Create a test namespace
async fn create_test_namespace(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    let mut labels = BTreeMap::new();
    labels.insert("test".to_string(), "integration".to_string());
    labels.insert("managed-by".to_string(), "backsync-test".to_string());

    let test_ns = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        ..Default::default()
    };

    match namespaces.create(&PostParams::default(), &test_ns).await {
        Ok(_) => {
            println!("✓ Created test namespace: {name}");
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            println!("  Test namespace already exists: {name}");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Delete a test namespace
async fn delete_test_namespace(client: &Client, name: &str) {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let _ = namespaces.delete(name, &DeleteParams::default()).await;
}

fn test_binding_spec() -> BackrestVolSyncBindingSpec {
    BackrestVolSyncBindingSpec {
        backrest: BackrestConnection {
            url: "http://backrest.backup-system:9898".to_string(),
            auth_ref: None,
        },
        source: VolSyncSourceRef {
            kind: "ReplicationSource".to_string(),
            name: "demo".to_string(),
        },
        repo: Default::default(),
    }
}

#[tokio::test]
#[ignore = "requires a Kubernetes cluster with the Backsync CRDs installed"]
async fn test_binding_crud_round_trip() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };
    let ns = "backsync-test-binding-crud";
    create_test_namespace(&client, ns).await.expect("namespace");

    let api: Api<BackrestVolSyncBinding> = Api::namespaced(client.clone(), ns);

    let mut binding = BackrestVolSyncBinding::new("crud-test", test_binding_spec());
    binding.metadata.namespace = Some(ns.to_string());

    api.create(&PostParams::default(), &binding)
        .await
        .expect("create binding");

    let fetched = api.get("crud-test").await.expect("get binding");
    assert_eq!(fetched.spec.source.kind, "ReplicationSource");
    assert_eq!(fetched.spec.source.name, "demo");
    assert!(
        fetched.status.is_none() || fetched.status.as_ref().unwrap().conditions.is_empty(),
        "a freshly created binding carries no conditions until reconciled"
    );

    api.delete("crud-test", &DeleteParams::default())
        .await
        .expect("delete binding");

    delete_test_namespace(&client, ns).await;
}

#[tokio::test]
#[ignore = "requires a Kubernetes cluster with the Backsync CRDs installed"]
async fn test_operator_config_round_trip() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };
    let ns = "backsync-test-config-crud";
    create_test_namespace(&client, ns).await.expect("namespace");

    let api: Api<BackrestVolSyncOperatorConfig> = Api::namespaced(client.clone(), ns);

    let mut spec = BackrestVolSyncOperatorConfigSpec::default();
    spec.paused = true;
    spec.binding_generation.policy = "Annotated".to_string();
    spec.default_backrest.url = "http://backrest.backup-system:9898".to_string();

    let mut config = BackrestVolSyncOperatorConfig::new("backsync", spec);
    config.metadata.namespace = Some(ns.to_string());

    api.create(&PostParams::default(), &config)
        .await
        .expect("create config");

    let fetched = api.get("backsync").await.expect("get config");
    assert!(fetched.spec.paused);
    assert_eq!(fetched.spec.binding_generation.policy, "Annotated");

    api.delete("backsync", &DeleteParams::default())
        .await
        .expect("delete config");

    delete_test_namespace(&client, ns).await;
}
