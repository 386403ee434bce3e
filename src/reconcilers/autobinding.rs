// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Auto-binding generation for VolSync objects.
//!
//! A lightweight CRUD controller: when the operator-wide policy allows, it
//! creates a `BackrestVolSyncBinding` for each VolSync object, pointing at the
//! configured default Backrest server. Generated bindings carry a managed
//! label and an owner reference to the VolSync object; bindings without the
//! managed label are user property and are never touched.

use crate::constants::{
    AUTO_BINDING_NAME_PREFIX, KIND_REPLICATION_DESTINATION, KIND_REPLICATION_SOURCE,
    MAX_BINDING_NAME_LEN,
};
use crate::context::Context;
use crate::crd::{
    BackrestConnection, BackrestVolSyncBinding, BackrestVolSyncBindingSpec, VolSyncSourceRef,
};
use crate::labels::{
    ANNOTATION_AUTO_BINDING, ANNOTATION_MANAGED_BY, ANNOTATION_MANAGED_BY_VALUE,
    ANNOTATION_VOLSYNC_REF, K8S_MANAGED_BY, K8S_PART_OF, LABEL_MANAGED, LABEL_MANAGED_VALUE,
    PART_OF_BACKSYNC,
};
use crate::reconcilers::operator_config::{
    load_operator_config, BindingGenerationPolicy, OperatorConfigSnapshot,
};
use anyhow::{Context as AnyhowContext, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{DynamicObject, Patch, PatchParams, PostParams};
use kube::{Api, Resource, ResourceExt};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Whether the policy and the object's annotation allow generating a binding.
///
/// Truthy annotation values: `true`, `yes`, `1`. Falsy: `false`, `no`, `0`.
/// Under `All`, an unset annotation allows generation; under `Annotated`, a
/// truthy annotation is required.
#[must_use]
pub fn is_auto_binding_allowed(
    policy: BindingGenerationPolicy,
    annotation: Option<&str>,
) -> bool {
    let normalized = annotation.map(|v| v.trim().to_lowercase());
    let truthy = matches!(normalized.as_deref(), Some("true" | "yes" | "1"));
    let falsy = matches!(normalized.as_deref(), Some("false" | "no" | "0"));

    match policy {
        BindingGenerationPolicy::Disabled => false,
        BindingGenerationPolicy::Annotated => truthy,
        BindingGenerationPolicy::All => !falsy,
    }
}

/// The generated binding name for a VolSync object: `bvsb-<rs|rd>-<name>`,
/// truncated to the Kubernetes name limit.
#[must_use]
pub fn desired_binding_name(kind: &str, name: &str) -> String {
    let abbrev = if kind == KIND_REPLICATION_DESTINATION {
        "rd"
    } else {
        "rs"
    };
    let mut candidate = format!(
        "{AUTO_BINDING_NAME_PREFIX}-{abbrev}-{}",
        name.to_lowercase()
    );
    if candidate.len() > MAX_BINDING_NAME_LEN {
        candidate.truncate(MAX_BINDING_NAME_LEN);
    }
    candidate.trim_end_matches('-').to_string()
}

fn desired_backrest_connection(config: &OperatorConfigSnapshot) -> BackrestConnection {
    BackrestConnection {
        url: config.default_backrest_url.clone(),
        auth_ref: config.default_backrest_auth_ref.clone(),
    }
}

/// Reconcile one VolSync object: create its binding when policy allows.
///
/// # Errors
///
/// Returns an error when the operator config cannot be loaded or the
/// Kubernetes API calls fail.
pub async fn reconcile_autobinding(ctx: Arc<Context>, obj: Arc<DynamicObject>) -> Result<()> {
    let client = ctx.client.clone();
    let namespace = obj.namespace().unwrap_or_default();
    let obj_name = obj.name_any();
    let kind = obj
        .types
        .as_ref()
        .map(|t| t.kind.clone())
        .unwrap_or_default();

    if kind != KIND_REPLICATION_SOURCE && kind != KIND_REPLICATION_DESTINATION {
        return Ok(());
    }

    let config = load_operator_config(&client, &ctx.operator_config).await?;
    if config.paused {
        debug!(
            "Operator is paused, skipping auto-binding for {} {}/{}",
            kind, namespace, obj_name
        );
        return Ok(());
    }
    if config.binding_policy == BindingGenerationPolicy::Disabled {
        return Ok(());
    }
    if !config.is_volsync_kind_allowed(&kind) {
        debug!(
            "Kind {} not in auto-binding allow-list, skipping {}/{}",
            kind, namespace, obj_name
        );
        return Ok(());
    }

    let annotation = obj
        .annotations()
        .get(ANNOTATION_AUTO_BINDING)
        .map(String::as_str);
    if !is_auto_binding_allowed(config.binding_policy, annotation) {
        return Ok(());
    }

    if config.default_backrest_url.is_empty() {
        debug!(
            "No default Backrest URL configured, cannot generate binding for {}/{}",
            namespace, obj_name
        );
        return Ok(());
    }

    let binding_name = desired_binding_name(&kind, &obj_name);
    let api: Api<BackrestVolSyncBinding> = Api::namespaced(client.clone(), &namespace);

    match api
        .get_opt(&binding_name)
        .await
        .with_context(|| format!("get binding {namespace}/{binding_name}"))?
    {
        Some(existing) => {
            if existing.labels().get(LABEL_MANAGED).map(String::as_str)
                != Some(LABEL_MANAGED_VALUE)
            {
                debug!(
                    "Binding {}/{} exists and is not managed, leaving it alone",
                    namespace, binding_name
                );
                return Ok(());
            }

            // Keep managed bindings in step with the operator defaults.
            let desired = desired_backrest_connection(&config);
            if existing.spec.backrest != desired {
                info!(
                    "Updating managed binding {}/{} to new Backrest defaults",
                    namespace, binding_name
                );
                let patch = json!({ "spec": { "backrest": desired } });
                api.patch(
                    &binding_name,
                    &PatchParams::default(),
                    &Patch::Merge(&patch),
                )
                .await
                .with_context(|| format!("patch binding {namespace}/{binding_name}"))?;
            }
            Ok(())
        }
        None => {
            let binding = build_binding(&obj, &kind, &binding_name, &config);
            api.create(&PostParams::default(), &binding)
                .await
                .with_context(|| format!("create binding {namespace}/{binding_name}"))?;
            info!(
                "Created binding {}/{} for {} {}",
                namespace, binding_name, kind, obj_name
            );
            Ok(())
        }
    }
}

/// Build the generated binding: managed labels/annotations, an owner
/// reference to the VolSync object, and a spec from the operator defaults.
fn build_binding(
    obj: &DynamicObject,
    kind: &str,
    binding_name: &str,
    config: &OperatorConfigSnapshot,
) -> BackrestVolSyncBinding {
    let spec = BackrestVolSyncBindingSpec {
        backrest: desired_backrest_connection(config),
        source: VolSyncSourceRef {
            kind: kind.to_string(),
            name: obj.name_any(),
        },
        repo: Default::default(),
    };

    let mut binding = BackrestVolSyncBinding::new(binding_name, spec);
    binding.meta_mut().namespace = obj.namespace();

    let mut labels = BTreeMap::new();
    labels.insert(LABEL_MANAGED.to_string(), LABEL_MANAGED_VALUE.to_string());
    labels.insert(
        K8S_MANAGED_BY.to_string(),
        ANNOTATION_MANAGED_BY_VALUE.to_string(),
    );
    labels.insert(K8S_PART_OF.to_string(), PART_OF_BACKSYNC.to_string());
    binding.meta_mut().labels = Some(labels);

    let mut annotations = BTreeMap::new();
    annotations.insert(
        ANNOTATION_MANAGED_BY.to_string(),
        ANNOTATION_MANAGED_BY_VALUE.to_string(),
    );
    annotations.insert(
        ANNOTATION_VOLSYNC_REF.to_string(),
        format!("{}/{}", kind.to_lowercase(), obj.name_any()),
    );
    binding.meta_mut().annotations = Some(annotations);

    binding.meta_mut().owner_references = Some(vec![OwnerReference {
        api_version: format!(
            "{}/{}",
            crate::constants::VOLSYNC_GROUP,
            crate::constants::VOLSYNC_VERSION
        ),
        kind: kind.to_string(),
        name: obj.name_any(),
        uid: obj.meta().uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: None,
    }]);

    binding
}
