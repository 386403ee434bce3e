// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator-wide configuration loading.
//!
//! The config object is read fresh at the start of every reconciliation pass
//! with no cross-call memoization, so a pause takes effect on the very next
//! pass (no stale-pause window). A missing object is not an error: it is
//! equivalent to defaults (not paused, auto-binding disabled).

use crate::constants::{KIND_REPLICATION_DESTINATION, KIND_REPLICATION_SOURCE};
use crate::context::OperatorConfigRef;
use crate::crd::{BackrestVolSyncOperatorConfig, SecretRef};
use anyhow::{bail, Context as AnyhowContext, Result};
use kube::{Api, Client};

/// Auto-binding generation policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BindingGenerationPolicy {
    /// Never generate bindings.
    #[default]
    Disabled,
    /// Generate bindings only for VolSync objects annotated truthy.
    Annotated,
    /// Generate bindings for every VolSync object not annotated falsy.
    All,
}

impl BindingGenerationPolicy {
    /// Parse the policy from its spec string. Empty means `Disabled`.
    ///
    /// # Errors
    ///
    /// Fails on any unrecognized value.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "" | "Disabled" => Ok(BindingGenerationPolicy::Disabled),
            "Annotated" => Ok(BindingGenerationPolicy::Annotated),
            "All" => Ok(BindingGenerationPolicy::All),
            other => bail!(
                "spec.bindingGeneration.policy: Invalid value {other:?}: must be Disabled, Annotated, or All"
            ),
        }
    }
}

/// A validated snapshot of the operator config, taken at the start of a pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperatorConfigSnapshot {
    /// Pause all binding reconciliation.
    pub paused: bool,

    /// Auto-binding generation policy.
    pub binding_policy: BindingGenerationPolicy,

    /// VolSync kinds eligible for auto-binding. Empty allows both.
    pub volsync_kinds: Vec<String>,

    /// Default Backrest URL for generated bindings.
    pub default_backrest_url: String,

    /// Default auth Secret reference for generated bindings.
    ///
    /// `None` when unset or when the reference carries an empty name.
    pub default_backrest_auth_ref: Option<SecretRef>,
}

impl OperatorConfigSnapshot {
    /// Whether a VolSync kind is eligible for auto-binding.
    #[must_use]
    pub fn is_volsync_kind_allowed(&self, kind: &str) -> bool {
        self.volsync_kinds.is_empty() || self.volsync_kinds.iter().any(|k| k == kind)
    }
}

/// Load and validate the operator config.
///
/// # Errors
///
/// Fails on API errors other than not-found, on an invalid policy value, and
/// on kind allow-list entries that are not VolSync kinds.
pub async fn load_operator_config(
    client: &Client,
    config_ref: &OperatorConfigRef,
) -> Result<OperatorConfigSnapshot> {
    let api: Api<BackrestVolSyncOperatorConfig> =
        Api::namespaced(client.clone(), &config_ref.namespace);
    let config = api.get_opt(&config_ref.name).await.with_context(|| {
        format!(
            "get BackrestVolSyncOperatorConfig {}/{}",
            config_ref.namespace, config_ref.name
        )
    })?;

    let Some(config) = config else {
        return Ok(OperatorConfigSnapshot::default());
    };

    snapshot_from_spec(&config)
}

/// Validate a config object into a snapshot.
pub fn snapshot_from_spec(config: &BackrestVolSyncOperatorConfig) -> Result<OperatorConfigSnapshot> {
    let spec = &config.spec;
    let binding_policy = BindingGenerationPolicy::parse(&spec.binding_generation.policy)?;

    let volsync_kinds = spec.binding_generation.kinds.clone().unwrap_or_default();
    for kind in &volsync_kinds {
        if kind != KIND_REPLICATION_SOURCE && kind != KIND_REPLICATION_DESTINATION {
            bail!(
                "spec.bindingGeneration.kinds: Invalid value {kind:?}: must be ReplicationSource or ReplicationDestination"
            );
        }
    }

    let default_backrest_auth_ref = spec
        .default_backrest
        .auth_ref
        .clone()
        .filter(|r| !r.name.is_empty());

    Ok(OperatorConfigSnapshot {
        paused: spec.paused,
        binding_policy,
        volsync_kinds,
        default_backrest_url: spec.default_backrest.url.clone(),
        default_backrest_auth_ref,
    })
}
