// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Structural validation of binding specs and repository ID derivation.

use crate::constants::{KIND_REPLICATION_DESTINATION, KIND_REPLICATION_SOURCE, REPO_ID_PREFIX};
use crate::crd::BackrestVolSyncBinding;
use kube::ResourceExt;

/// Validate a binding spec structurally.
///
/// Returns all violations so users can fix their spec in one round trip; the
/// caller aggregates them into a single `InvalidSpec` condition message.
#[must_use]
pub fn validate_binding(binding: &BackrestVolSyncBinding) -> Vec<String> {
    let mut violations = Vec::new();
    let spec = &binding.spec;

    if spec.backrest.url.is_empty() {
        violations.push("spec.backrest.url: Required value".to_string());
    }
    if spec.source.kind != KIND_REPLICATION_SOURCE
        && spec.source.kind != KIND_REPLICATION_DESTINATION
    {
        violations.push(format!(
            "spec.source.kind: Invalid value {:?}: must be ReplicationSource or ReplicationDestination",
            spec.source.kind
        ));
    }
    if spec.source.name.is_empty() {
        violations.push("spec.source.name: Required value".to_string());
    }

    violations
}

/// The Backrest repository ID for a binding.
///
/// The spec's `idOverride` wins; otherwise the ID is a deterministic
/// composite of namespace, lower-cased source kind, and source name, so the
/// same VolSync object always maps to the same repository.
#[must_use]
pub fn desired_repo_id(binding: &BackrestVolSyncBinding) -> String {
    if let Some(id) = binding
        .spec
        .repo
        .id_override
        .as_deref()
        .filter(|id| !id.is_empty())
    {
        return id.to_string();
    }
    format!(
        "{}-{}-{}-{}",
        REPO_ID_PREFIX,
        binding.namespace().unwrap_or_default(),
        binding.spec.source.kind.to_lowercase(),
        binding.spec.source.name
    )
}
