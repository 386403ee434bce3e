// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for Backrest/VolSync binding management.
//!
//! This module defines the Kubernetes Custom Resource Definitions used by
//! Backsync to bind VolSync replication resources to a Backrest server.
//!
//! # Resource Types
//!
//! - [`BackrestVolSyncBinding`] - Binds one VolSync `ReplicationSource` or
//!   `ReplicationDestination` to a Backrest server, registering its restic
//!   repository and optionally triggering snapshot-indexing tasks.
//! - [`BackrestVolSyncOperatorConfig`] - Operator-wide configuration: pause
//!   switch, auto-binding generation policy, and default Backrest connection
//!   settings for generated bindings.
//!
//! # Example: Binding a ReplicationSource
//!
//! ```yaml
//! apiVersion: backsync.firestoned.io/v1alpha1
//! kind: BackrestVolSyncBinding
//! metadata:
//!   name: database-backup
//!   namespace: workload
//! spec:
//!   backrest:
//!     url: http://backrest.backup-system:9898
//!     authRef:
//!       name: backrest-auth
//!   source:
//!     kind: ReplicationSource
//!     name: database
//!   repo:
//!     triggerTasksOnSnapshot: true
//!     extraFlags: ["--limit-upload=1024"]
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A Kubernetes-style status condition.
///
/// Conditions follow the standard convention: a `type` identifying the aspect
/// being reported, a `status` of "True"/"False"/"Unknown", a CamelCase
/// `reason`, a human-readable `message`, and an RFC3339 transition timestamp.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. Backsync uses a single `Ready` condition.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    ///
    /// On failure paths this carries only the reason and an error hash,
    /// never the underlying error text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Reference to a Secret by name, in the same namespace as the referencing object.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SecretRef {
    /// Name of the referenced Secret.
    pub name: String,
}

/// Connection settings for a Backrest server.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackrestConnection {
    /// Base URL of the Backrest server (e.g., `http://backrest.backup-system:9898`).
    pub url: String,

    /// Optional reference to an auth Secret.
    ///
    /// Supported keys: `token` (bearer, takes priority) or
    /// `username`/`password` (basic).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_ref: Option<SecretRef>,
}

/// Reference to the VolSync object backing this binding.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolSyncSourceRef {
    /// Kind of the VolSync object. Must be either `ReplicationSource` or
    /// `ReplicationDestination`.
    pub kind: String,

    /// Name of the VolSync object, in the binding's namespace.
    pub name: String,
}

/// Repository options controlling how the restic repository is registered
/// with Backrest.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackrestRepoOptions {
    /// Override for the Backrest repository ID.
    ///
    /// When unset the ID is derived as
    /// `volsync-<namespace>-<lowercase kind>-<name>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_override: Option<String>,

    /// Controls Backrest's repo auto-unlock behavior.
    ///
    /// When enabled, Backrest removes restic lockfiles at the start of forget
    /// and prune operations. This can be unsafe if the repository is shared by
    /// multiple client devices. Disabled by default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_unlock: Option<bool>,

    /// Let Backrest initialize the repository if it does not exist yet.
    /// Disabled by default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_initialize: Option<bool>,

    /// Enqueue Backrest `INDEX_SNAPSHOTS` and `STATS` tasks when a bound
    /// `ReplicationSource` reports a new completed snapshot/sync marker.
    /// Disabled by default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_tasks_on_snapshot: Option<bool>,

    /// Extra restic flags passed through to Backrest for this repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_flags: Option<Vec<String>>,

    /// Allow-list of repository-secret keys forwarded to Backrest as
    /// environment entries. When empty, every non-`RESTIC_*` key is forwarded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_allowlist: Option<Vec<String>>,
}

/// `BackrestVolSyncBinding` links a VolSync replication resource to a
/// Backrest server.
///
/// The binding reconciler registers the restic repository referenced by the
/// VolSync object with Backrest (idempotently, keyed by an input hash) and,
/// when enabled, triggers snapshot-indexing tasks whenever the source reports
/// a newly completed snapshot.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "backsync.firestoned.io",
    version = "v1alpha1",
    kind = "BackrestVolSyncBinding",
    namespaced,
    doc = "BackrestVolSyncBinding registers the restic repository of a VolSync ReplicationSource or ReplicationDestination with a Backrest server and keeps the registration up to date."
)]
#[kube(status = "BackrestVolSyncBindingStatus")]
#[serde(rename_all = "camelCase")]
pub struct BackrestVolSyncBindingSpec {
    /// Backrest server connection settings.
    pub backrest: BackrestConnection,

    /// The VolSync object this binding registers.
    pub source: VolSyncSourceRef,

    /// Repository registration options.
    #[serde(default)]
    pub repo: BackrestRepoOptions,
}

/// Status of a `BackrestVolSyncBinding`.
///
/// All fields are overwritten by the reconciler; only the `Ready` condition
/// is upserted by type. Error-bearing fields carry SHA-256 hex digests of the
/// underlying error text, never the text itself.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackrestVolSyncBindingStatus {
    /// Conditions describing the binding's state. Single `Ready` condition.
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Generation of the spec most recently processed by the reconciler.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Name of the repository Secret currently resolved from the VolSync
    /// object's spec. Tracked independently of apply success so that Secret
    /// watches can fan back out to this binding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_repository_secret: Option<String>,

    /// Input hash of the last successful repository registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_applied_input_hash: Option<String>,

    /// Timestamp of the last successful repository registration (RFC3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_apply_time: Option<String>,

    /// SHA-256 hex digest of the last reconciliation error's text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_hash: Option<String>,

    /// Completion marker for which both snapshot tasks last ran to completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_snapshot_marker: Option<String>,

    /// Completion marker for which `INDEX_SNAPSHOTS` was last enqueued.
    ///
    /// Tracked separately from [`Self::last_snapshot_marker`] so that a
    /// failure of the follow-up `STATS` task retries without re-indexing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_indexed_snapshot_marker: Option<String>,

    /// Timestamp of the last fully successful task trigger (RFC3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_repo_task_trigger_time: Option<String>,

    /// SHA-256 hex digest of the last task-trigger error's text.
    ///
    /// Independent of the `Ready` condition: task-trigger failures never
    /// flip `Ready`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_repo_task_error_hash: Option<String>,
}

/// Auto-binding generation settings.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BindingGenerationSpec {
    /// Generation policy: `Disabled`, `Annotated`, or `All`.
    ///
    /// Empty is treated as `Disabled`. `Annotated` creates bindings only for
    /// VolSync objects carrying a truthy auto-binding annotation; `All`
    /// creates bindings for every VolSync object not annotated falsy.
    #[serde(default)]
    pub policy: String,

    /// Optional allow-list of VolSync kinds eligible for auto-binding.
    ///
    /// Entries must be `ReplicationSource` or `ReplicationDestination`.
    /// Empty allows both.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<String>>,
}

/// Default Backrest connection used by generated bindings.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DefaultBackrestSpec {
    /// Base URL of the Backrest server for generated bindings.
    #[serde(default)]
    pub url: String,

    /// Optional auth Secret reference propagated to generated bindings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_ref: Option<SecretRef>,
}

/// `BackrestVolSyncOperatorConfig` holds operator-wide settings.
///
/// A single instance is expected at a well-known namespace/name (configured
/// via environment). It is read fresh at the start of every reconciliation
/// pass; a missing object is equivalent to defaults (not paused, generation
/// disabled).
///
/// # Example
///
/// ```yaml
/// apiVersion: backsync.firestoned.io/v1alpha1
/// kind: BackrestVolSyncOperatorConfig
/// metadata:
///   name: backsync
///   namespace: backsync-system
/// spec:
///   paused: false
///   bindingGeneration:
///     policy: Annotated
///     kinds: ["ReplicationSource"]
///   defaultBackrest:
///     url: http://backrest.backup-system:9898
/// ```
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "backsync.firestoned.io",
    version = "v1alpha1",
    kind = "BackrestVolSyncOperatorConfig",
    namespaced,
    doc = "BackrestVolSyncOperatorConfig carries operator-wide settings: a pause switch, the auto-binding generation policy, and default Backrest connection settings for generated bindings."
)]
#[serde(rename_all = "camelCase")]
pub struct BackrestVolSyncOperatorConfigSpec {
    /// Pause all binding reconciliation.
    ///
    /// While paused, every binding is marked `Ready=False/Paused` and no
    /// remote calls are made. Pause takes effect before spec validation.
    #[serde(default)]
    pub paused: bool,

    /// Auto-binding generation settings.
    #[serde(default)]
    pub binding_generation: BindingGenerationSpec,

    /// Default Backrest connection for generated bindings.
    #[serde(default)]
    pub default_backrest: DefaultBackrestSpec,
}
