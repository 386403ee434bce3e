// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard status condition reasons for Backsync resources.
//!
//! This module defines constants for condition reasons following Kubernetes
//! conventions. Reasons are programmatic identifiers in CamelCase that explain
//! why a condition has a particular status.
//!
//! Every binding carries a single `type: Ready` condition; the reason encodes
//! where in the reconciliation state machine the last pass ended.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   conditions:
//!     - type: Ready
//!       status: "False"
//!       reason: RepositorySecretInvalid
//!       message: "RepositorySecretInvalid (details omitted; errorHash=9f86d08...)"
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// Primary condition type indicating overall binding readiness.
pub const CONDITION_TYPE_READY: &str = "Ready";

// ============================================================================
// Ready Condition Reasons
// ============================================================================

/// The operator is paused via `BackrestVolSyncOperatorConfig`.
///
/// Pause strictly precedes spec validation: a paused operator reports
/// `Paused` even on bindings whose spec is invalid.
pub const REASON_PAUSED: &str = "Paused";

/// The binding spec failed structural validation.
///
/// All violations are aggregated into a single condition message.
pub const REASON_INVALID_SPEC: &str = "InvalidSpec";

/// The referenced VolSync object could not be read.
pub const REASON_VOLSYNC_NOT_FOUND: &str = "VolSyncNotFound";

/// The VolSync object does not reference a restic repository Secret.
pub const REASON_VOLSYNC_MISSING_REPOSITORY: &str = "VolSyncMissingRepository";

/// The repository Secret named by the VolSync object does not exist.
pub const REASON_REPOSITORY_SECRET_NOT_FOUND: &str = "RepositorySecretNotFound";

/// The repository Secret is missing required keys or holds unusable values.
pub const REASON_REPOSITORY_SECRET_INVALID: &str = "RepositorySecretInvalid";

/// The Backrest auth Secret is missing or holds neither a token nor
/// username/password credentials.
pub const REASON_BACKREST_AUTH_INVALID: &str = "BackrestAuthInvalid";

/// The Backrest `AddRepo` call failed with an unrecognized error.
///
/// An error whose text contains "already initialized" (case-insensitive) is
/// treated as success instead.
pub const REASON_BACKREST_ADD_REPO_FAILED: &str = "BackrestAddRepoFailed";

/// The repository is registered with Backrest and the binding is up to date.
pub const REASON_APPLIED: &str = "Applied";

// ============================================================================
// Task-Trigger Log Reasons
// ============================================================================
//
// The task-trigger sub-protocol never flips the Ready condition; these
// reasons appear in structured logs only.

/// The VolSync completion marker could not be parsed; tasks were skipped.
pub const REASON_TASK_TRIGGER_SKIPPED: &str = "TaskTriggerSkipped";

/// A Backrest repo task could not be enqueued.
pub const REASON_TASK_TRIGGER_FAILED: &str = "TaskTriggerFailed";

/// Both snapshot tasks were enqueued for a new completion marker.
pub const REASON_TASKS_TRIGGERED: &str = "TasksTriggered";
