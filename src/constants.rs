// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Backsync operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for all Backsync CRDs
pub const API_GROUP: &str = "backsync.firestoned.io";

/// API version for all Backsync CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "backsync.firestoned.io/v1alpha1";

/// Kind name for the `BackrestVolSyncBinding` resource
pub const KIND_BINDING: &str = "BackrestVolSyncBinding";

/// Kind name for the `BackrestVolSyncOperatorConfig` resource
pub const KIND_OPERATOR_CONFIG: &str = "BackrestVolSyncOperatorConfig";

// ============================================================================
// VolSync API Constants
// ============================================================================

/// API group of the VolSync replication CRDs
pub const VOLSYNC_GROUP: &str = "volsync.backube";

/// API version of the VolSync replication CRDs consumed by this operator
pub const VOLSYNC_VERSION: &str = "v1alpha1";

/// Kind name for VolSync `ReplicationSource` objects
pub const KIND_REPLICATION_SOURCE: &str = "ReplicationSource";

/// Kind name for VolSync `ReplicationDestination` objects
pub const KIND_REPLICATION_DESTINATION: &str = "ReplicationDestination";

// ============================================================================
// Restic Repository Secret Keys
// ============================================================================

/// Secret key holding the restic repository URI
pub const SECRET_KEY_RESTIC_REPOSITORY: &str = "RESTIC_REPOSITORY";

/// Secret key holding the restic repository passphrase
pub const SECRET_KEY_RESTIC_PASSWORD: &str = "RESTIC_PASSWORD";

/// Prefix of restic-internal secret keys that are never forwarded as env entries
pub const SECRET_KEY_RESTIC_PREFIX: &str = "RESTIC_";

// ============================================================================
// Backrest Auth Secret Keys
// ============================================================================

/// Auth secret key for bearer-token authentication (takes priority)
pub const AUTH_KEY_TOKEN: &str = "token";

/// Auth secret key for the basic-auth username
pub const AUTH_KEY_USERNAME: &str = "username";

/// Auth secret key for the basic-auth password
pub const AUTH_KEY_PASSWORD: &str = "password";

// ============================================================================
// Backrest Client Constants
// ============================================================================

/// Request timeout for every Backrest API call
pub const BACKREST_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Prefix for repository IDs derived from a VolSync object
/// (`volsync-<namespace>-<kind>-<name>`)
pub const REPO_ID_PREFIX: &str = "volsync";

// ============================================================================
// Reconciliation Constants
// ============================================================================

/// Requeue delay after an optimistic-concurrency conflict on a status write
pub const STATUS_CONFLICT_REQUEUE_MILLIS: u64 = 200;

/// Requeue interval for bindings whose `Ready` condition is `True`
pub const REQUEUE_READY_SECS: u64 = 300;

/// Requeue interval for bindings that are not yet `Ready`
pub const REQUEUE_NOT_READY_SECS: u64 = 30;

// ============================================================================
// Operator Config Defaults
// ============================================================================

/// Environment variable naming the namespace of the operator config object
pub const ENV_CONFIG_NAMESPACE: &str = "BACKSYNC_CONFIG_NAMESPACE";

/// Environment variable naming the operator config object
pub const ENV_CONFIG_NAME: &str = "BACKSYNC_CONFIG_NAME";

/// Default namespace of the operator config object
pub const DEFAULT_CONFIG_NAMESPACE: &str = "backsync-system";

/// Default name of the operator config object
pub const DEFAULT_CONFIG_NAME: &str = "backsync";

// ============================================================================
// Auto-Binding Constants
// ============================================================================

/// Name prefix for generated bindings (`bvsb-<rs|rd>-<source name>`)
pub const AUTO_BINDING_NAME_PREFIX: &str = "bvsb";

/// Maximum length of a generated binding name (Kubernetes DNS label limit)
pub const MAX_BINDING_NAME_LEN: usize = 63;
