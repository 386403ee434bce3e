// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Accessors for VolSync replication objects.
//!
//! VolSync's `ReplicationSource` and `ReplicationDestination` CRDs are foreign
//! types owned by the VolSync project, so this operator reads them as
//! [`DynamicObject`]s rather than carrying typed structs for them. This module
//! provides the two accessors the binding reconciler needs:
//!
//! - [`repository_secret_name`] - the restic repository Secret referenced by
//!   the object's spec
//! - [`completion_marker`] - a stable identity string signaling "a new
//!   backup/snapshot completed", used to deduplicate task triggers
//!
//! # Completion-marker policy
//!
//! The marker is the single highest-priority non-empty status field, tagged
//! with its field name (`key=value`) so the same raw value from different
//! fields never collides. Identity fields are preferred over the coarse
//! `lastSyncTime` timestamp: repeated syncs that produce no new snapshot keep
//! the marker stable and therefore trigger no redundant tasks.

use kube::api::{ApiResource, DynamicObject};
use kube::core::GroupVersionKind;
use serde_json::Value;
use thiserror::Error;

use crate::constants::{KIND_REPLICATION_SOURCE, VOLSYNC_GROUP, VOLSYNC_VERSION};

/// Status fields checked for a completion marker, most specific identity
/// first. `lastSyncTime` is the coarse fallback and must stay last.
const MARKER_FIELDS: &[(&str, &[&str])] = &[
    ("latestImage", &["status", "latestImage", "name"]),
    ("lastSnapshot", &["status", "lastSnapshot"]),
    ("lastSnapshotID", &["status", "lastSnapshotID"]),
    ("lastManualSync", &["status", "lastManualSync"]),
    ("lastSyncTime", &["status", "lastSyncTime"]),
];

/// Errors reading VolSync object fields.
///
/// Messages name paths and keys only, never field values, so they are safe to
/// hash and log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VolSyncError {
    /// `spec.restic.repository` is absent or empty.
    #[error("spec.restic.repository not set")]
    MissingRepository,

    /// A checked field exists but is not a string.
    #[error("read {path}: expected string")]
    WrongType {
        /// Dotted path of the offending field
        path: String,
    },
}

/// Build the [`ApiResource`] for a VolSync kind.
///
/// The plural is derived from the kind (`replicationsources`,
/// `replicationdestinations`), which matches the VolSync CRDs.
#[must_use]
pub fn volsync_api_resource(kind: &str) -> ApiResource {
    let gvk = GroupVersionKind::gvk(VOLSYNC_GROUP, VOLSYNC_VERSION, kind);
    ApiResource::from_gvk(&gvk)
}

/// Look up a nested string field in a [`DynamicObject`]'s data.
///
/// Returns `Ok(None)` when any path segment is absent or null, `Ok(Some(_))`
/// for a string value, and [`VolSyncError::WrongType`] when the terminal value
/// exists but is not a string.
fn nested_string(data: &Value, path: &[&str]) -> Result<Option<String>, VolSyncError> {
    let mut current = data;
    for segment in path {
        match current.get(segment) {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    match current {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err(VolSyncError::WrongType {
            path: path.join("."),
        }),
    }
}

/// Resolve the restic repository Secret name from a VolSync object's spec.
///
/// # Errors
///
/// Returns [`VolSyncError::MissingRepository`] when `spec.restic.repository`
/// is absent or empty, and [`VolSyncError::WrongType`] when it is present but
/// not a string.
pub fn repository_secret_name(obj: &DynamicObject) -> Result<String, VolSyncError> {
    match nested_string(&obj.data, &["spec", "restic", "repository"])? {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(VolSyncError::MissingRepository),
    }
}

/// Derive the snapshot completion marker from a VolSync object's status.
///
/// Only `ReplicationSource` objects report completion markers; any other kind
/// returns `Ok(None)` (a legitimate no-op, not a failure). For sources, the
/// first non-empty field in priority order becomes the marker, tagged as
/// `key=value`. `Ok(None)` also means "no completed snapshot yet".
///
/// # Errors
///
/// Returns [`VolSyncError::WrongType`] when a checked status field exists with
/// an unexpected wire type. Decoding errors are surfaced, not swallowed, so a
/// malformed status is visible to the caller.
pub fn completion_marker(obj: &DynamicObject) -> Result<Option<String>, VolSyncError> {
    let kind = obj.types.as_ref().map(|t| t.kind.as_str()).unwrap_or("");
    if kind != KIND_REPLICATION_SOURCE {
        return Ok(None);
    }

    for (key, path) in MARKER_FIELDS {
        if let Some(value) = nested_string(&obj.data, path)? {
            let value = value.trim();
            if !value.is_empty() {
                return Ok(Some(format!("{key}={value}")));
            }
        }
    }

    Ok(None)
}

#[cfg(test)]
#[path = "volsync_tests.rs"]
mod volsync_tests;
