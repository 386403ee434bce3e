// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The snapshot-task trigger sub-protocol.
//!
//! When a bound `ReplicationSource` reports a new completion marker, the
//! operator enqueues an `INDEX_SNAPSHOTS` task followed by a `STATS` task.
//! The two tasks are not atomic together and either may fail independently,
//! so progress is tracked with two markers:
//!
//! - `lastIndexedSnapshotMarker` is persisted as soon as `INDEX_SNAPSHOTS`
//!   is enqueued, so a later `STATS` failure retries without re-indexing
//! - `lastSnapshotMarker` is persisted only after both tasks succeeded
//!
//! Trigger failures never flip the binding's `Ready` condition; they only
//! write `lastRepoTaskErrorHash`, deduplicated so a persistently broken
//! VolSync object does not cause status-update storms.

use crate::backrest::{BackrestRepoApi, RepoTask};
use crate::crd::BackrestVolSyncBindingStatus;
use crate::status_reasons::{
    REASON_TASKS_TRIGGERED, REASON_TASK_TRIGGER_FAILED, REASON_TASK_TRIGGER_SKIPPED,
};
use crate::volsync;
use chrono::Utc;
use kube::api::DynamicObject;
use tracing::{info, warn};

use super::hash::hash_string;

/// Record a task error hash, returning whether the status actually changed.
fn set_task_error_hash(status: &mut BackrestVolSyncBindingStatus, error_hash: &str) -> bool {
    if status.last_repo_task_error_hash.as_deref() == Some(error_hash) {
        return false;
    }
    status.last_repo_task_error_hash = Some(error_hash.to_string());
    true
}

/// Run the trigger sub-protocol for one reconciliation pass.
///
/// Returns `true` when any status field changed. Never returns an error:
/// task-trigger failures are isolated from the primary `Ready` state by
/// design.
pub async fn trigger_snapshot_tasks(
    status: &mut BackrestVolSyncBindingStatus,
    repo_id: &str,
    vs_obj: &DynamicObject,
    backrest: &dyn BackrestRepoApi,
    namespace: &str,
    name: &str,
) -> bool {
    let marker = match volsync::completion_marker(vs_obj) {
        Ok(m) => m,
        Err(e) => {
            let error_hash = hash_string(&e.to_string());
            if status.last_repo_task_error_hash.as_deref() == Some(&error_hash) {
                return false;
            }
            let changed = set_task_error_hash(status, &error_hash);
            warn!(
                reason = REASON_TASK_TRIGGER_SKIPPED,
                namespace = %namespace,
                name = %name,
                errorHash = %error_hash,
                "Unable to parse VolSync completion marker"
            );
            return changed;
        }
    };

    let Some(marker) = marker else {
        return false;
    };
    if status.last_snapshot_marker.as_deref() == Some(&marker) {
        return false;
    }

    let mut changed = false;

    if status.last_indexed_snapshot_marker.as_deref() != Some(&marker) {
        if let Err(e) = backrest.do_repo_task(repo_id, RepoTask::IndexSnapshots).await {
            let error_hash = hash_string(&e.to_string());
            changed |= set_task_error_hash(status, &error_hash);
            warn!(
                reason = REASON_TASK_TRIGGER_FAILED,
                repoID = %repo_id,
                task = %RepoTask::IndexSnapshots,
                namespace = %namespace,
                name = %name,
                errorHash = %error_hash,
                "Failed to enqueue Backrest repo task"
            );
            return changed;
        }
        status.last_indexed_snapshot_marker = Some(marker.clone());
        changed = true;
    }

    if let Err(e) = backrest.do_repo_task(repo_id, RepoTask::Stats).await {
        let error_hash = hash_string(&e.to_string());
        changed |= set_task_error_hash(status, &error_hash);
        warn!(
            reason = REASON_TASK_TRIGGER_FAILED,
            repoID = %repo_id,
            task = %RepoTask::Stats,
            namespace = %namespace,
            name = %name,
            errorHash = %error_hash,
            "Failed to enqueue Backrest repo task"
        );
        return changed;
    }

    status.last_snapshot_marker = Some(marker);
    status.last_repo_task_trigger_time = Some(Utc::now().to_rfc3339());
    status.last_repo_task_error_hash = None;
    info!(
        reason = REASON_TASKS_TRIGGERED,
        repoID = %repo_id,
        namespace = %namespace,
        name = %name,
        "Triggered Backrest repo tasks for snapshot completion"
    );
    true
}
