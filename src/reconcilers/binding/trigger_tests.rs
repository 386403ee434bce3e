// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the snapshot-task trigger sub-protocol.

use super::trigger::trigger_snapshot_tasks;
use crate::backrest::{BackrestConfig, BackrestRepoApi, Repo, RepoTask};
use crate::backrest_errors::BackrestError;
use crate::constants::{KIND_REPLICATION_DESTINATION, KIND_REPLICATION_SOURCE};
use crate::crd::BackrestVolSyncBindingStatus;
use crate::volsync::volsync_api_resource;
use async_trait::async_trait;
use kube::api::DynamicObject;
use serde_json::{json, Value};
use std::sync::Mutex;

#[derive(Default)]
struct MockBackrest {
    task_calls: Mutex<Vec<(String, RepoTask)>>,
    index_error: Mutex<Option<BackrestError>>,
    stats_error: Mutex<Option<BackrestError>>,
}

impl MockBackrest {
    fn calls(&self) -> Vec<(String, RepoTask)> {
        self.task_calls.lock().unwrap().clone()
    }

    fn fail_index(&self, message: &str) {
        *self.index_error.lock().unwrap() = Some(BackrestError::Api {
            status: 500,
            message: message.to_string(),
        });
    }

    fn fail_stats(&self, message: &str) {
        *self.stats_error.lock().unwrap() = Some(BackrestError::Api {
            status: 500,
            message: message.to_string(),
        });
    }

    fn clear_failures(&self) {
        *self.index_error.lock().unwrap() = None;
        *self.stats_error.lock().unwrap() = None;
    }
}

#[async_trait]
impl BackrestRepoApi for MockBackrest {
    async fn add_repo(&self, _repo: &Repo) -> Result<BackrestConfig, BackrestError> {
        Ok(BackrestConfig::default())
    }

    async fn do_repo_task(&self, repo_id: &str, task: RepoTask) -> Result<(), BackrestError> {
        self.task_calls
            .lock()
            .unwrap()
            .push((repo_id.to_string(), task));
        let error = match task {
            RepoTask::IndexSnapshots => self.index_error.lock().unwrap().clone(),
            RepoTask::Stats => self.stats_error.lock().unwrap().clone(),
        };
        match error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn source_with_status(status: Value) -> DynamicObject {
    let ar = volsync_api_resource(KIND_REPLICATION_SOURCE);
    let mut obj = DynamicObject::new("demo", &ar);
    obj.data = json!({ "status": status });
    obj
}

async fn run(
    status: &mut BackrestVolSyncBindingStatus,
    vs_obj: &DynamicObject,
    backrest: &MockBackrest,
) -> bool {
    trigger_snapshot_tasks(status, "repo-1", vs_obj, backrest, "workload", "b").await
}

#[tokio::test]
async fn test_trigger_marker_sequence_dedup() {
    // Spec scenario: markers [M1, M1, M2] across three reconciliations must
    // trigger tasks exactly for the transitions into M1 and into M2.
    let backrest = MockBackrest::default();
    let mut status = BackrestVolSyncBindingStatus::default();

    // Pass 1: new marker M1 -> INDEX_SNAPSHOTS then STATS
    let m1 = source_with_status(json!({ "lastSnapshot": "snap-1" }));
    let changed = run(&mut status, &m1, &backrest).await;
    assert!(changed);
    assert_eq!(
        backrest.calls(),
        vec![
            ("repo-1".to_string(), RepoTask::IndexSnapshots),
            ("repo-1".to_string(), RepoTask::Stats),
        ]
    );
    assert_eq!(status.last_snapshot_marker.as_deref(), Some("lastSnapshot=snap-1"));
    assert!(status.last_repo_task_trigger_time.is_some());

    // Pass 2: unchanged marker -> no calls, no status change
    let changed = run(&mut status, &m1, &backrest).await;
    assert!(!changed, "repeated marker must be a no-op");
    assert_eq!(backrest.calls().len(), 2, "task call count must not grow");

    // Pass 3: new marker M2 -> both tasks again
    let m2 = source_with_status(json!({ "lastSnapshot": "snap-2" }));
    let changed = run(&mut status, &m2, &backrest).await;
    assert!(changed);
    assert_eq!(backrest.calls().len(), 4);
    assert_eq!(status.last_snapshot_marker.as_deref(), Some("lastSnapshot=snap-2"));
}

#[tokio::test]
async fn test_trigger_noop_without_marker() {
    let backrest = MockBackrest::default();
    let mut status = BackrestVolSyncBindingStatus::default();

    let empty = source_with_status(json!({}));
    let changed = run(&mut status, &empty, &backrest).await;

    assert!(!changed);
    assert!(backrest.calls().is_empty());
}

#[tokio::test]
async fn test_trigger_noop_for_destination_kind() {
    let backrest = MockBackrest::default();
    let mut status = BackrestVolSyncBindingStatus::default();

    let ar = volsync_api_resource(KIND_REPLICATION_DESTINATION);
    let mut obj = DynamicObject::new("demo", &ar);
    obj.data = json!({ "status": { "lastSyncTime": "2025-06-01T00:00:00Z" } });

    let changed = run(&mut status, &obj, &backrest).await;
    assert!(!changed);
    assert!(backrest.calls().is_empty());
}

#[tokio::test]
async fn test_trigger_index_failure_records_hash_only() {
    let backrest = MockBackrest::default();
    backrest.fail_index("queue full");
    let mut status = BackrestVolSyncBindingStatus::default();

    let m1 = source_with_status(json!({ "lastSnapshot": "snap-1" }));
    let changed = run(&mut status, &m1, &backrest).await;

    assert!(changed, "a new error hash is a status change");
    assert!(status.last_repo_task_error_hash.is_some());
    assert_eq!(status.last_indexed_snapshot_marker, None);
    assert_eq!(status.last_snapshot_marker, None);
    // STATS must not run after an INDEX_SNAPSHOTS failure
    assert_eq!(
        backrest.calls(),
        vec![("repo-1".to_string(), RepoTask::IndexSnapshots)]
    );
}

#[tokio::test]
async fn test_trigger_stats_failure_preserves_index_progress() {
    let backrest = MockBackrest::default();
    backrest.fail_stats("queue full");
    let mut status = BackrestVolSyncBindingStatus::default();

    let m1 = source_with_status(json!({ "lastSnapshot": "snap-1" }));

    // Pass 1: indexing succeeds, stats fails
    let changed = run(&mut status, &m1, &backrest).await;
    assert!(changed);
    assert_eq!(
        status.last_indexed_snapshot_marker.as_deref(),
        Some("lastSnapshot=snap-1"),
        "index progress must be persisted even when stats fails"
    );
    assert_eq!(status.last_snapshot_marker, None);
    assert!(status.last_repo_task_error_hash.is_some());
    assert_eq!(backrest.calls().len(), 2);

    // Pass 2: stats recovered - indexing must NOT re-run
    backrest.clear_failures();
    let changed = run(&mut status, &m1, &backrest).await;
    assert!(changed);
    let calls = backrest.calls();
    assert_eq!(calls.len(), 3, "only STATS should run on retry");
    assert_eq!(calls[2].1, RepoTask::Stats);
    assert_eq!(status.last_snapshot_marker.as_deref(), Some("lastSnapshot=snap-1"));
    assert_eq!(
        status.last_repo_task_error_hash, None,
        "full success must clear the task error hash"
    );
}

#[tokio::test]
async fn test_trigger_repeated_failure_dedups_error_hash() {
    let backrest = MockBackrest::default();
    backrest.fail_stats("queue full");
    let mut status = BackrestVolSyncBindingStatus::default();

    let m1 = source_with_status(json!({ "lastSnapshot": "snap-1" }));

    let changed = run(&mut status, &m1, &backrest).await;
    assert!(changed);
    let hash = status.last_repo_task_error_hash.clone();

    // Same failure again: the hash is unchanged, so no status change
    let changed = run(&mut status, &m1, &backrest).await;
    assert!(!changed, "identical error hash must not churn status");
    assert_eq!(status.last_repo_task_error_hash, hash);
}

#[tokio::test]
async fn test_trigger_parse_error_dedup() {
    let backrest = MockBackrest::default();
    let mut status = BackrestVolSyncBindingStatus::default();

    // lastSnapshot with a non-string type is a parse error
    let broken = source_with_status(json!({ "lastSnapshot": { "id": 1 } }));

    // Pass 1: error hash recorded, no task calls
    let changed = run(&mut status, &broken, &backrest).await;
    assert!(changed);
    assert!(status.last_repo_task_error_hash.is_some());
    assert!(backrest.calls().is_empty());

    // Pass 2: same broken object - deduplicated, no further change
    let changed = run(&mut status, &broken, &backrest).await;
    assert!(!changed, "persistently broken status must not storm updates");
}
