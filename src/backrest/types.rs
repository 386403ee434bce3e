// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Wire types for the Backrest API.
//!
//! Field names follow Backrest's proto3-JSON mapping (camelCase), so these
//! structs serialize into the exact request bodies the server expects.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A repository registration request (`v1.Repo`).
///
/// Built fresh for every `AddRepo` call and never persisted: it carries the
/// repository passphrase.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Repo {
    /// Repository ID, unique within the Backrest instance.
    pub id: String,

    /// Restic repository URI (e.g., `s3://bucket/path`).
    pub uri: String,

    /// Repository passphrase.
    pub password: String,

    /// Environment entries (`KEY=VALUE`), sorted by the caller.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,

    /// Extra restic flags, sorted by the caller.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,

    /// Remove restic lockfiles at the start of forget/prune operations.
    #[serde(default)]
    pub auto_unlock: bool,

    /// Initialize the repository if it does not exist.
    #[serde(default)]
    pub auto_initialize: bool,
}

/// The configuration document returned by a successful `AddRepo` call
/// (`v1.Config`). Only the fields this operator inspects are decoded;
/// everything else is ignored.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackrestConfig {
    /// Monotonic modification counter of the server-side config.
    #[serde(default)]
    pub modno: i64,

    /// Instance identifier of the Backrest server.
    #[serde(default)]
    pub instance: String,
}

/// Background repository tasks this operator enqueues
/// (`v1.DoRepoTaskRequest.Task`).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum RepoTask {
    /// Re-index the repository's snapshots.
    #[serde(rename = "TASK_INDEX_SNAPSHOTS")]
    IndexSnapshots,

    /// Recompute repository statistics.
    #[serde(rename = "TASK_STATS")]
    Stats,
}

impl RepoTask {
    /// Wire name of the task, as used in request bodies and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoTask::IndexSnapshots => "TASK_INDEX_SNAPSHOTS",
            RepoTask::Stats => "TASK_STATS",
        }
    }
}

impl fmt::Display for RepoTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body for `DoRepoTask`.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DoRepoTaskRequest {
    /// Repository to run the task against.
    pub repo_id: String,

    /// Task to enqueue.
    pub task: RepoTask,
}

/// Error body of a failed Connect-protocol call.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ConnectError {
    /// Connect error code (e.g., `unknown`, `unauthenticated`).
    #[serde(default)]
    pub code: String,

    /// Human-readable error message.
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
