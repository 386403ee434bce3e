// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers and the binding status writer.
//!
//! Kubernetes conditions follow a standard format:
//! - `type`: The aspect of the resource being reported (Backsync uses `Ready`)
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the condition changed
//!
//! The [`BindingStatusUpdater`] collects all status changes during a
//! reconciliation pass and applies them in a single `replace_status` call at
//! the end. Replacing the status subresource carries the object's
//! `resourceVersion`, so a concurrent writer surfaces as an HTTP 409 conflict
//! ([`StatusPersistOutcome::Conflict`]) which the engine maps onto a short
//! requeue instead of a hard failure.

use crate::crd::{BackrestVolSyncBinding, BackrestVolSyncBindingStatus, Condition};
use anyhow::{Context as AnyhowContext, Result};
use chrono::Utc;
use kube::api::PostParams;
use kube::{Api, Client, ResourceExt};
use tracing::debug;

/// Create a new Kubernetes condition with the current timestamp.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Update or add a condition in a mutable conditions list (in-memory, no API call).
///
/// Preserves the `lastTransitionTime` if the status value hasn't changed, or
/// sets a new timestamp if it has. Conditions are upserted by type.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Compare two condition lists for semantic equality.
///
/// Ignores `lastTransitionTime` differences and only compares type, status,
/// reason, and message.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    for new_cond in new {
        match current.iter().find(|c| c.r#type == new_cond.r#type) {
            None => return false,
            Some(curr_cond) => {
                if curr_cond.status != new_cond.status
                    || curr_cond.reason != new_cond.reason
                    || curr_cond.message != new_cond.message
                {
                    return false;
                }
            }
        }
    }

    true
}

/// Outcome of a status persistence attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusPersistOutcome {
    /// The status was semantically unchanged; no API call was made.
    Unchanged,
    /// The status subresource was written.
    Updated,
    /// A concurrent writer won the optimistic-concurrency race (HTTP 409).
    /// The caller should requeue shortly and retry the whole pass.
    Conflict,
}

/// Centralized status updater for `BackrestVolSyncBinding` resources.
///
/// Collects all status changes during reconciliation and applies them in a
/// single API call, skipping the write entirely when nothing changed. This
/// prevents the tight reconciliation loop caused by no-op status updates
/// triggering new "object updated" events.
pub struct BindingStatusUpdater {
    binding: BackrestVolSyncBinding,
    new_status: BackrestVolSyncBindingStatus,
}

impl BindingStatusUpdater {
    /// Create a new status updater seeded from the binding's current status.
    #[must_use]
    pub fn new(binding: &BackrestVolSyncBinding) -> Self {
        let new_status = binding.status.clone().unwrap_or_default();
        Self {
            binding: binding.clone(),
            new_status,
        }
    }

    /// The in-progress status.
    #[must_use]
    pub fn status(&self) -> &BackrestVolSyncBindingStatus {
        &self.new_status
    }

    /// Mutable access to the in-progress status for scalar field updates.
    pub fn status_mut(&mut self) -> &mut BackrestVolSyncBindingStatus {
        &mut self.new_status
    }

    /// Upsert the `Ready` condition (in-memory only, no API call).
    pub fn set_ready_condition(&mut self, status: &str, reason: &str, message: &str) {
        update_condition_in_memory(
            &mut self.new_status.conditions,
            crate::status_reasons::CONDITION_TYPE_READY,
            status,
            reason,
            message,
        );
    }

    /// Set the observed generation to match the current generation.
    pub fn set_observed_generation(&mut self, generation: Option<i64>) {
        self.new_status.observed_generation = generation;
    }

    /// Whether the collected status differs semantically from the current one.
    ///
    /// Conditions are compared ignoring transition timestamps; all other
    /// fields are compared directly.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        match &self.binding.status {
            None => true,
            Some(current) => {
                if !conditions_equal(&current.conditions, &self.new_status.conditions) {
                    return true;
                }
                let mut a = current.clone();
                let mut b = self.new_status.clone();
                a.conditions.clear();
                b.conditions.clear();
                a != b
            }
        }
    }

    /// Persist the collected status changes (single API call).
    ///
    /// Skips the write when the status is semantically unchanged. The write
    /// replaces the status subresource with the object's `resourceVersion`
    /// attached, so a concurrent writer yields
    /// [`StatusPersistOutcome::Conflict`] rather than silently overwriting.
    ///
    /// # Errors
    ///
    /// Returns an error for any persistence failure other than an
    /// optimistic-concurrency conflict.
    pub async fn apply(&self, client: &Client) -> Result<StatusPersistOutcome> {
        let namespace = self.binding.namespace().unwrap_or_default();
        let name = self.binding.name_any();

        if !self.has_changes() {
            debug!(
                "BackrestVolSyncBinding {}/{} status unchanged, skipping update",
                namespace, name
            );
            return Ok(StatusPersistOutcome::Unchanged);
        }

        let api: Api<BackrestVolSyncBinding> = Api::namespaced(client.clone(), &namespace);

        let mut updated = self.binding.clone();
        updated.status = Some(self.new_status.clone());

        match api.replace_status(&name, &PostParams::default(), &updated).await {
            Ok(_) => {
                debug!(
                    "Updated BackrestVolSyncBinding {}/{} status: {} condition(s)",
                    namespace,
                    name,
                    self.new_status.conditions.len()
                );
                Ok(StatusPersistOutcome::Updated)
            }
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                debug!(
                    "BackrestVolSyncBinding {}/{} status write conflicted, requeueing",
                    namespace, name
                );
                Ok(StatusPersistOutcome::Conflict)
            }
            Err(e) => Err(e).with_context(|| {
                format!("update status of BackrestVolSyncBinding {namespace}/{name}")
            }),
        }
    }
}
