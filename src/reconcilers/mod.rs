// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation controllers for Backsync resources.
//!
//! This module contains the reconciliation logic for the Backsync operator:
//!
//! 1. **Watch** - Monitor resource changes via the Kubernetes API
//! 2. **Reconcile** - Compare desired state (binding spec + VolSync status)
//!    with the state registered in Backrest
//! 3. **Apply** - Register/update the repository and enqueue snapshot tasks
//! 4. **Status** - Report reconciliation results back to Kubernetes
//!
//! # Available Reconcilers
//!
//! - [`binding::reconcile_binding`] - the binding engine: registers restic
//!   repositories with Backrest and triggers snapshot tasks
//! - [`autobinding::reconcile_autobinding`] - creates bindings for VolSync
//!   objects when the operator-wide generation policy allows
//!
//! # Error sanitization
//!
//! Reconciliation failures never propagate raw error text: the engine stores
//! a SHA-256 digest of the error in status and surfaces a
//! [`ReconcileError::Sanitized`] whose display text carries only the reason
//! and the digest. The controller's backoff still fires, but neither secret
//! material nor internal detail reaches logs or status.

pub mod autobinding;
pub mod binding;
pub mod operator_config;
pub mod status;

use crate::crd::BackrestVolSyncBinding;
use crate::status_reasons::CONDITION_TYPE_READY;

/// Error type returned by the reconcilers.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// A failure that was already mapped onto the binding's `Ready` condition.
    ///
    /// The display text is safe for logs: reason and error hash only.
    #[error("{reason} (details omitted; errorHash={error_hash})")]
    Sanitized {
        /// Condition reason the failure was mapped to
        reason: String,
        /// SHA-256 hex digest of the underlying error text
        error_hash: String,
    },

    /// Any other failure (API errors, status-write failures).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Whether a binding's `Ready` condition is currently `True`.
#[must_use]
pub fn is_ready(binding: &BackrestVolSyncBinding) -> bool {
    binding
        .status
        .as_ref()
        .map(|s| s.conditions.as_slice())
        .unwrap_or_default()
        .iter()
        .any(|c| c.r#type == CONDITION_TYPE_READY && c.status == "True")
}

#[cfg(test)]
mod autobinding_tests;
