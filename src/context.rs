// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the Backsync controllers.
//!
//! All controllers receive an `Arc<Context>` containing:
//! - the Kubernetes client
//! - a reflector store of bindings for reverse-watch lookups
//! - the Backrest client factory (dependency-injected so tests can swap in
//!   mock implementations)
//! - the location of the operator config object
//!
//! The binding store enables O(1) in-memory lookups in watch mappers: when a
//! Secret or VolSync object changes, the mappers ask the store which bindings
//! reference it instead of issuing API queries.

use crate::backrest::BackrestClientFactory;
use crate::crd::BackrestVolSyncBinding;
use crate::reconcilers::binding::{secret_index_key, volsync_index_key};
use kube::runtime::reflector::Store;
use kube::{Client, ResourceExt};

/// Namespace/name of the operator config object, fixed at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorConfigRef {
    /// Namespace the config object lives in
    pub namespace: String,
    /// Name of the config object
    pub name: String,
}

/// Shared context passed to all controllers.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Reflector stores for reverse-watch lookups
    pub stores: Stores,

    /// Constructor for Backrest API clients
    pub backrest_factory: BackrestClientFactory,

    /// Location of the operator-wide config object
    pub operator_config: OperatorConfigRef,
}

/// Collection of reflector stores for cross-controller queries.
///
/// The store is populated by a dedicated reflector task and provides
/// in-memory access to bindings without API calls.
#[derive(Clone)]
pub struct Stores {
    /// All bindings, cluster-wide
    pub bindings: Store<BackrestVolSyncBinding>,
}

impl Stores {
    /// Find bindings in `namespace` whose resolved repository secret is
    /// `secret_name`.
    ///
    /// Used by the Secret watch mapper to fan a secret change back out to the
    /// bindings using it.
    ///
    /// # Returns
    /// A vector of (name, namespace) tuples for matching bindings
    #[must_use]
    pub fn bindings_for_secret(&self, namespace: &str, secret_name: &str) -> Vec<(String, String)> {
        self.bindings
            .state()
            .iter()
            .filter(|b| {
                b.namespace().as_deref() == Some(namespace)
                    && secret_index_key(b).as_deref() == Some(secret_name)
            })
            .map(|b| (b.name_any(), b.namespace().unwrap_or_default()))
            .collect()
    }

    /// Find bindings in `namespace` referencing the VolSync object identified
    /// by `key` (`<lowercase kind>/<name>`).
    ///
    /// # Returns
    /// A vector of (name, namespace) tuples for matching bindings
    #[must_use]
    pub fn bindings_for_volsync(&self, namespace: &str, key: &str) -> Vec<(String, String)> {
        self.bindings
            .state()
            .iter()
            .filter(|b| {
                b.namespace().as_deref() == Some(namespace)
                    && volsync_index_key(b).as_deref() == Some(key)
            })
            .map(|b| (b.name_any(), b.namespace().unwrap_or_default()))
            .collect()
    }

    /// All known bindings, for operator-config fan-out (bindings can exist in
    /// any namespace).
    ///
    /// # Returns
    /// A vector of (name, namespace) tuples
    #[must_use]
    pub fn all_bindings(&self) -> Vec<(String, String)> {
        self.bindings
            .state()
            .iter()
            .map(|b| (b.name_any(), b.namespace().unwrap_or_default()))
            .collect()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
