// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across the reconcilers.
//!
//! This module defines standard Kubernetes labels and Backsync-specific
//! labels/annotations to ensure consistency across all resources created by
//! the operator.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Value for `app.kubernetes.io/part-of` indicating this resource is part of Backsync
pub const PART_OF_BACKSYNC: &str = "backsync";

// ============================================================================
// Backsync-Specific Labels
// ============================================================================

/// Label marking a binding as created and managed by the auto-binding generator.
///
/// User-created bindings never carry this label; the generator refuses to touch
/// any binding without it.
pub const LABEL_MANAGED: &str = "backsync.firestoned.io/managed";

/// Value of [`LABEL_MANAGED`] on generated bindings
pub const LABEL_MANAGED_VALUE: &str = "true";

// ============================================================================
// Backsync-Specific Annotations
// ============================================================================

/// Annotation naming the controller that generated a binding
pub const ANNOTATION_MANAGED_BY: &str = "backsync.firestoned.io/managed-by";

/// Value of [`ANNOTATION_MANAGED_BY`] on generated bindings
pub const ANNOTATION_MANAGED_BY_VALUE: &str = "backsync";

/// Annotation recording the VolSync object a generated binding points at
/// (`<lowercase kind>/<name>`)
pub const ANNOTATION_VOLSYNC_REF: &str = "backsync.firestoned.io/volsync-ref";

/// Opt-in/opt-out annotation on VolSync objects controlling auto-binding.
///
/// Truthy values: `true`, `yes`, `1`. Falsy values: `false`, `no`, `0`.
/// The `Annotated` policy requires a truthy value; the `All` policy skips
/// objects with a falsy value.
pub const ANNOTATION_AUTO_BINDING: &str = "backsync.firestoned.io/auto-binding";
