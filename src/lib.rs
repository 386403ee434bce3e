// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # Backsync - Backrest VolSync Operator for Kubernetes
//!
//! Backsync is a Kubernetes operator written in Rust that binds VolSync
//! replication resources to a [Backrest](https://github.com/garethgeorge/backrest)
//! backup server through Custom Resource Definitions (CRDs).
//!
//! ## Overview
//!
//! This library provides the core functionality for the Backsync operator,
//! including:
//!
//! - Custom Resource Definitions for bindings and operator configuration
//! - The binding reconciliation engine: idempotent repository registration
//!   keyed by an input hash, snapshot-task triggering deduplicated by
//!   completion markers, and secret-safe status reporting
//! - A Connect-JSON client for the Backrest API
//! - An auto-binding generator creating bindings for VolSync objects when
//!   the operator-wide policy allows
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types
//! - [`reconcilers`] - Reconciliation logic for each resource type
//! - [`backrest`] - Backrest API client and trait
//! - [`volsync`] - Accessors for VolSync objects (secret name, completion marker)
//! - [`context`] - Shared context and reflector stores for the controllers
//!
//! ## Example
//!
//! ```rust,no_run
//! use backsync::crd::{
//!     BackrestConnection, BackrestVolSyncBindingSpec, VolSyncSourceRef,
//! };
//!
//! let spec = BackrestVolSyncBindingSpec {
//!     backrest: BackrestConnection {
//!         url: "http://backrest.backup-system:9898".to_string(),
//!         auth_ref: None,
//!     },
//!     source: VolSyncSourceRef {
//!         kind: "ReplicationSource".to_string(),
//!         name: "database".to_string(),
//!     },
//!     repo: Default::default(),
//! };
//! ```
//!
//! ## Guarantees
//!
//! - **Idempotence** - unchanged inputs never produce a second remote call
//! - **Secret safety** - status and surfaced errors carry SHA-256 digests of
//!   error text, never raw errors or secret material
//! - **Trigger dedup** - repeated syncs with an unchanged snapshot identity
//!   never re-enqueue snapshot tasks

pub mod backrest;
pub mod backrest_errors;
pub mod constants;
pub mod context;
pub mod crd;
pub mod labels;
pub mod metrics;
pub mod reconcilers;
pub mod status_reasons;
pub mod volsync;
