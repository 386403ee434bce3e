// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The input-hash fingerprint used for idempotent-apply decisions.

use crate::crd::BackrestVolSyncBinding;
use sha2::{Digest, Sha256};

use super::validation::desired_repo_id;

/// SHA-256 hex digest of a string.
///
/// Used both for input fingerprints and for sanitizing error text before it
/// crosses into status. A change-detection fingerprint, not a security
/// primitive.
#[must_use]
pub fn hash_string(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Collapse all apply-relevant inputs into a single fingerprint.
///
/// Every field is followed by a null byte so concatenation ambiguity cannot
/// produce false collisions across different inputs. List fields are sorted
/// first, so orderings of `extraFlags`/`envAllowlist` that differ only in
/// order hash identically.
///
/// Equal hash ⇔ (with overwhelming probability) all tracked inputs are
/// unchanged. The VolSync object's UID and the secret's UID plus
/// `resourceVersion` are included so a recreated object or an edited secret
/// always forces a re-apply.
#[must_use]
pub fn compute_input_hash(
    binding: &BackrestVolSyncBinding,
    volsync_uid: &str,
    secret_uid: &str,
    secret_resource_version: &str,
) -> String {
    let mut hasher = Sha256::new();
    let mut write = |s: &str| {
        hasher.update(s.as_bytes());
        hasher.update([0u8]);
    };

    let spec = &binding.spec;
    write(&spec.backrest.url);
    write(&spec.source.kind);
    write(&spec.source.name);
    write(&desired_repo_id(binding));
    write(&format!(
        "autoUnlock={}",
        spec.repo.auto_unlock.unwrap_or(false)
    ));
    write(&format!(
        "autoInitialize={}",
        spec.repo.auto_initialize.unwrap_or(false)
    ));

    let mut flags = spec.repo.extra_flags.clone().unwrap_or_default();
    flags.sort();
    write(&format!("flags={}", flags.join(",")));

    let mut allowlist = spec.repo.env_allowlist.clone().unwrap_or_default();
    allowlist.sort();
    write(&format!("envAllowlist={}", allowlist.join(",")));

    write(&format!("volsync.uid={volsync_uid}"));
    write(&format!("secret.uid={secret_uid}"));
    write(&format!("secret.rv={secret_resource_version}"));

    format!("{:x}", hasher.finalize())
}
