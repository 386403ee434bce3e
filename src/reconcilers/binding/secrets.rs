// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Repository-secret extraction and Backrest auth-secret parsing.
//!
//! Both extractors are pure functions over a Secret snapshot. Error messages
//! name keys only, never values, so they are safe to hash and log.

use crate::backrest::BackrestAuth;
use crate::constants::{
    AUTH_KEY_PASSWORD, AUTH_KEY_TOKEN, AUTH_KEY_USERNAME, SECRET_KEY_RESTIC_PASSWORD,
    SECRET_KEY_RESTIC_PREFIX, SECRET_KEY_RESTIC_REPOSITORY,
};
use anyhow::{bail, Result};
use k8s_openapi::api::core::v1::Secret;

/// The repository coordinates extracted from a restic repository Secret.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResticSecret {
    /// Restic repository URI (`RESTIC_REPOSITORY`, trimmed).
    pub repository: String,

    /// Repository passphrase (`RESTIC_PASSWORD`, not trimmed).
    pub password: String,

    /// Forwarded environment entries (`KEY=VALUE`), unsorted.
    pub env: Vec<String>,
}

fn secret_value(secret: &Secret, key: &str) -> Result<Option<String>> {
    let Some(data) = secret.data.as_ref() else {
        return Ok(None);
    };
    let Some(bytes) = data.get(key) else {
        return Ok(None);
    };
    match String::from_utf8(bytes.0.clone()) {
        Ok(s) => Ok(Some(s)),
        Err(_) => bail!("secret key {key:?} is not valid UTF-8"),
    }
}

/// Extract repository URI, passphrase, and forwarded env entries from a
/// restic repository Secret.
///
/// Every key other than `RESTIC_REPOSITORY`/`RESTIC_PASSWORD` that is not
/// prefixed `RESTIC_` becomes a `KEY=VALUE` env entry, unless a non-empty
/// allow-list is given, in which case only allow-listed keys are included.
/// No ordering guarantee; callers sort before hashing or sending.
///
/// # Errors
///
/// Fails when either required key is missing/empty or a value is not UTF-8.
/// The error text names keys only.
pub fn extract_restic_secret(secret: &Secret, allowlist: &[String]) -> Result<ResticSecret> {
    let repository = secret_value(secret, SECRET_KEY_RESTIC_REPOSITORY)?
        .unwrap_or_default()
        .trim()
        .to_string();
    let password = secret_value(secret, SECRET_KEY_RESTIC_PASSWORD)?.unwrap_or_default();

    if repository.is_empty() {
        bail!("missing {SECRET_KEY_RESTIC_REPOSITORY}");
    }
    if password.is_empty() {
        bail!("missing {SECRET_KEY_RESTIC_PASSWORD}");
    }

    let mut env = Vec::new();
    if let Some(data) = secret.data.as_ref() {
        for key in data.keys() {
            if key == SECRET_KEY_RESTIC_REPOSITORY || key == SECRET_KEY_RESTIC_PASSWORD {
                continue;
            }
            if key.starts_with(SECRET_KEY_RESTIC_PREFIX) {
                continue;
            }
            if !allowlist.is_empty() && !allowlist.iter().any(|k| k == key) {
                continue;
            }
            let value = secret_value(secret, key)?.unwrap_or_default();
            env.push(format!("{key}={value}"));
        }
    }

    Ok(ResticSecret {
        repository,
        password,
        env,
    })
}

/// Parse Backrest credentials from an auth Secret.
///
/// A non-empty `token` key yields bearer auth and takes priority; otherwise
/// `username`/`password` yield basic auth.
///
/// # Errors
///
/// Fails when neither a token nor any basic credential is present, or a value
/// is not UTF-8.
pub fn auth_from_secret(secret: &Secret) -> Result<BackrestAuth> {
    if let Some(token) = secret_value(secret, AUTH_KEY_TOKEN)? {
        if !token.is_empty() {
            return Ok(BackrestAuth {
                bearer_token: Some(token),
                ..BackrestAuth::default()
            });
        }
    }

    let username = secret_value(secret, AUTH_KEY_USERNAME)?.unwrap_or_default();
    let password = secret_value(secret, AUTH_KEY_PASSWORD)?.unwrap_or_default();
    if username.is_empty() && password.is_empty() {
        bail!("auth secret must contain either 'token' or 'username'/'password'");
    }

    Ok(BackrestAuth {
        bearer_token: None,
        basic_username: Some(username),
        basic_password: Some(password),
    })
}
