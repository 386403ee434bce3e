// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for Backrest API operations.
//!
//! These errors provide structured error handling for remote repository
//! registration and task calls, enabling precise mapping onto status
//! conditions without string matching at call sites. One deliberate
//! exception: Backrest reports re-registration of an existing repository as
//! an error whose text contains "already initialized", which callers must
//! treat as success ([`BackrestError::is_already_initialized`]).

use thiserror::Error;

/// Errors that can occur calling the Backrest API.
#[derive(Error, Debug, Clone)]
pub enum BackrestError {
    /// The server answered with a non-success status.
    ///
    /// `message` carries the Connect error message when the body parsed,
    /// otherwise the raw response body.
    #[error("Backrest API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code returned by the server
        status: u16,
        /// Error message reported by the server
        message: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("Backrest request failed: {message}")]
    Transport {
        /// Transport-level failure description
        message: String,
    },
}

impl BackrestError {
    /// Whether this error is Backrest's idempotent re-registration signal.
    ///
    /// Backrest rejects `AddRepo` for a repository that already exists with
    /// an error containing "already initialized"; the registration is in fact
    /// in the desired state, so callers treat this as success.
    #[must_use]
    pub fn is_already_initialized(&self) -> bool {
        let message = match self {
            BackrestError::Api { message, .. } => message,
            BackrestError::Transport { message } => message,
        };
        message.to_lowercase().contains("already initialized")
    }
}

#[cfg(test)]
#[path = "backrest_errors_tests.rs"]
mod backrest_errors_tests;
