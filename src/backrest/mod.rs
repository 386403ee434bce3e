// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP client for the Backrest repository-registration API.
//!
//! Backrest exposes a Connect-protocol API; unary calls accept plain JSON
//! `POST`s (`Content-Type: application/json`), which is what this client
//! speaks. Two calls are used by the operator:
//!
//! - `v1.Backrest/AddRepo` - idempotent upsert of a repository configuration
//! - `v1.Backrest/DoRepoTask` - enqueue a named background task
//!
//! Authentication (bearer token or basic credentials) is attached to every
//! outgoing request. The concrete client is reached through the
//! [`BackrestRepoApi`] trait so reconcilers can be driven against mocks; the
//! [`BackrestClientFactory`] indirection keeps construction injectable
//! rather than a process-wide singleton.

pub mod types;

pub use types::{BackrestConfig, DoRepoTaskRequest, Repo, RepoTask};

use crate::backrest_errors::BackrestError;
use crate::constants::BACKREST_REQUEST_TIMEOUT_SECS;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client as HttpClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use types::ConnectError;

/// Credentials attached to every Backrest API call.
///
/// An all-empty value means anonymous access. A bearer token takes priority
/// over basic credentials when both are set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackrestAuth {
    /// Bearer token (takes priority).
    pub bearer_token: Option<String>,

    /// Basic-auth username.
    pub basic_username: Option<String>,

    /// Basic-auth password.
    pub basic_password: Option<String>,
}

impl BackrestAuth {
    /// The `Authorization` header value for these credentials, if any.
    #[must_use]
    pub fn authorization_header(&self) -> Option<String> {
        if let Some(token) = self.bearer_token.as_deref() {
            if !token.is_empty() {
                return Some(format!("Bearer {token}"));
            }
        }
        let user = self.basic_username.as_deref().unwrap_or("");
        let pass = self.basic_password.as_deref().unwrap_or("");
        if user.is_empty() && pass.is_empty() {
            return None;
        }
        Some(format!("Basic {}", BASE64.encode(format!("{user}:{pass}"))))
    }
}

/// The subset of the Backrest API consumed by the binding reconciler.
///
/// Implemented by [`BackrestClient`] for production and by in-memory mocks in
/// tests.
#[async_trait]
pub trait BackrestRepoApi: Send + Sync {
    /// Register or update a repository. Idempotent upsert on the server side.
    ///
    /// # Errors
    ///
    /// Returns a [`BackrestError`] on transport failures or non-success
    /// responses. Callers must treat an error recognized by
    /// [`BackrestError::is_already_initialized`] as success.
    async fn add_repo(&self, repo: &Repo) -> Result<BackrestConfig, BackrestError>;

    /// Enqueue a background task for a repository.
    ///
    /// # Errors
    ///
    /// Returns a [`BackrestError`] on transport failures or non-success
    /// responses.
    async fn do_repo_task(&self, repo_id: &str, task: RepoTask) -> Result<(), BackrestError>;
}

/// Constructor capability for Backrest clients, injected into the reconciler
/// context so tests can swap in mock implementations.
pub type BackrestClientFactory =
    Arc<dyn Fn(&str, BackrestAuth) -> Arc<dyn BackrestRepoApi> + Send + Sync>;

/// The default factory, producing real HTTP clients.
#[must_use]
pub fn default_client_factory() -> BackrestClientFactory {
    Arc::new(|base_url, auth| -> Arc<dyn BackrestRepoApi> {
        Arc::new(BackrestClient::new(base_url, auth))
    })
}

/// Connect-JSON client for the Backrest API.
pub struct BackrestClient {
    http: HttpClient,
    base_url: String,
    auth: BackrestAuth,
}

impl BackrestClient {
    /// Create a client for the given base URL.
    ///
    /// The underlying HTTP client enforces a fixed request timeout; there is
    /// no retry here - retry policy belongs to the surrounding controller.
    #[must_use]
    pub fn new(base_url: &str, auth: BackrestAuth) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(BACKREST_REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    /// Execute one unary Connect call and return the raw response body.
    async fn call<T: serde::Serialize + ?Sized>(
        &self,
        procedure: &str,
        body: &T,
    ) -> Result<String, BackrestError> {
        let url = format!("{}/{procedure}", self.base_url);
        debug!(url = %url, "Calling Backrest API");

        let mut request = self.http.post(&url).json(body);
        if let Some(header) = self.auth.authorization_header() {
            request = request.header(reqwest::header::AUTHORIZATION, header);
        }

        let response = request.send().await.map_err(|e| BackrestError::Transport {
            message: e.to_string(),
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| BackrestError::Transport {
            message: e.to_string(),
        })?;

        if status.is_success() {
            return Ok(text);
        }

        // Connect errors carry {"code": ..., "message": ...}; fall back to the
        // raw body when the error document does not parse.
        let message = serde_json::from_str::<ConnectError>(&text)
            .ok()
            .filter(|e| !e.message.is_empty())
            .map_or(text, |e| e.message);

        Err(BackrestError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

fn record_call(procedure: &str, result: &Result<String, BackrestError>) {
    let status = if result.is_ok() { "success" } else { "error" };
    crate::metrics::BACKREST_CALLS_TOTAL
        .with_label_values(&[procedure, status])
        .inc();
}

#[async_trait]
impl BackrestRepoApi for BackrestClient {
    async fn add_repo(&self, repo: &Repo) -> Result<BackrestConfig, BackrestError> {
        let result = self.call("v1.Backrest/AddRepo", repo).await;
        record_call("add_repo", &result);
        let body = result?;
        serde_json::from_str(&body).map_err(|e| BackrestError::Transport {
            message: format!("decode AddRepo response: {e}"),
        })
    }

    async fn do_repo_task(&self, repo_id: &str, task: RepoTask) -> Result<(), BackrestError> {
        let request = DoRepoTaskRequest {
            repo_id: repo_id.to_string(),
            task,
        };
        let result = self.call("v1.Backrest/DoRepoTask", &request).await;
        record_call("do_repo_task", &result);
        result?;
        Ok(())
    }
}
