// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The binding reconciliation engine.
//!
//! One pass per triggering event (binding change, secret change, VolSync
//! object change, operator-config change):
//!
//! 1. Load operator-wide config; if paused, report `Paused` and stop (pause
//!    precedes validation)
//! 2. Validate the binding spec structurally
//! 3. Resolve the VolSync object, its repository secret name, and the Secret
//! 4. Extract repository coordinates and compute the input hash
//! 5. Register the repository with Backrest when the hash changed or the
//!    binding is not `Ready` (a failed binding with unchanged inputs is still
//!    retried)
//! 6. Run the snapshot-task trigger sub-protocol when enabled
//! 7. Persist status once, with conflict-aware retry
//!
//! All failures funnel through a shared path that maps them onto a `Ready`
//! condition reason and stores only a hash of the error text.

pub mod hash;
pub mod secrets;
pub mod trigger;
pub mod validation;

#[cfg(test)]
mod secrets_tests;
#[cfg(test)]
mod trigger_tests;

pub use hash::{compute_input_hash, hash_string};
pub use validation::{desired_repo_id, validate_binding};

use crate::backrest::{BackrestAuth, BackrestRepoApi, Repo};
use crate::backrest_errors::BackrestError;
use crate::constants::{
    KIND_REPLICATION_SOURCE, REQUEUE_NOT_READY_SECS, REQUEUE_READY_SECS,
    STATUS_CONFLICT_REQUEUE_MILLIS,
};
use crate::context::Context;
use crate::crd::{BackrestVolSyncBinding, SecretRef};
use crate::reconcilers::operator_config::load_operator_config;
use crate::reconcilers::status::{BindingStatusUpdater, StatusPersistOutcome};
use crate::reconcilers::{is_ready, ReconcileError};
use crate::status_reasons::{
    REASON_APPLIED, REASON_BACKREST_ADD_REPO_FAILED, REASON_BACKREST_AUTH_INVALID,
    REASON_INVALID_SPEC, REASON_PAUSED, REASON_REPOSITORY_SECRET_INVALID,
    REASON_REPOSITORY_SECRET_NOT_FOUND, REASON_VOLSYNC_MISSING_REPOSITORY,
    REASON_VOLSYNC_NOT_FOUND,
};
use crate::volsync;
use anyhow::Context as AnyhowContext;
use chrono::Utc;
use k8s_openapi::api::core::v1::Secret;
use kube::api::DynamicObject;
use kube::runtime::controller::Action;
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Index key relating a binding to its resolved repository secret.
///
/// Used by the Secret watch mapper for reverse fan-out: a secret change
/// re-reconciles every binding whose key matches the secret's name.
#[must_use]
pub fn secret_index_key(binding: &BackrestVolSyncBinding) -> Option<String> {
    binding
        .status
        .as_ref()?
        .resolved_repository_secret
        .clone()
        .filter(|name| !name.is_empty())
}

/// Index key relating a binding to its VolSync object
/// (`<lowercase kind>/<name>`).
#[must_use]
pub fn volsync_index_key(binding: &BackrestVolSyncBinding) -> Option<String> {
    let source = &binding.spec.source;
    if source.kind.is_empty() || source.name.is_empty() {
        return None;
    }
    Some(format!("{}/{}", source.kind.to_lowercase(), source.name))
}

/// Whether the repository must be (re)registered this pass.
///
/// The `!is_ready` clause is required so a binding stuck in a failed state
/// with unchanged inputs is still retried on the next reconciliation instead
/// of being wedged forever by hash equality.
#[must_use]
pub fn should_apply_repo(binding: &BackrestVolSyncBinding, input_hash: &str) -> bool {
    let stored = binding
        .status
        .as_ref()
        .and_then(|s| s.last_applied_input_hash.as_deref());
    stored != Some(input_hash) || !is_ready(binding)
}

/// Build the repository registration request.
///
/// Env entries and flags are sorted so the serialized request is stable
/// across reconciliations with identical unsorted input, preventing spurious
/// remote-side diffs.
#[must_use]
pub fn build_repo_request(
    binding: &BackrestVolSyncBinding,
    restic: &secrets::ResticSecret,
) -> Repo {
    let mut env = restic.env.clone();
    env.sort();
    let mut flags = binding.spec.repo.extra_flags.clone().unwrap_or_default();
    flags.sort();

    Repo {
        id: desired_repo_id(binding),
        uri: restic.repository.clone(),
        password: restic.password.clone(),
        env,
        flags,
        auto_unlock: binding.spec.repo.auto_unlock.unwrap_or(false),
        auto_initialize: binding.spec.repo.auto_initialize.unwrap_or(false),
    }
}

/// Register the repository, treating Backrest's "already initialized" answer
/// as success (idempotent re-registration).
pub(crate) async fn apply_repo(
    backrest: &dyn BackrestRepoApi,
    repo: &Repo,
) -> Result<(), BackrestError> {
    match backrest.add_repo(repo).await {
        Ok(_) => Ok(()),
        Err(e) if e.is_already_initialized() => {
            info!(
                repoID = %repo.id,
                "Backrest repo already initialized; treating as applied"
            );
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Reconcile one `BackrestVolSyncBinding`.
///
/// # Errors
///
/// Returns [`ReconcileError::Sanitized`] for failures already mapped onto the
/// `Ready` condition (triggers controller backoff without leaking detail) and
/// [`ReconcileError::Other`] for infrastructure failures such as status-write
/// errors.
pub async fn reconcile_binding(
    ctx: Arc<Context>,
    binding: Arc<BackrestVolSyncBinding>,
) -> Result<Action, ReconcileError> {
    let client = ctx.client.clone();
    let namespace = binding.namespace().unwrap_or_default();
    let name = binding.name_any();
    let generation = binding.metadata.generation;

    info!("Reconciling BackrestVolSyncBinding: {}/{}", namespace, name);

    let config = load_operator_config(&client, &ctx.operator_config).await?;
    let mut updater = BindingStatusUpdater::new(&binding);

    if config.paused {
        info!(
            "Operator is paused, skipping binding {}/{}",
            namespace, name
        );
        updater.set_ready_condition(
            "False",
            REASON_PAUSED,
            "Operator is paused by BackrestVolSyncOperatorConfig",
        );
        updater.set_observed_generation(generation);
        return persist(&client, &updater, Action::requeue(Duration::from_secs(REQUEUE_NOT_READY_SECS))).await;
    }

    let violations = validate_binding(&binding);
    if !violations.is_empty() {
        let message = violations.join("; ");
        warn!(
            namespace = %namespace,
            name = %name,
            "Invalid binding spec: {}",
            message
        );
        updater.set_ready_condition("False", REASON_INVALID_SPEC, &message);
        updater.set_observed_generation(generation);
        return persist(&client, &updater, Action::requeue(Duration::from_secs(REQUEUE_NOT_READY_SECS))).await;
    }

    let vs_obj = match get_volsync_object(&client, &namespace, &binding).await {
        Ok(obj) => obj,
        Err(e) => {
            return fail(&client, &mut updater, generation, REASON_VOLSYNC_NOT_FOUND, &e).await;
        }
    };

    let repo_secret_name = match volsync::repository_secret_name(&vs_obj) {
        Ok(name) => name,
        Err(e) => {
            return fail(
                &client,
                &mut updater,
                generation,
                REASON_VOLSYNC_MISSING_REPOSITORY,
                &anyhow::Error::new(e),
            )
            .await;
        }
    };

    // The repository secret is expected to be namespaced with the VolSync object.
    let secrets_api: Api<Secret> = Api::namespaced(client.clone(), &namespace);
    let repo_secret = match secrets_api.get(&repo_secret_name).await {
        Ok(secret) => secret,
        Err(e) => {
            return fail(
                &client,
                &mut updater,
                generation,
                REASON_REPOSITORY_SECRET_NOT_FOUND,
                &anyhow::Error::new(e),
            )
            .await;
        }
    };

    let allowlist = binding.spec.repo.env_allowlist.clone().unwrap_or_default();
    let restic = match secrets::extract_restic_secret(&repo_secret, &allowlist) {
        Ok(restic) => restic,
        Err(e) => {
            return fail(
                &client,
                &mut updater,
                generation,
                REASON_REPOSITORY_SECRET_INVALID,
                &e,
            )
            .await;
        }
    };

    let input_hash = compute_input_hash(
        &binding,
        vs_obj.metadata.uid.as_deref().unwrap_or_default(),
        repo_secret.metadata.uid.as_deref().unwrap_or_default(),
        repo_secret
            .metadata
            .resource_version
            .as_deref()
            .unwrap_or_default(),
    );
    let should_apply = should_apply_repo(&binding, &input_hash);

    // Track which secret is currently in use, independent of apply success,
    // so the Secret watch can fan back out to this binding.
    if updater.status().resolved_repository_secret.as_deref() != Some(repo_secret_name.as_str()) {
        updater.status_mut().resolved_repository_secret = Some(repo_secret_name.clone());
    }

    let should_trigger = binding.spec.source.kind == KIND_REPLICATION_SOURCE
        && binding.spec.repo.trigger_tasks_on_snapshot.unwrap_or(false);

    if should_apply || should_trigger {
        // Auth is a shared precondition of both remote paths.
        let auth = match load_backrest_auth(&client, &namespace, binding.spec.backrest.auth_ref.as_ref()).await
        {
            Ok(auth) => auth,
            Err(e) => {
                return fail(
                    &client,
                    &mut updater,
                    generation,
                    REASON_BACKREST_AUTH_INVALID,
                    &e,
                )
                .await;
            }
        };
        let backrest = (ctx.backrest_factory)(&binding.spec.backrest.url, auth);

        if should_apply {
            let repo = build_repo_request(&binding, &restic);
            if let Err(e) = apply_repo(backrest.as_ref(), &repo).await {
                return fail(
                    &client,
                    &mut updater,
                    generation,
                    REASON_BACKREST_ADD_REPO_FAILED,
                    &anyhow::Error::new(e),
                )
                .await;
            }

            info!(
                repoID = %repo.id,
                volsyncKind = %binding.spec.source.kind,
                volsyncName = %binding.spec.source.name,
                "Backrest repo applied"
            );
            let status = updater.status_mut();
            status.last_applied_input_hash = Some(input_hash.clone());
            status.last_apply_time = Some(Utc::now().to_rfc3339());
            updater.set_ready_condition(
                "True",
                REASON_APPLIED,
                "Repository registered/updated in Backrest",
            );
        }

        if should_trigger {
            let repo_id = desired_repo_id(&binding);
            trigger::trigger_snapshot_tasks(
                updater.status_mut(),
                &repo_id,
                &vs_obj,
                backrest.as_ref(),
                &namespace,
                &name,
            )
            .await;
        }
    }

    let requeue = if updater
        .status()
        .conditions
        .iter()
        .any(|c| c.r#type == crate::status_reasons::CONDITION_TYPE_READY && c.status == "True")
    {
        Action::requeue(Duration::from_secs(REQUEUE_READY_SECS))
    } else {
        Action::requeue(Duration::from_secs(REQUEUE_NOT_READY_SECS))
    };

    if updater.has_changes() {
        updater.set_observed_generation(generation);
        return persist(&client, &updater, requeue).await;
    }

    debug!(
        "BackrestVolSyncBinding {}/{} unchanged this pass",
        namespace, name
    );
    Ok(requeue)
}

/// Fetch the VolSync object referenced by a binding.
async fn get_volsync_object(
    client: &Client,
    namespace: &str,
    binding: &BackrestVolSyncBinding,
) -> anyhow::Result<DynamicObject> {
    let ar = volsync::volsync_api_resource(&binding.spec.source.kind);
    let api: Api<DynamicObject> = Api::namespaced_with(client.clone(), namespace, &ar);
    api.get(&binding.spec.source.name).await.with_context(|| {
        format!(
            "get {} {}/{}",
            binding.spec.source.kind, namespace, binding.spec.source.name
        )
    })
}

/// Resolve Backrest credentials for a binding.
///
/// No auth reference means anonymous access, not an error.
async fn load_backrest_auth(
    client: &Client,
    namespace: &str,
    auth_ref: Option<&SecretRef>,
) -> anyhow::Result<BackrestAuth> {
    let Some(auth_ref) = auth_ref.filter(|r| !r.name.is_empty()) else {
        return Ok(BackrestAuth::default());
    };

    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = api
        .get(&auth_ref.name)
        .await
        .with_context(|| format!("get auth secret {namespace}/{}", auth_ref.name))?;
    secrets::auth_from_secret(&secret)
}

/// Persist collected status changes, mapping a write conflict onto a short
/// requeue.
async fn persist(
    client: &Client,
    updater: &BindingStatusUpdater,
    action: Action,
) -> Result<Action, ReconcileError> {
    match updater.apply(client).await? {
        StatusPersistOutcome::Conflict => Ok(Action::requeue(Duration::from_millis(
            STATUS_CONFLICT_REQUEUE_MILLIS,
        ))),
        _ => Ok(action),
    }
}

/// The shared failure path.
///
/// Stores a hash of the error text, maps the failure onto the `Ready`
/// condition, persists status, and surfaces a sanitized error so the
/// controller's backoff fires without any secret or internal detail reaching
/// logs.
async fn fail(
    client: &Client,
    updater: &mut BindingStatusUpdater,
    generation: Option<i64>,
    reason: &str,
    err: &anyhow::Error,
) -> Result<Action, ReconcileError> {
    let error_hash = hash_string(&err.to_string());
    updater.status_mut().last_error_hash = Some(error_hash.clone());
    info!(
        reason = %reason,
        errorHash = %error_hash,
        "Reconcile failed"
    );
    updater.set_ready_condition(
        "False",
        reason,
        &format!("{reason} (details omitted; errorHash={error_hash})"),
    );
    updater.set_observed_generation(generation);

    match updater.apply(client).await? {
        StatusPersistOutcome::Conflict => Ok(Action::requeue(Duration::from_millis(
            STATUS_CONFLICT_REQUEUE_MILLIS,
        ))),
        _ => Err(ReconcileError::Sanitized {
            reason: reason.to_string(),
            error_hash,
        }),
    }
}
