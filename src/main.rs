// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use backsync::{
    backrest::default_client_factory,
    constants::{
        DEFAULT_CONFIG_NAME, DEFAULT_CONFIG_NAMESPACE, ENV_CONFIG_NAME, ENV_CONFIG_NAMESPACE,
        KIND_BINDING, KIND_REPLICATION_DESTINATION, KIND_REPLICATION_SOURCE,
    },
    context::{Context, OperatorConfigRef, Stores},
    crd::{BackrestVolSyncBinding, BackrestVolSyncOperatorConfig},
    metrics::{record_reconciliation_error, record_reconciliation_success},
    reconcilers::{
        autobinding::reconcile_autobinding, binding::reconcile_binding, ReconcileError,
    },
    volsync::volsync_api_resource,
};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::DynamicObject,
    runtime::{
        controller::{Action, Controller},
        reflector,
        reflector::ObjectRef,
        watcher,
    },
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("backsync-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Initialize logging with custom format
    //
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Example: RUST_LOG=debug cargo run
    //
    // Respects RUST_LOG_FORMAT environment variable for output format
    // Example: RUST_LOG_FORMAT=json cargo run
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting Backrest VolSync Operator");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let operator_config = OperatorConfigRef {
        namespace: std::env::var(ENV_CONFIG_NAMESPACE)
            .unwrap_or_else(|_| DEFAULT_CONFIG_NAMESPACE.to_string()),
        name: std::env::var(ENV_CONFIG_NAME).unwrap_or_else(|_| DEFAULT_CONFIG_NAME.to_string()),
    };
    info!(
        "Operator config object: {}/{}",
        operator_config.namespace, operator_config.name
    );

    // Reflector store of all bindings, shared with the watch mappers for
    // reverse lookups (secret name -> bindings, volsync key -> bindings).
    let bindings_api = Api::<BackrestVolSyncBinding>::all(client.clone());
    let (bindings_store, bindings_writer) = reflector::store();
    let bindings_reflector = reflector::reflector(
        bindings_writer,
        watcher(bindings_api.clone(), watcher::Config::default()),
    );
    tokio::spawn(async move {
        bindings_reflector
            .for_each(|_| futures::future::ready(()))
            .await;
    });

    let ctx = Arc::new(Context {
        client: client.clone(),
        stores: Stores {
            bindings: bindings_store,
        },
        backrest_factory: default_client_factory(),
        operator_config,
    });

    info!("Starting all controllers");

    // Controllers should never exit - if one does, we log it and exit the main process
    tokio::select! {
        result = run_binding_controller(client.clone(), ctx.clone()) => {
            error!("CRITICAL: BackrestVolSyncBinding controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("BackrestVolSyncBinding controller exited unexpectedly without error")
        }
        result = run_autobinding_controller(client.clone(), ctx.clone(), KIND_REPLICATION_SOURCE) => {
            error!("CRITICAL: ReplicationSource auto-binding controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("ReplicationSource auto-binding controller exited unexpectedly without error")
        }
        result = run_autobinding_controller(client.clone(), ctx.clone(), KIND_REPLICATION_DESTINATION) => {
            error!("CRITICAL: ReplicationDestination auto-binding controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("ReplicationDestination auto-binding controller exited unexpectedly without error")
        }
    }
}

/// Run the `BackrestVolSyncBinding` controller.
///
/// Besides binding changes, three watch sources fan back into bindings:
/// - Secrets, via the resolved-repository-secret reverse index
/// - VolSync objects, via the `<lowercase kind>/<name>` reverse index
/// - the operator config object, which requeues every binding (pause and
///   policy changes apply operator-wide)
async fn run_binding_controller(client: Client, ctx: Arc<Context>) -> Result<()> {
    info!("Starting BackrestVolSyncBinding controller");

    let api = Api::<BackrestVolSyncBinding>::all(client.clone());
    let secrets_api = Api::<Secret>::all(client.clone());
    let config_api = Api::<BackrestVolSyncOperatorConfig>::all(client.clone());

    let secret_ctx = ctx.clone();
    let config_ctx = ctx.clone();

    let rs_resource = volsync_api_resource(KIND_REPLICATION_SOURCE);
    let rd_resource = volsync_api_resource(KIND_REPLICATION_DESTINATION);
    let rs_api = Api::<DynamicObject>::all_with(client.clone(), &rs_resource);
    let rd_api = Api::<DynamicObject>::all_with(client.clone(), &rd_resource);
    let rs_ctx = ctx.clone();
    let rd_ctx = ctx.clone();

    Controller::new(api, watcher::Config::default())
        .watches(
            secrets_api,
            watcher::Config::default(),
            move |secret: Secret| {
                let namespace = secret.namespace().unwrap_or_default();
                let name = secret.name_any();
                binding_refs(secret_ctx.stores.bindings_for_secret(&namespace, &name))
            },
        )
        .watches(
            config_api,
            watcher::Config::default(),
            move |config: BackrestVolSyncOperatorConfig| {
                let matches = config.namespace().as_deref()
                    == Some(config_ctx.operator_config.namespace.as_str())
                    && config.name_any() == config_ctx.operator_config.name;
                if matches {
                    // Bindings can exist in any namespace, so requeue them all.
                    binding_refs(config_ctx.stores.all_bindings())
                } else {
                    Vec::new()
                }
            },
        )
        .watches_with(
            rs_api,
            rs_resource.clone(),
            watcher::Config::default(),
            move |obj: DynamicObject| {
                let namespace = obj.namespace().unwrap_or_default();
                let key = format!("replicationsource/{}", obj.name_any());
                binding_refs(rs_ctx.stores.bindings_for_volsync(&namespace, &key))
            },
        )
        .watches_with(
            rd_api,
            rd_resource.clone(),
            watcher::Config::default(),
            move |obj: DynamicObject| {
                let namespace = obj.namespace().unwrap_or_default();
                let key = format!("replicationdestination/{}", obj.name_any());
                binding_refs(rd_ctx.stores.bindings_for_volsync(&namespace, &key))
            },
        )
        .run(reconcile_binding_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run one auto-binding controller over a VolSync kind.
async fn run_autobinding_controller(client: Client, ctx: Arc<Context>, kind: &str) -> Result<()> {
    info!("Starting {kind} auto-binding controller");

    let resource = volsync_api_resource(kind);
    let api = Api::<DynamicObject>::all_with(client, &resource);

    Controller::new_with(api, watcher::Config::default(), resource)
        .run(reconcile_autobinding_wrapper, error_policy_autobinding, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Convert reverse-lookup results into controller object references.
fn binding_refs(pairs: Vec<(String, String)>) -> Vec<ObjectRef<BackrestVolSyncBinding>> {
    pairs
        .into_iter()
        .map(|(name, namespace)| ObjectRef::new(&name).within(&namespace))
        .collect()
}

/// Reconcile wrapper for `BackrestVolSyncBinding`
async fn reconcile_binding_wrapper(
    binding: Arc<BackrestVolSyncBinding>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    match reconcile_binding(ctx, binding.clone()).await {
        Ok(action) => {
            debug!(
                "Successfully reconciled BackrestVolSyncBinding: {}",
                binding.name_any()
            );
            record_reconciliation_success(KIND_BINDING, start.elapsed());
            Ok(action)
        }
        Err(e) => {
            // The error text is already sanitized (reason + hash only).
            error!(
                "Failed to reconcile BackrestVolSyncBinding {}: {}",
                binding.name_any(),
                e
            );
            record_reconciliation_error(KIND_BINDING, start.elapsed());
            Err(e)
        }
    }
}

/// Reconcile wrapper for the auto-binding controllers
async fn reconcile_autobinding_wrapper(
    obj: Arc<DynamicObject>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let kind = obj
        .types
        .as_ref()
        .map(|t| t.kind.clone())
        .unwrap_or_default();
    let start = Instant::now();
    match reconcile_autobinding(ctx, obj.clone()).await {
        Ok(()) => {
            record_reconciliation_success(&kind, start.elapsed());
            Ok(Action::requeue(Duration::from_secs(300)))
        }
        Err(e) => {
            error!(
                "Failed to reconcile auto-binding for {} {}: {}",
                kind,
                obj.name_any(),
                e
            );
            record_reconciliation_error(&kind, start.elapsed());
            Err(ReconcileError::Other(e))
        }
    }
}

/// Error policy for the binding controller
fn error_policy(
    _resource: Arc<impl std::fmt::Debug>,
    _err: &ReconcileError,
    _ctx: Arc<Context>,
) -> Action {
    Action::requeue(Duration::from_secs(30))
}

/// Error policy for the auto-binding controllers
fn error_policy_autobinding(
    _resource: Arc<DynamicObject>,
    _err: &ReconcileError,
    _ctx: Arc<Context>,
) -> Action {
    Action::requeue(Duration::from_secs(30))
}
