//! RBAC inspector runtime.

#![forbid(unsafe_code)]

mod inspector_config;

use std::pin::Pin;

use rbac_inspector_application::{BindingWatchService, RoleResolver};
use rbac_inspector_core::{AppError, AppResult};
use rbac_inspector_domain::{ApiVersion, CanonicalBinding};
use rbac_inspector_infrastructure::KubernetesConnection;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::inspector_config::InspectorConfig;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = InspectorConfig::load()?;
    let connection = KubernetesConnection::connect(&config.connection).await?;
    let apis = connection.apis()?;
    let watch_service = BindingWatchService::new(apis.clone());
    let role_resolver = config.resolve_roles.then(|| RoleResolver::new(apis));

    info!(
        host = %config.connection.host,
        resolve_roles = config.resolve_roles,
        list_on_start = config.list_on_start,
        "rbac-inspector started"
    );

    if config.list_on_start {
        log_snapshot(&watch_service).await;
    }

    let result = run_watch(&watch_service, role_resolver.as_ref()).await;
    let active_watches = watch_service.registry().len().await;
    watch_service.stop_all().await;
    info!(active_watches, "rbac-inspector stopped");

    result
}

async fn log_snapshot(watch_service: &BindingWatchService) {
    for version in ApiVersion::all().iter().copied() {
        match watch_service.list(version).await {
            Ok(bindings) => {
                info!(version = %version, count = bindings.len(), "listed cluster role bindings");
                for binding in &bindings {
                    log_binding("listed", binding);
                }
            }
            Err(error) => {
                warn!(version = %version, error = %error, "failed to list cluster role bindings");
            }
        }
    }
}

async fn run_watch(
    watch_service: &BindingWatchService,
    role_resolver: Option<&RoleResolver>,
) -> AppResult<()> {
    let mut stream = watch_service.start().await?;
    info!(watch_id = %stream.watch_id(), "watching cluster role bindings");

    // Created once: a fresh future misses signals raised while none is subscribed.
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let binding = match until_shutdown(shutdown.as_mut(), stream.recv()).await? {
            Interruptible::Completed(Some(binding)) => binding,
            Interruptible::Completed(None) => {
                warn!(watch_id = %stream.watch_id(), "binding stream ended");
                return Ok(());
            }
            Interruptible::Shutdown => break,
        };

        log_binding("observed", &binding);
        if let Some(role_resolver) = role_resolver {
            let resolution = resolve_and_log(role_resolver, &binding);
            let resolved = until_shutdown(shutdown.as_mut(), resolution).await?;
            if matches!(resolved, Interruptible::Shutdown) {
                break;
            }
        }
    }

    info!(watch_id = %stream.watch_id(), "shutdown signal received");
    Ok(())
}

#[derive(Debug)]
enum Interruptible<T> {
    Completed(T),
    Shutdown,
}

async fn until_shutdown<S, F>(
    shutdown: Pin<&mut S>,
    work: F,
) -> AppResult<Interruptible<F::Output>>
where
    S: Future<Output = std::io::Result<()>>,
    F: Future,
{
    tokio::select! {
        output = work => Ok(Interruptible::Completed(output)),
        signal = shutdown => {
            signal.map_err(|error| {
                AppError::Internal(format!("failed to listen for shutdown signal: {error}"))
            })?;
            Ok(Interruptible::Shutdown)
        }
    }
}

fn log_binding(action: &str, binding: &CanonicalBinding) {
    info!(
        action,
        version = %binding.role.version,
        role = %binding.role.name,
        group = binding.group().unwrap_or_default(),
        service_account = binding.service_account().unwrap_or_default(),
        namespace = binding.namespace().unwrap_or_default(),
        user = binding.user().unwrap_or_default(),
        "cluster role binding"
    );
}

async fn resolve_and_log(role_resolver: &RoleResolver, binding: &CanonicalBinding) {
    match role_resolver.resolve_role(&binding.role).await {
        Ok(role) => {
            for rule in &role.rules {
                info!(
                    version = %role.version,
                    role = %role.name,
                    verbs = %rule.verbs.join(","),
                    resources = %rule.resources.join(","),
                    "role rule"
                );
            }
        }
        Err(error) => {
            warn!(
                version = %error.role().version,
                role = %error.role().name,
                error = %error,
                "failed to resolve role"
            );
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
