//! # HCE Runtime Binary
//!
//! Loads a JSON service manifest as the installed-service platform, builds
//! the catalogs and logs them. Binds, observe-mode changes and reader
//! responses are logged instead of reaching hardware.

use std::sync::Arc;

use anyhow::{Context, Result};
use hce_02_service_registry::{ServicePlatform, ServiceRegistryApi, StaticUserProfiles};
use hce_runtime::adapters::{LoggingBinder, LoggingObserveMode, LoggingResponder, ManifestPlatform};
use hce_runtime::{file_stores, CardEmulationContext, ContextDependencies, RuntimeConfig};
use hce_telemetry::{encode_metrics, init_telemetry};
use shared_types::UserHandle;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env().context("Invalid HCE_* configuration")?;
    let _telemetry =
        init_telemetry(config.telemetry.clone()).context("Failed to initialize telemetry")?;

    info!("===========================================");
    info!("  HCE Routing Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let platform: Arc<dyn ServicePlatform> = match &config.manifest_path {
        Some(path) => Arc::new(
            ManifestPlatform::load(path)
                .with_context(|| format!("Failed to load manifest {}", path.display()))?,
        ),
        None => {
            warn!("HCE_MANIFEST not set; starting with no installed services");
            Arc::new(ManifestPlatform::default())
        }
    };
    let (dynamic_store, other_store) = file_stores(&config);

    let context = CardEmulationContext::start(
        ContextDependencies {
            platform,
            profiles: Arc::new(StaticUserProfiles::new(UserHandle::of(config.active_user))),
            dynamic_store,
            other_store,
            binder: Arc::new(LoggingBinder),
            observe_mode: Arc::new(LoggingObserveMode),
            responder: Arc::new(LoggingResponder),
        },
        &config,
    )
    .context("Failed to initialize service registry")?;

    for user_id in context.registry().users() {
        for service in context.registry().services(user_id) {
            info!(
                user_id,
                component = %service.component,
                kind = ?service.kind,
                aids = ?service.aid_groups().iter().flat_map(|g| g.aids.iter()).collect::<Vec<_>>(),
                polling_filters = service.polling_loop_filters.len(),
                pattern_filters = service.polling_loop_pattern_filters.len(),
                "Service"
            );
        }
    }
    let event_log = context.spawn_event_log();
    info!(data_dir = ?config.data_dir, "Routing core running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    info!("Initiating graceful shutdown...");

    let dispatcher = context.shutdown().await.context("Dispatcher task failed")?;
    info!(phase = %dispatcher.phase(), "Dispatcher stopped");
    drop(dispatcher);
    if let Err(e) = event_log.await {
        warn!(error = %e, "Event log task failed");
    }
    match encode_metrics() {
        Ok(metrics) => debug!(%metrics, "Final metrics"),
        Err(e) => warn!(error = %e, "Metrics not encoded"),
    }
    Ok(())
}
