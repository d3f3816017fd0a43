//! # Card Emulation Context
//!
//! One explicit object owning the whole routing core. Built once at startup
//! and passed around by reference; nothing here is a process-wide singleton.
//!
//! ```text
//! ServiceRegistry ──publish──→ CatalogForwarder ──┬──→ DispatcherHandle ──→ dispatcher task
//!                                                 └──→ InMemoryEventBus (ServicesUpdated)
//! dispatcher task ──PhaseChanged / BindFailed / ...──→ InMemoryEventBus
//! ```

use std::sync::Arc;

use hce_02_service_registry::{
    AtomicSettingsFile, CatalogSnapshot, RegistryError, ServicePlatform, ServiceRegistry,
    ServiceRegistryApi, ServicesCallback, SettingsFile, UserProfiles,
};
use hce_04_emulation_dispatcher::{
    spawn_dispatcher, ApduResponder, DispatchError, DispatcherDependencies, DispatcherHandle,
    EmulationDispatcher, ObserveModeController, ServiceBinder,
};
use shared_bus::{CardEmulationEvent, EventFilter, InMemoryEventBus, Subscription};
use shared_types::{ComponentName, UserHandle, UserId};
use tokio::task::{JoinError, JoinHandle};
use tokio_stream::StreamExt;
use tracing::info;

use crate::config::RuntimeConfig;

/// Everything the context needs from the platform.
pub struct ContextDependencies {
    pub platform: Arc<dyn ServicePlatform>,
    pub profiles: Arc<dyn UserProfiles>,
    pub dynamic_store: Arc<dyn SettingsFile>,
    pub other_store: Arc<dyn SettingsFile>,
    pub binder: Arc<dyn ServiceBinder>,
    pub observe_mode: Arc<dyn ObserveModeController>,
    pub responder: Arc<dyn ApduResponder>,
}

/// The two settings documents under `config.data_dir`.
pub fn file_stores(config: &RuntimeConfig) -> (Arc<dyn SettingsFile>, Arc<dyn SettingsFile>) {
    (
        Arc::new(AtomicSettingsFile::new(
            &config.data_dir,
            &config.dynamic_settings_file,
        )),
        Arc::new(AtomicSettingsFile::new(
            &config.data_dir,
            &config.other_status_file,
        )),
    )
}

/// Registry callback: hands every catalog to the dispatcher, then announces
/// it on the bus.
struct CatalogForwarder {
    dispatcher: DispatcherHandle,
    bus: Arc<InMemoryEventBus>,
}

impl ServicesCallback for CatalogForwarder {
    fn on_services_updated(&self, snapshot: Arc<CatalogSnapshot>) {
        let event = CardEmulationEvent::ServicesUpdated {
            user_id: snapshot.user_id,
            service_count: snapshot.len(),
            has_unknown_default: snapshot.has_unknown_default,
        };
        ServicesCallback::on_services_updated(&self.dispatcher, snapshot);
        self.bus.emit(event);
    }
}

pub struct CardEmulationContext {
    registry: Arc<ServiceRegistry>,
    dispatcher: DispatcherHandle,
    bus: Arc<InMemoryEventBus>,
    task: JoinHandle<EmulationDispatcher>,
}

impl CardEmulationContext {
    /// Spawns the dispatcher on the current tokio runtime, wires the registry
    /// to it and builds the initial catalogs.
    pub fn start(deps: ContextDependencies, config: &RuntimeConfig) -> Result<Self, RegistryError> {
        let bus = Arc::new(InMemoryEventBus::new());

        let dispatcher = EmulationDispatcher::new(
            DispatcherDependencies {
                binder: deps.binder,
                observe_mode: deps.observe_mode,
                responder: deps.responder,
            },
            config.dispatcher.clone(),
            config.active_user,
        )
        .with_event_bus(Arc::clone(&bus));
        let (handle, task) = spawn_dispatcher(dispatcher);

        let forwarder = Arc::new(CatalogForwarder {
            dispatcher: handle.clone(),
            bus: Arc::clone(&bus),
        });
        let registry = Arc::new(ServiceRegistry::new(
            deps.platform,
            deps.profiles,
            deps.dynamic_store,
            deps.other_store,
            forwarder,
        ));
        registry.initialize()?;
        info!(users = ?registry.users(), active_user = config.active_user, "Card emulation context started");

        Ok(Self {
            registry,
            dispatcher: handle,
            bus,
            task,
        })
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn dispatcher(&self) -> &DispatcherHandle {
        &self.dispatcher
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.bus.subscribe(filter)
    }

    /// Logs every bus event until the bus is dropped with the last of the
    /// context and its dispatcher.
    pub fn spawn_event_log(&self) -> JoinHandle<()> {
        let mut events = self.bus.event_stream(EventFilter::all());
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                info!(topic = ?event.topic(), ?event, "Card emulation event");
            }
        })
    }

    /// Makes `user_id` the active user and `component` its preferred service.
    pub async fn set_preferred_service(
        &self,
        user_id: UserId,
        component: Option<ComponentName>,
    ) -> Result<(), DispatchError> {
        self.dispatcher
            .on_preferred_service_changed(user_id, component)
            .await
    }

    /// Drops a removed profile's catalog.
    pub fn remove_user(&self, user: UserHandle) {
        self.registry.remove_user(user);
        self.bus
            .emit(CardEmulationEvent::UserPurged { user_id: user.id() });
    }

    pub fn set_quiet_mode(&self, user: UserHandle, quiet: bool) -> Result<(), RegistryError> {
        self.registry.set_quiet_mode(user, quiet)?;
        if quiet {
            self.bus
                .emit(CardEmulationEvent::UserPurged { user_id: user.id() });
        }
        Ok(())
    }

    /// Stops the dispatcher once queued events are handled and returns it.
    ///
    /// The task only ends when no other `DispatcherHandle` clone is alive.
    pub async fn shutdown(self) -> Result<EmulationDispatcher, JoinError> {
        let Self {
            registry,
            dispatcher,
            task,
            ..
        } = self;
        drop(registry);
        drop(dispatcher);
        task.await
    }
}
