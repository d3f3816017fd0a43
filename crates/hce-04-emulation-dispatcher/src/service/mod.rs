//! # Emulation Dispatcher
//!
//! The synchronous core of the card-emulation session.
//!
//! ## Architecture
//!
//! This service:
//! 1. Consumes `DispatchEvent`s one at a time (`handle`)
//! 2. Resolves frames and SELECTs against the active user's catalog
//! 3. Binds the winning service and relays data once its channel is ready
//! 4. Uses dependency injection for all external dependencies
//!
//! ## Phases
//!
//! ```text
//!            frames                 activated
//!   Idle ───────────→ PollingLoop ─────────────→ WaitForSelect
//!    ↑                                               │ SELECT resolved,
//!    │                                               │ channel ready
//!    │          deactivated                          ↓
//!    └──── WaitForDeactivation ←─────────────── BoundActive
//! ```
//!
//! Channel failure at any point is an implicit deactivation back to `Idle`.

mod binding;
mod polling;
mod session;

use std::collections::HashMap;
use std::sync::Arc;

use hce_03_conflict_resolver::ConflictResolver;
use hce_telemetry::{OBSERVE_MODE_TOGGLES, PENDING_DROPPED};
use shared_bus::{CardEmulationEvent, InMemoryEventBus};
use shared_types::{ComponentName, EmulationPhase, UserId};
use tracing::{debug, info, warn};

use crate::config::DispatcherConfig;
use crate::domain::DispatchState;
use crate::ports::inbound::DispatchEvent;
use crate::ports::outbound::{ApduResponder, ObserveModeController, ServiceBinder};

/// Dependencies for EmulationDispatcher
pub struct DispatcherDependencies {
    pub binder: Arc<dyn ServiceBinder>,
    pub observe_mode: Arc<dyn ObserveModeController>,
    pub responder: Arc<dyn ApduResponder>,
}

/// The Emulation Dispatcher.
pub struct EmulationDispatcher {
    pub(crate) config: DispatcherConfig,
    pub(crate) binder: Arc<dyn ServiceBinder>,
    pub(crate) observe_mode: Arc<dyn ObserveModeController>,
    pub(crate) responder: Arc<dyn ApduResponder>,
    /// Notification sink; routing never depends on it.
    pub(crate) bus: Option<Arc<InMemoryEventBus>>,
    /// One resolver per user, replaced on every published catalog.
    pub(crate) resolvers: HashMap<UserId, ConflictResolver>,
    pub(crate) state: DispatchState,
    pub(crate) next_attempt: u64,
    /// Bind started by the last event, for the runner's timeout.
    pub(crate) started_bind: Option<(ComponentName, u64)>,
}

impl EmulationDispatcher {
    pub fn new(deps: DispatcherDependencies, config: DispatcherConfig, active_user: UserId) -> Self {
        let state = DispatchState::new(active_user, config.pending_capacity);
        Self {
            config,
            binder: deps.binder,
            observe_mode: deps.observe_mode,
            responder: deps.responder,
            bus: None,
            resolvers: HashMap::new(),
            state,
            next_attempt: 1,
            started_bind: None,
        }
    }

    #[must_use]
    pub fn with_event_bus(mut self, bus: Arc<InMemoryEventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> EmulationPhase {
        self.state.phase
    }

    #[must_use]
    pub fn state(&self) -> &DispatchState {
        &self.state
    }

    /// The bind started while handling the last event, if any.
    pub fn take_started_bind(&mut self) -> Option<(ComponentName, u64)> {
        self.started_bind.take()
    }

    /// Applies one event.
    pub fn handle(&mut self, event: DispatchEvent) {
        debug!(event = event.name(), phase = %self.state.phase, "Dispatching");
        match event {
            DispatchEvent::PreferredServiceChanged { user_id, component } => {
                self.on_preferred_service_changed(user_id, component);
            }
            DispatchEvent::PollingFramesDetected(frames) => self.on_polling_frames(frames),
            DispatchEvent::HostEmulationActivated => self.on_activated(),
            DispatchEvent::HostEmulationData(apdu) => self.on_data(apdu),
            DispatchEvent::HostEmulationDeactivated => self.on_deactivated(),
            DispatchEvent::ServiceConnected {
                component,
                user_id,
                channel,
            } => self.on_service_connected(component, user_id, channel),
            DispatchEvent::ServiceDisconnected { component } => {
                if self.state.bound_component() == Some(&component) {
                    self.channel_failed(&component, "service disconnected");
                }
            }
            DispatchEvent::ServiceResponse { component, data } => {
                self.on_service_response(&component, data);
            }
            DispatchEvent::ServicesUpdated(snapshot) => {
                let user_id = snapshot.user_id;
                let stale_preferred = user_id == self.state.active_user
                    && snapshot.has_unknown_default
                    && self
                        .state
                        .preferred
                        .as_ref()
                        .is_some_and(|p| snapshot.service(p).is_none());
                self.resolvers
                    .insert(user_id, ConflictResolver::new(snapshot));
                if stale_preferred {
                    info!(user_id, "Preferred service was removed");
                    self.on_preferred_service_changed(user_id, None);
                }
            }
            DispatchEvent::BindTimedOut { component, attempt } => {
                self.on_bind_timed_out(&component, attempt);
            }
        }
    }

    pub(crate) fn emit(&self, event: CardEmulationEvent) {
        if let Some(bus) = &self.bus {
            bus.emit(event);
        }
    }

    pub(crate) fn set_phase(&mut self, to: EmulationPhase) {
        let from = self.state.phase;
        if from == to {
            return;
        }
        self.state.phase = to;
        debug!(%from, %to, "Phase changed");
        self.emit(CardEmulationEvent::PhaseChanged { from, to });
    }

    pub(crate) fn resolver(&self) -> Option<&ConflictResolver> {
        self.resolvers.get(&self.state.active_user)
    }

    pub(crate) fn drop_pending(&mut self, reason: &str) {
        let dropped = self.state.pending.clear();
        if dropped > 0 {
            PENDING_DROPPED.inc_by(dropped as f64);
            debug!(dropped, reason, "Pending data dropped");
        }
    }

    pub(crate) fn set_observe_mode(&self, enabled: bool) -> bool {
        let success = self.observe_mode.set_observe_mode_enabled(enabled);
        OBSERVE_MODE_TOGGLES
            .with_label_values(&[
                if enabled { "on" } else { "off" },
                if success { "ok" } else { "failed" },
            ])
            .inc();
        if !success {
            warn!(enabled, "Radio refused observe-mode change");
        }
        self.emit(CardEmulationEvent::ObserveModeToggled { enabled, success });
        success
    }

    /// Turns observe mode back on if an auto-transaction turned it off,
    /// unless a preference change since then asked for something else.
    pub(crate) fn restore_observe_mode(&mut self) {
        if self.state.pending_observe_mode_restore {
            self.state.pending_observe_mode_restore = false;
            let enabled = self.state.deferred_observe_default.take().unwrap_or(true);
            self.set_observe_mode(enabled);
        }
    }
}
