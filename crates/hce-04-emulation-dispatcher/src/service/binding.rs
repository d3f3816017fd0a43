//! Bind lifecycle: preferred-service changes, connection, failure, timeout.

use super::*;
use crate::domain::{Binding, PendingItem};
use crate::ports::outbound::{BindRequest, ServiceMessage, SharedChannel};
use hce_telemetry::{APDUS_FORWARDED, BINDS};

impl EmulationDispatcher {
    pub(crate) fn on_preferred_service_changed(
        &mut self,
        user_id: UserId,
        component: Option<ComponentName>,
    ) {
        info!(
            user_id,
            component = ?component,
            "Preferred service changed"
        );
        self.emit(CardEmulationEvent::PreferredServiceChanged {
            user_id,
            component: component.clone(),
        });
        self.state.active_user = user_id;
        self.state.preferred = component.clone();

        let known = component.as_ref().and_then(|c| {
            self.resolver()
                .and_then(|r| r.snapshot().service(c).cloned())
        });
        if let Some(service) = &known {
            self.apply_observe_default(service.should_default_to_observe_mode);
        }

        // A SELECTed service keeps its binding until the field goes away;
        // deactivation rebinds the new preference.
        if self.state.phase.in_session() && self.state.selected.is_some() {
            debug!(
                selected = ?self.state.selected,
                "Session in progress; preferred service takes over on deactivation"
            );
            return;
        }
        self.drop_pending("preferred service changed");

        let Some(component) = component else {
            self.unbind_current();
            return;
        };

        match &known {
            Some(service) if !service.is_on_host() => {
                debug!(component = %component, "Preferred service is off-host; nothing to bind");
                self.unbind_current();
            }
            _ => {
                if !self.bind(&component, user_id) && !self.state.phase.in_session() {
                    self.set_phase(EmulationPhase::Idle);
                }
            }
        }
    }

    /// Applies a preferred service's observe-mode default, or holds it
    /// until the pending post-transaction restore runs.
    fn apply_observe_default(&mut self, enabled: bool) {
        if self.state.pending_observe_mode_restore {
            debug!(enabled, "Observe-mode restore pending; deferring default");
            self.state.deferred_observe_default = Some(enabled);
        } else {
            self.set_observe_mode(enabled);
        }
    }

    /// Starts binding `component` unless it is already bound. A different
    /// bound service is released first. Returns whether a binding exists
    /// afterwards.
    pub(crate) fn bind(&mut self, component: &ComponentName, user_id: UserId) -> bool {
        if self.state.is_bound_to(component, user_id) {
            return true;
        }
        self.unbind_current();

        let attempt = self.next_attempt;
        self.next_attempt += 1;
        let request = BindRequest {
            component: component.clone(),
            user_id,
            allow_background_start: true,
        };
        match self.binder.bind(&request) {
            Ok(()) => {
                BINDS.with_label_values(&["requested"]).inc();
                info!(component = %component, user_id, attempt, "Binding service");
                self.state.bound = Some(Binding {
                    component: component.clone(),
                    user_id,
                    channel: None,
                    attempt,
                });
                self.started_bind = Some((component.clone(), attempt));
                true
            }
            Err(e) => {
                BINDS.with_label_values(&["failed"]).inc();
                warn!(component = %component, user_id, error = %e, "Bind failed");
                self.emit(CardEmulationEvent::BindFailed {
                    component: component.clone(),
                    user_id,
                    reason: e.to_string(),
                });
                false
            }
        }
    }

    pub(crate) fn unbind_current(&mut self) {
        if let Some(binding) = self.state.bound.take() {
            info!(component = %binding.component, user_id = binding.user_id, "Unbinding service");
            self.binder.unbind(&binding.component, binding.user_id);
        }
    }

    pub(crate) fn on_service_connected(
        &mut self,
        component: ComponentName,
        user_id: UserId,
        channel: SharedChannel,
    ) {
        match self.state.bound.as_mut() {
            Some(binding) if binding.is(&component, user_id) => {
                binding.channel = Some(channel.clone());
            }
            _ => {
                debug!(component = %component, user_id, "Ignoring connection of a stale bind");
                return;
            }
        }
        BINDS.with_label_values(&["connected"]).inc();
        info!(component = %component, user_id, "Service connected");

        for item in self.state.pending.drain() {
            if !self.send_now(&channel, &component, item) {
                return;
            }
        }

        if self.state.phase == EmulationPhase::WaitForSelect
            && self.state.selected.as_ref() == Some(&component)
        {
            self.set_phase(EmulationPhase::BoundActive);
        }
    }

    pub(crate) fn on_bind_timed_out(&mut self, component: &ComponentName, attempt: u64) {
        let pending = self
            .state
            .bound
            .as_ref()
            .is_some_and(|b| &b.component == component && b.attempt == attempt && !b.is_connected());
        if !pending {
            return;
        }
        BINDS.with_label_values(&["timed_out"]).inc();
        warn!(component = %component, attempt, "Bind timed out; abandoning");
        if let Some(binding) = &self.state.bound {
            self.emit(CardEmulationEvent::BindFailed {
                component: component.clone(),
                user_id: binding.user_id,
                reason: "timed out".into(),
            });
        }
        self.unbind_current();
        self.drop_pending("bind timed out");
        if self.state.selected.as_ref() == Some(component) {
            self.state.selected = None;
        }
        if self.state.phase == EmulationPhase::PollingLoop {
            self.set_phase(EmulationPhase::Idle);
        }
    }

    /// Sends now if the channel is ready, queues if a bind is pending, drops
    /// otherwise.
    pub(crate) fn deliver(&mut self, item: PendingItem) {
        let target = self
            .state
            .bound
            .as_ref()
            .map(|b| (b.component.clone(), b.channel.clone()));
        match target {
            Some((component, Some(channel))) => {
                self.send_now(&channel, &component, item);
            }
            Some((component, None)) => {
                if self.state.pending.push(item).is_some() {
                    PENDING_DROPPED.inc();
                    warn!(component = %component, "Pending queue full; dropped oldest item");
                }
            }
            None => debug!("No bound service; dropping data"),
        }
    }

    /// Returns false if the channel failed.
    pub(crate) fn send_now(
        &mut self,
        channel: &SharedChannel,
        component: &ComponentName,
        item: PendingItem,
    ) -> bool {
        let message = match item {
            PendingItem::Apdu(apdu) => ServiceMessage::CommandApdu(apdu),
            PendingItem::Frames(frames) => ServiceMessage::PollingFrames(frames),
        };
        let is_apdu = matches!(message, ServiceMessage::CommandApdu(_));
        match channel.send(message) {
            Ok(()) => {
                if is_apdu {
                    APDUS_FORWARDED.inc();
                }
                true
            }
            Err(e) => {
                self.channel_failed(component, &e.to_string());
                false
            }
        }
    }

    /// Implicit deactivation: release the binding and return to `Idle`.
    pub(crate) fn channel_failed(&mut self, component: &ComponentName, reason: &str) {
        warn!(component = %component, reason, phase = %self.state.phase, "Service channel failed");
        self.unbind_current();
        self.drop_pending("channel failed");
        self.state.selected = None;
        self.restore_observe_mode();
        self.set_phase(EmulationPhase::Idle);
    }
}
