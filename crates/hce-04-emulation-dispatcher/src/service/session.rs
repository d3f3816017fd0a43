//! Reader sessions: activation, APDUs, responses and deactivation.

use super::*;
use crate::domain::{select_aid, PendingItem, SW_FILE_NOT_FOUND, SW_UNKNOWN_ERROR};
use hce_03_conflict_resolver::{Candidate, Resolution};
use hce_telemetry::APDUS_REJECTED;
use crate::ports::outbound::ServiceMessage;

impl EmulationDispatcher {
    pub(crate) fn on_activated(&mut self) {
        info!(user_id = self.state.active_user, "Host emulation activated");
        self.state.selected = None;
        self.set_phase(EmulationPhase::WaitForSelect);
    }

    pub(crate) fn on_data(&mut self, apdu: Vec<u8>) {
        let aid = select_aid(&apdu);
        match (self.state.phase, aid) {
            (EmulationPhase::WaitForSelect | EmulationPhase::BoundActive, Some(aid)) => {
                self.on_select(aid, apdu);
            }
            (EmulationPhase::BoundActive, None) => self.deliver(PendingItem::Apdu(apdu)),
            // Follow-up commands while the selected service is still binding.
            (EmulationPhase::WaitForSelect, None) if self.state.selected.is_some() => {
                self.deliver(PendingItem::Apdu(apdu));
            }
            (EmulationPhase::WaitForSelect, None) => {
                self.reject(SW_UNKNOWN_ERROR, "command before any SELECT");
            }
            (phase, _) => {
                debug!(%phase, "APDU outside a card session");
                self.reject(SW_UNKNOWN_ERROR, "no active session");
            }
        }
    }

    fn on_select(&mut self, aid: String, apdu: Vec<u8>) {
        let resolution = match self.resolver() {
            Some(resolver) => resolver.resolve_aid(&aid, self.state.preferred.as_ref()),
            None => Resolution::NoMatch,
        };

        let winner = match resolution {
            Resolution::Resolved(winner) => winner,
            Resolution::Ambiguous(candidates) => {
                let candidates: Vec<ComponentName> =
                    candidates.iter().map(|c| c.component().clone()).collect();
                info!(aid = %aid, candidates = candidates.len(), "SELECT is ambiguous");
                self.emit(CardEmulationEvent::AmbiguousSelection {
                    aid: aid.clone(),
                    candidates,
                });
                self.reject(SW_FILE_NOT_FOUND, "ambiguous AID");
                return;
            }
            Resolution::NoMatch => {
                debug!(aid = %aid, "No service registered for AID");
                self.reject(SW_FILE_NOT_FOUND, "unknown AID");
                return;
            }
        };

        let service = winner.service;
        if !service.is_on_host() {
            debug!(aid = %aid, component = %service.component, "AID routed off-host");
            self.reject(SW_FILE_NOT_FOUND, "off-host AID");
            return;
        }

        let component = service.component.clone();
        if self.state.selected.as_ref() != Some(&component) {
            debug!(aid = %aid, component = %component, "SELECT resolved");
            self.drop_pending("new selection");
            if let Some(previous) = self.state.selected.take() {
                self.send_deactivated(&previous);
            }
        }
        if !self.bind(&component, service.user_id) {
            self.state.selected = None;
            self.set_phase(EmulationPhase::WaitForSelect);
            self.reject(SW_UNKNOWN_ERROR, "bind failed");
            return;
        }
        self.state.selected = Some(component);

        let connected = self.state.bound.as_ref().is_some_and(|b| b.is_connected());
        self.set_phase(if connected {
            EmulationPhase::BoundActive
        } else {
            EmulationPhase::WaitForSelect
        });
        self.deliver(PendingItem::Apdu(apdu));
    }

    pub(crate) fn on_service_response(&mut self, component: &ComponentName, data: Vec<u8>) {
        let from_selected = self.state.phase == EmulationPhase::BoundActive
            && self.state.selected.as_ref() == Some(component);
        if from_selected {
            self.responder.send_response(data);
        } else {
            warn!(component = %component, phase = %self.state.phase, "Dropping response from unselected service");
        }
    }

    pub(crate) fn on_deactivated(&mut self) {
        info!("Host emulation deactivated");
        self.set_phase(EmulationPhase::WaitForDeactivation);
        self.drop_pending("deactivated");
        if let Some(selected) = self.state.selected.take() {
            self.send_deactivated(&selected);
        }
        self.restore_observe_mode();

        // Only the preferred service stays bound between sessions.
        let keep = match (&self.state.bound, &self.state.preferred) {
            (Some(bound), Some(preferred)) => &bound.component == preferred,
            _ => false,
        };
        if !keep {
            self.unbind_current();
            if let Some(preferred) = self.state.preferred.clone() {
                let on_host = self
                    .resolver()
                    .and_then(|r| r.snapshot().service(&preferred).map(|s| s.is_on_host()))
                    .unwrap_or(true);
                if on_host {
                    let user_id = self.state.active_user;
                    self.bind(&preferred, user_id);
                }
            }
        }
        self.set_phase(EmulationPhase::Idle);
    }

    fn send_deactivated(&mut self, component: &ComponentName) {
        let channel = self
            .state
            .bound
            .as_ref()
            .filter(|b| &b.component == component)
            .and_then(|b| b.channel.clone());
        if let Some(channel) = channel {
            if let Err(e) = channel.send(ServiceMessage::Deactivated) {
                debug!(component = %component, error = %e, "Deactivation notice not delivered");
            }
        }
    }

    fn reject(&self, status: [u8; 2], reason: &str) {
        let status_hex = hex::encode_upper(status);
        APDUS_REJECTED.with_label_values(&[status_hex.as_str()]).inc();
        debug!(status = %status_hex, reason, "Rejecting APDU");
        self.responder.send_response(status.to_vec());
    }
}
