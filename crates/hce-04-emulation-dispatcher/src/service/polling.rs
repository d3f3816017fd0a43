//! Polling-loop frame batches.

use super::*;
use crate::domain::PendingItem;
use hce_03_conflict_resolver::Resolution;
use hce_telemetry::POLLING_FRAMES;
use shared_types::{PollingFrame, ServiceDescriptor};

impl EmulationDispatcher {
    /// Resolves every frame, marks auto-transact hits, and forwards the whole
    /// batch as one message.
    ///
    /// The batch goes to the bound service whenever one is bound, so a
    /// bound preferred service is never released for a polling winner.
    /// With nothing bound, the first on-host winner is bound on demand.
    pub(crate) fn on_polling_frames(&mut self, mut frames: Vec<PollingFrame>) {
        if frames.is_empty() {
            return;
        }

        let mut target: Option<Arc<ServiceDescriptor>> = None;
        let mut auto_transact = false;
        if let Some(resolver) = self.resolver() {
            let preferred = self.state.preferred.as_ref();
            for frame in &mut frames {
                match resolver.resolve_polling_frame(frame, preferred) {
                    Resolution::Resolved(winner) => {
                        if winner.auto_transact {
                            frame.triggered_autotransact = true;
                            auto_transact = true;
                            POLLING_FRAMES.with_label_values(&["auto_transact"]).inc();
                            info!(component = %winner.service.component, frame = %frame.data_hex(), "Auto-transact triggered");
                            self.emit(CardEmulationEvent::AutoTransactTriggered {
                                component: winner.service.component.clone(),
                                frame_hex: frame.data_hex(),
                            });
                        } else {
                            POLLING_FRAMES.with_label_values(&["matched"]).inc();
                        }
                        if target.is_none() && winner.service.is_on_host() {
                            target = Some(winner.service.clone());
                        }
                    }
                    Resolution::Ambiguous(candidates) => {
                        POLLING_FRAMES.with_label_values(&["ambiguous"]).inc();
                        debug!(
                            frame = %frame.data_hex(),
                            candidates = candidates.len(),
                            "Polling frame is ambiguous; treating as unmatched"
                        );
                    }
                    Resolution::NoMatch => {
                        POLLING_FRAMES.with_label_values(&["unmatched"]).inc();
                    }
                }
            }
        }

        if auto_transact {
            self.set_observe_mode(false);
            self.state.pending_observe_mode_restore = true;
        }

        if matches!(
            self.state.phase,
            EmulationPhase::Idle | EmulationPhase::PollingLoop
        ) {
            self.set_phase(EmulationPhase::PollingLoop);
        }

        if self.state.bound.is_none() {
            if let Some(service) = target {
                if !self.bind(&service.component, service.user_id) {
                    self.drop_pending("bind failed");
                    return;
                }
            }
        }
        self.deliver(PendingItem::Frames(frames));
    }
}
