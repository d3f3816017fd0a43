use shared_types::{ComponentName, EmulationPhase, UserId};

use super::pending::PendingQueue;
use crate::ports::outbound::SharedChannel;

/// A bind that was started, and its channel once connected.
#[derive(Debug, Clone)]
pub struct Binding {
    pub component: ComponentName,
    pub user_id: UserId,
    pub channel: Option<SharedChannel>,
    pub attempt: u64,
}

impl Binding {
    #[must_use]
    pub fn is(&self, component: &ComponentName, user_id: UserId) -> bool {
        &self.component == component && self.user_id == user_id
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }
}

/// Everything the dispatcher owns. Only its event loop mutates it.
#[derive(Debug, Clone)]
pub struct DispatchState {
    pub phase: EmulationPhase,
    /// User whose catalog frames and SELECTs resolve against.
    pub active_user: UserId,
    pub preferred: Option<ComponentName>,
    pub bound: Option<Binding>,
    /// Service chosen by the last successful SELECT of this session.
    pub selected: Option<ComponentName>,
    /// Observe mode was turned off for an auto-transaction and must come
    /// back on when the session ends.
    pub pending_observe_mode_restore: bool,
    /// Observe-mode default of a preference change that arrived while the
    /// restore was pending. Applied in place of the restore.
    pub deferred_observe_default: Option<bool>,
    pub pending: PendingQueue,
}

impl DispatchState {
    pub fn new(active_user: UserId, pending_capacity: usize) -> Self {
        Self {
            phase: EmulationPhase::Idle,
            active_user,
            preferred: None,
            bound: None,
            selected: None,
            pending_observe_mode_restore: false,
            deferred_observe_default: None,
            pending: PendingQueue::new(pending_capacity),
        }
    }

    #[must_use]
    pub fn bound_component(&self) -> Option<&ComponentName> {
        self.bound.as_ref().map(|b| &b.component)
    }

    #[must_use]
    pub fn is_bound_to(&self, component: &ComponentName, user_id: UserId) -> bool {
        self.bound.as_ref().is_some_and(|b| b.is(component, user_id))
    }
}
