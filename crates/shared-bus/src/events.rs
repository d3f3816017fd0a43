//! # Card Emulation Events
//!
//! Defines all event types that flow through the shared bus.

use serde::{Deserialize, Serialize};
use shared_types::entities::{ComponentName, EmulationPhase, UserId};

/// Subsystem id of the service registry.
pub const REGISTRY_SUBSYSTEM: u8 = 2;
/// Subsystem id of the emulation dispatcher.
pub const DISPATCHER_SUBSYSTEM: u8 = 4;

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardEmulationEvent {
    // =========================================================================
    // SUBSYSTEM 2: SERVICE REGISTRY
    // =========================================================================
    /// A user's catalog was rebuilt and published.
    ServicesUpdated {
        user_id: UserId,
        service_count: usize,
        /// Defaults may reference a service that no longer exists.
        has_unknown_default: bool,
    },

    /// A user's catalog was purged (profile removed or quiet mode).
    UserPurged { user_id: UserId },

    // =========================================================================
    // SUBSYSTEM 4: EMULATION DISPATCHER
    // =========================================================================
    /// The preferred service changed.
    PreferredServiceChanged {
        user_id: UserId,
        component: Option<ComponentName>,
    },

    /// The dispatcher moved between phases.
    PhaseChanged {
        from: EmulationPhase,
        to: EmulationPhase,
    },

    /// Observe mode was toggled on the radio.
    ObserveModeToggled { enabled: bool, success: bool },

    /// A polling frame matched an auto-transact filter.
    AutoTransactTriggered {
        component: ComponentName,
        frame_hex: String,
    },

    /// A SELECT matched several services and none was preferred.
    AmbiguousSelection {
        aid: String,
        candidates: Vec<ComponentName>,
    },

    /// Binding to a service failed or timed out.
    BindFailed {
        component: ComponentName,
        user_id: UserId,
        reason: String,
    },
}

impl CardEmulationEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::ServicesUpdated { .. } | Self::UserPurged { .. } => EventTopic::Catalog,
            Self::PreferredServiceChanged { .. } | Self::AmbiguousSelection { .. } => {
                EventTopic::Routing
            }
            Self::PhaseChanged { .. } | Self::BindFailed { .. } => EventTopic::Session,
            Self::ObserveModeToggled { .. } | Self::AutoTransactTriggered { .. } => {
                EventTopic::ObserveMode
            }
        }
    }

    /// Get the originating subsystem ID.
    #[must_use]
    pub fn source_subsystem(&self) -> u8 {
        match self {
            Self::ServicesUpdated { .. } | Self::UserPurged { .. } => REGISTRY_SUBSYSTEM,
            _ => DISPATCHER_SUBSYSTEM,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Catalog rebuilds and purges.
    Catalog,
    /// Preferred-service and selection outcomes.
    Routing,
    /// Binding lifecycle and phase transitions.
    Session,
    /// Observe-mode and auto-transact transitions.
    ObserveMode,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Source subsystems to include. Empty means all sources.
    pub source_subsystems: Vec<u8>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            source_subsystems: Vec::new(),
        }
    }

    /// Create a filter for events from specific subsystems.
    #[must_use]
    pub fn from_subsystems(subsystems: Vec<u8>) -> Self {
        Self {
            topics: Vec::new(),
            source_subsystems: subsystems,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &CardEmulationEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let source_match = self.source_subsystems.is_empty()
            || self.source_subsystems.contains(&event.source_subsystem());

        topic_match && source_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn services_updated() -> CardEmulationEvent {
        CardEmulationEvent::ServicesUpdated {
            user_id: 0,
            service_count: 3,
            has_unknown_default: false,
        }
    }

    fn phase_changed() -> CardEmulationEvent {
        CardEmulationEvent::PhaseChanged {
            from: EmulationPhase::Idle,
            to: EmulationPhase::WaitForSelect,
        }
    }

    #[test]
    fn test_event_topic_mapping() {
        assert_eq!(services_updated().topic(), EventTopic::Catalog);
        assert_eq!(services_updated().source_subsystem(), REGISTRY_SUBSYSTEM);
        assert_eq!(phase_changed().topic(), EventTopic::Session);
        assert_eq!(phase_changed().source_subsystem(), DISPATCHER_SUBSYSTEM);
    }

    #[test]
    fn test_filter_all() {
        assert!(EventFilter::all().matches(&services_updated()));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::Session]);
        assert!(filter.matches(&phase_changed()));
        assert!(!filter.matches(&services_updated()));
    }

    #[test]
    fn test_filter_by_subsystem() {
        let filter = EventFilter::from_subsystems(vec![REGISTRY_SUBSYSTEM]);
        assert!(filter.matches(&services_updated()));
        assert!(!filter.matches(&phase_changed()));
    }

    #[test]
    fn test_observe_mode_event() {
        let event = CardEmulationEvent::ObserveModeToggled {
            enabled: false,
            success: true,
        };
        assert_eq!(event.topic(), EventTopic::ObserveMode);
        assert_eq!(event.source_subsystem(), DISPATCHER_SUBSYSTEM);
    }
}
