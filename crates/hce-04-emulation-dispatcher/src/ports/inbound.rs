//! # Inbound Ports (Driving Ports)
//!
//! Everything that can happen to the dispatcher, as one event type. Every
//! public entry point of `DispatcherHandle` enqueues one of these.

use std::sync::Arc;

use hce_02_service_registry::CatalogSnapshot;
use shared_types::{ComponentName, PollingFrame, UserId};

use super::outbound::SharedChannel;

#[derive(Debug, Clone)]
pub enum DispatchEvent {
    /// The user's preferred service changed; `None` clears it.
    PreferredServiceChanged {
        user_id: UserId,
        component: Option<ComponentName>,
    },
    /// A batch of frames seen while polling.
    PollingFramesDetected(Vec<PollingFrame>),
    /// A reader activated card emulation.
    HostEmulationActivated,
    /// A command APDU from the reader.
    HostEmulationData(Vec<u8>),
    HostEmulationDeactivated,
    ServiceConnected {
        component: ComponentName,
        user_id: UserId,
        channel: SharedChannel,
    },
    ServiceDisconnected { component: ComponentName },
    /// A response APDU from a service.
    ServiceResponse {
        component: ComponentName,
        data: Vec<u8>,
    },
    /// A new catalog was published.
    ServicesUpdated(Arc<CatalogSnapshot>),
    /// A bind started as `attempt` did not connect in time.
    BindTimedOut {
        component: ComponentName,
        attempt: u64,
    },
}

impl DispatchEvent {
    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PreferredServiceChanged { .. } => "preferred_service_changed",
            Self::PollingFramesDetected(_) => "polling_frames_detected",
            Self::HostEmulationActivated => "host_emulation_activated",
            Self::HostEmulationData(_) => "host_emulation_data",
            Self::HostEmulationDeactivated => "host_emulation_deactivated",
            Self::ServiceConnected { .. } => "service_connected",
            Self::ServiceDisconnected { .. } => "service_disconnected",
            Self::ServiceResponse { .. } => "service_response",
            Self::ServicesUpdated(_) => "services_updated",
            Self::BindTimedOut { .. } => "bind_timed_out",
        }
    }
}
