//! # Outbound Ports (Driven Ports)
//!
//! What the dispatcher drives: the platform binder, bound service channels,
//! the radio's observe-mode switch and the radio's APDU response path.
//!
//! All calls are made from the dispatcher's single event loop and must not
//! block on the dispatcher itself.

use std::fmt::Debug;
use std::sync::Arc;

use shared_types::{ComponentName, PollingFrame, UserId};

use crate::error::{BindError, ChannelError};

/// A request to start binding to an on-host service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindRequest {
    pub component: ComponentName,
    pub user_id: UserId,
    /// The service may be started from the background.
    pub allow_background_start: bool,
}

/// Starts and releases service bindings.
///
/// `bind` only starts the bind. Completion arrives later as
/// `DispatchEvent::ServiceConnected`.
pub trait ServiceBinder: Send + Sync {
    fn bind(&self, request: &BindRequest) -> Result<(), BindError>;

    fn unbind(&self, component: &ComponentName, user_id: UserId);
}

/// Messages delivered to a bound service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceMessage {
    CommandApdu(Vec<u8>),
    /// A whole batch, in detection order.
    PollingFrames(Vec<PollingFrame>),
    /// The reader left the field or the session ended.
    Deactivated,
}

/// An established connection to a service.
pub trait ServiceChannel: Send + Sync + Debug {
    fn send(&self, message: ServiceMessage) -> Result<(), ChannelError>;
}

/// Radio observe-mode switch.
pub trait ObserveModeController: Send + Sync {
    /// Returns whether the radio accepted the change.
    fn set_observe_mode_enabled(&self, enabled: bool) -> bool;
}

/// Response path back to the reader.
pub trait ApduResponder: Send + Sync {
    fn send_response(&self, response: Vec<u8>);
}

/// Shared channel handle as carried by events.
pub type SharedChannel = Arc<dyn ServiceChannel>;
