//! Port definitions for the emulation dispatcher.

pub mod inbound;
pub mod outbound;

pub use inbound::DispatchEvent;
pub use outbound::{
    ApduResponder, BindRequest, ObserveModeController, ServiceBinder, ServiceChannel,
    ServiceMessage, SharedChannel,
};
