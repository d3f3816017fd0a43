//! # Emulation Dispatcher (hce-04)
//!
//! Runs the card-emulation session: binds the service the resolver picks,
//! relays polling frames and command APDUs to it, relays its responses back
//! to the reader, and drives the radio's observe mode around
//! auto-transactions.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────────────────┐
//! DispatcherHandle ─→│ mpsc ─→ EmulationDispatcher│─→ ServiceBinder (bind/unbind)
//!                    │          │                │─→ ServiceChannel (frames, APDUs)
//!                    │   ConflictResolver (per   │─→ ObserveModeController
//!                    │   user, from snapshots)   │─→ ApduResponder (6A82 / 6F00 / replies)
//!                    └──────────────────────────┘
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Single Writer | State changes only on the dispatcher task |
//! | 2 | Unbind First | A differing bound service is released before a new bind |
//! | 3 | Ordered Delivery | Queued data is flushed in arrival order on connect |
//! | 4 | Bounded Queue | Pre-bind data is capped; the oldest item goes first |
//! | 5 | Restore | Observe mode disabled for an auto-transaction comes back on deactivation |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - APDU inspection, pending queue, dispatch state
//! - `ports/` - `DispatchEvent` and the outbound SPI
//! - `service/` - `EmulationDispatcher`, the synchronous core
//! - `handle.rs` - `DispatcherHandle` and the run loop
//! - `adapters/` - recording fakes

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod handle;
pub mod ports;
pub mod service;

pub use config::DispatcherConfig;
pub use domain::{select_aid, PendingItem, SW_FILE_NOT_FOUND, SW_UNKNOWN_ERROR};
pub use error::{BindError, ChannelError, DispatchError, SelectError};
pub use handle::{spawn_dispatcher, DispatcherHandle};
pub use ports::{
    ApduResponder, BindRequest, DispatchEvent, ObserveModeController, ServiceBinder,
    ServiceChannel, ServiceMessage, SharedChannel,
};
pub use service::{DispatcherDependencies, EmulationDispatcher};
