//! Dispatcher domain: APDU inspection, the pending queue and dispatch state.

pub mod apdu;
pub mod pending;
pub mod state;

pub use apdu::{build_select, select_aid, SW_FILE_NOT_FOUND, SW_UNKNOWN_ERROR};
pub use pending::{PendingItem, PendingQueue};
pub use state::{Binding, DispatchState};
