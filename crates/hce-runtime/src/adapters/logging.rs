//! # Logging Adapters
//!
//! Stand-ins for the radio and the application binder when the runtime runs
//! without NFC hardware. Each one logs what it was asked to do.

use hce_04_emulation_dispatcher::{
    ApduResponder, BindError, BindRequest, ObserveModeController, ServiceBinder,
};
use shared_types::{ComponentName, UserId};
use tracing::info;

/// Accepts every bind; no connection ever arrives.
#[derive(Debug, Default)]
pub struct LoggingBinder;

impl ServiceBinder for LoggingBinder {
    fn bind(&self, request: &BindRequest) -> Result<(), BindError> {
        info!(
            component = %request.component,
            user_id = request.user_id,
            background = request.allow_background_start,
            "bind requested"
        );
        Ok(())
    }

    fn unbind(&self, component: &ComponentName, user_id: UserId) {
        info!(component = %component, user_id, "unbind requested");
    }
}

#[derive(Debug, Default)]
pub struct LoggingObserveMode;

impl ObserveModeController for LoggingObserveMode {
    fn set_observe_mode_enabled(&self, enabled: bool) -> bool {
        info!(enabled, "observe mode");
        true
    }
}

#[derive(Debug, Default)]
pub struct LoggingResponder;

impl ApduResponder for LoggingResponder {
    fn send_response(&self, response: Vec<u8>) {
        info!(response = %hex::encode_upper(&response), "response to reader");
    }
}

