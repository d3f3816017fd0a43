//! # Recording Adapters
//!
//! Constructor-injected fakes for every outbound port. Each records what the
//! dispatcher asked of it so tests can assert on order.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use shared_types::{ComponentName, UserId};

use crate::error::{BindError, ChannelError};
use crate::ports::outbound::{
    ApduResponder, BindRequest, ObserveModeController, ServiceBinder, ServiceChannel,
    ServiceMessage,
};

/// One call made on a `RecordingBinder`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinderCall {
    Bind(BindRequest),
    Unbind(ComponentName, UserId),
}

#[derive(Debug, Default)]
pub struct RecordingBinder {
    calls: Mutex<Vec<BinderCall>>,
    refused: Mutex<HashSet<ComponentName>>,
}

impl RecordingBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later bind of `component` fails.
    pub fn refuse(&self, component: ComponentName) {
        self.refused.lock().insert(component);
    }

    pub fn calls(&self) -> Vec<BinderCall> {
        self.calls.lock().clone()
    }

    pub fn binds(&self) -> Vec<ComponentName> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                BinderCall::Bind(r) => Some(r.component.clone()),
                BinderCall::Unbind(..) => None,
            })
            .collect()
    }

    pub fn unbinds(&self) -> Vec<ComponentName> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                BinderCall::Unbind(component, _) => Some(component.clone()),
                BinderCall::Bind(_) => None,
            })
            .collect()
    }
}

impl ServiceBinder for RecordingBinder {
    fn bind(&self, request: &BindRequest) -> Result<(), BindError> {
        self.calls.lock().push(BinderCall::Bind(request.clone()));
        if self.refused.lock().contains(&request.component) {
            return Err(BindError::Rejected {
                component: request.component.clone(),
                reason: "service not exported".into(),
            });
        }
        Ok(())
    }

    fn unbind(&self, component: &ComponentName, user_id: UserId) {
        self.calls
            .lock()
            .push(BinderCall::Unbind(component.clone(), user_id));
    }
}

/// Channel that keeps every message it is sent.
#[derive(Debug)]
pub struct RecordingChannel {
    component: ComponentName,
    messages: Mutex<Vec<ServiceMessage>>,
    closed: AtomicBool,
}

impl RecordingChannel {
    pub fn new(component: ComponentName) -> Self {
        Self {
            component,
            messages: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Makes every following send fail.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<ServiceMessage> {
        self.messages.lock().clone()
    }

    pub fn apdus(&self) -> Vec<Vec<u8>> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                ServiceMessage::CommandApdu(apdu) => Some(apdu.clone()),
                _ => None,
            })
            .collect()
    }
}

impl ServiceChannel for RecordingChannel {
    fn send(&self, message: ServiceMessage) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed(self.component.clone()));
        }
        self.messages.lock().push(message);
        Ok(())
    }
}

/// Observe-mode switch that records requested states.
#[derive(Debug)]
pub struct RecordingObserveMode {
    requests: Mutex<Vec<bool>>,
    accept: AtomicBool,
}

impl Default for RecordingObserveMode {
    fn default() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            accept: AtomicBool::new(true),
        }
    }
}

impl RecordingObserveMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<bool> {
        self.requests.lock().clone()
    }
}

impl ObserveModeController for RecordingObserveMode {
    fn set_observe_mode_enabled(&self, enabled: bool) -> bool {
        self.requests.lock().push(enabled);
        self.accept.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct RecordingResponder {
    responses: Mutex<Vec<Vec<u8>>>,
}

impl RecordingResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn responses(&self) -> Vec<Vec<u8>> {
        self.responses.lock().clone()
    }
}

impl ApduResponder for RecordingResponder {
    fn send_response(&self, response: Vec<u8>) {
        self.responses.lock().push(response);
    }
}
