//! # Dispatcher Handle
//!
//! The dispatcher runs as one task that owns `EmulationDispatcher` and drains
//! a bounded `mpsc` queue. Every public entry point enqueues an event, so
//! all state changes happen in arrival order on that task.
//!
//! ```text
//! radio / platform ──post──→ [mpsc] ────────┐
//! registry ──catalog──→ [unbounded mpsc] ───┴──→ run loop ──→ EmulationDispatcher::handle
//!                                                   ↑                   │
//!                                                   └── BindTimedOut ←─ timer (optional)
//! ```
//!
//! Catalogs travel on their own unbounded channel and are taken ahead of
//! queued events, so a full event queue never loses one. The loop ends when
//! every handle is dropped and returns the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use hce_02_service_registry::{CatalogSnapshot, ServicesCallback};
use shared_types::{ComponentName, PollingFrame, UserId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::DispatchError;
use crate::ports::inbound::DispatchEvent;
use crate::ports::outbound::SharedChannel;
use crate::service::EmulationDispatcher;

/// Cloneable entry point into a running dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<DispatchEvent>,
    catalogs: mpsc::UnboundedSender<Arc<CatalogSnapshot>>,
}

impl DispatcherHandle {
    /// Enqueues an event, waiting for room.
    pub async fn post(&self, event: DispatchEvent) -> Result<(), DispatchError> {
        self.tx.send(event).await.map_err(|_| DispatchError::Closed)
    }

    /// Enqueues an event without waiting. For synchronous callers.
    pub fn try_post(&self, event: DispatchEvent) -> Result<(), DispatchError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
        })
    }

    pub async fn on_preferred_service_changed(
        &self,
        user_id: UserId,
        component: Option<ComponentName>,
    ) -> Result<(), DispatchError> {
        self.post(DispatchEvent::PreferredServiceChanged { user_id, component })
            .await
    }

    pub async fn on_polling_frames_detected(
        &self,
        frames: Vec<PollingFrame>,
    ) -> Result<(), DispatchError> {
        self.post(DispatchEvent::PollingFramesDetected(frames)).await
    }

    pub async fn on_host_emulation_activated(&self) -> Result<(), DispatchError> {
        self.post(DispatchEvent::HostEmulationActivated).await
    }

    pub async fn on_host_emulation_data(&self, apdu: Vec<u8>) -> Result<(), DispatchError> {
        self.post(DispatchEvent::HostEmulationData(apdu)).await
    }

    pub async fn on_host_emulation_deactivated(&self) -> Result<(), DispatchError> {
        self.post(DispatchEvent::HostEmulationDeactivated).await
    }

    pub async fn on_service_connected(
        &self,
        component: ComponentName,
        user_id: UserId,
        channel: SharedChannel,
    ) -> Result<(), DispatchError> {
        self.post(DispatchEvent::ServiceConnected {
            component,
            user_id,
            channel,
        })
        .await
    }

    pub async fn on_service_disconnected(
        &self,
        component: ComponentName,
    ) -> Result<(), DispatchError> {
        self.post(DispatchEvent::ServiceDisconnected { component })
            .await
    }

    pub async fn on_service_response(
        &self,
        component: ComponentName,
        data: Vec<u8>,
    ) -> Result<(), DispatchError> {
        self.post(DispatchEvent::ServiceResponse { component, data })
            .await
    }

    /// Never waits; catalogs bypass the bounded event queue.
    pub async fn on_services_updated(
        &self,
        snapshot: Arc<CatalogSnapshot>,
    ) -> Result<(), DispatchError> {
        self.send_catalog(snapshot)
    }

    fn send_catalog(&self, snapshot: Arc<CatalogSnapshot>) -> Result<(), DispatchError> {
        self.catalogs.send(snapshot).map_err(|_| DispatchError::Closed)
    }
}

/// The registry publishes synchronously. Catalogs are accepted as long as
/// the dispatcher runs, however full its event queue is.
impl ServicesCallback for DispatcherHandle {
    fn on_services_updated(&self, snapshot: Arc<CatalogSnapshot>) {
        let user_id = snapshot.user_id;
        if let Err(e) = self.send_catalog(snapshot) {
            warn!(user_id, error = %e, "Catalog update not delivered to dispatcher");
        }
    }
}

/// Starts the dispatcher task on the current runtime.
pub fn spawn_dispatcher(
    dispatcher: EmulationDispatcher,
) -> (DispatcherHandle, JoinHandle<EmulationDispatcher>) {
    let capacity = dispatcher.config().event_queue_capacity.max(1);
    let (tx, rx) = mpsc::channel(capacity);
    let (catalogs, catalog_rx) = mpsc::unbounded_channel();
    let timer_tx = tx.downgrade();
    let task = tokio::spawn(run(dispatcher, rx, catalog_rx, timer_tx));
    (DispatcherHandle { tx, catalogs }, task)
}

async fn run(
    mut dispatcher: EmulationDispatcher,
    mut rx: mpsc::Receiver<DispatchEvent>,
    mut catalog_rx: mpsc::UnboundedReceiver<Arc<CatalogSnapshot>>,
    timer_tx: mpsc::WeakSender<DispatchEvent>,
) -> EmulationDispatcher {
    info!("Emulation dispatcher started");
    let bind_timeout = dispatcher.config().bind_timeout;
    loop {
        let event = tokio::select! {
            biased;
            Some(snapshot) = catalog_rx.recv() => DispatchEvent::ServicesUpdated(snapshot),
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        dispatcher.handle(event);
        if let Some((component, attempt)) = dispatcher.take_started_bind() {
            if let Some(timeout) = bind_timeout {
                arm_bind_timer(timer_tx.clone(), component, attempt, timeout);
            }
        }
    }
    info!("Emulation dispatcher stopped");
    dispatcher
}

fn arm_bind_timer(
    tx: mpsc::WeakSender<DispatchEvent>,
    component: ComponentName,
    attempt: u64,
    timeout: Duration,
) {
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        // The dispatcher may have stopped; a timer never keeps it alive.
        let Some(tx) = tx.upgrade() else {
            return;
        };
        if tx
            .send(DispatchEvent::BindTimedOut { component, attempt })
            .await
            .is_err()
        {
            debug!("Dispatcher stopped before bind timeout fired");
        }
    });
}
