//! # Event Subscriber
//!
//! Receiving side of the bus: a pull-style [`Subscription`] for tests and
//! synchronous callers, and an [`EventStream`] for async consumers.

use std::pin::Pin;
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::warn;

use crate::events::{CardEmulationEvent, EventFilter};
use crate::publisher::InterestGuard;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Event bus closed")]
    Closed,
}

/// Filtered receiver. Dropping it releases its topic interest.
pub struct Subscription {
    receiver: broadcast::Receiver<CardEmulationEvent>,
    guard: InterestGuard,
    missed: u64,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<CardEmulationEvent>,
        guard: InterestGuard,
    ) -> Self {
        Self {
            receiver,
            guard,
            missed: 0,
        }
    }

    /// Next matching event, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<CardEmulationEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.guard.filter().matches(&event) => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(count)) => self.lagged(count),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event already queued. `Ok(None)` when nothing matching
    /// is waiting.
    pub fn try_recv(&mut self) -> Result<Option<CardEmulationEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.guard.filter().matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(count)) => self.lagged(count),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
            }
        }
    }

    /// Events lost because this subscriber fell behind.
    #[must_use]
    pub fn missed(&self) -> u64 {
        self.missed
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        self.guard.filter()
    }

    fn lagged(&mut self, count: u64) {
        self.missed += count;
        warn!(lagged = count, topics = ?self.guard.filter().topics, "Subscriber lagged; events dropped");
    }
}

/// Async stream of matching events. Ends when the bus is dropped.
pub struct EventStream {
    inner: BroadcastStream<CardEmulationEvent>,
    guard: InterestGuard,
}

impl EventStream {
    pub(crate) fn new(
        receiver: broadcast::Receiver<CardEmulationEvent>,
        guard: InterestGuard,
    ) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
            guard,
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        self.guard.filter()
    }
}

impl Stream for EventStream {
    type Item = CardEmulationEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    if self.guard.filter().matches(&event) {
                        return Poll::Ready(Some(event));
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(count)))) => {
                    warn!(lagged = count, "Event stream lagged; events dropped");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
