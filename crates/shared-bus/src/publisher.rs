//! # Event Publisher
//!
//! Emitting side of the bus. Publishing never blocks: the registry emits
//! from inside its callback and the dispatcher from inside its event loop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::events::{CardEmulationEvent, EventFilter, EventTopic};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;

/// Publishing interface for components that do not own the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Returns the number of subscribers the event was handed to.
    async fn publish(&self, event: CardEmulationEvent) -> usize;

    /// Events offered to the bus so far, delivered or not.
    fn events_published(&self) -> u64;
}

/// Live subscriptions per topic. `EventTopic::All` counts catch-all filters.
#[derive(Debug, Default)]
pub(crate) struct TopicInterest {
    counts: HashMap<EventTopic, usize>,
}

impl TopicInterest {
    fn keys(filter: &EventFilter) -> Vec<EventTopic> {
        if filter.topics.is_empty() || filter.topics.contains(&EventTopic::All) {
            vec![EventTopic::All]
        } else {
            filter.topics.clone()
        }
    }

    pub(crate) fn add(&mut self, filter: &EventFilter) {
        for topic in Self::keys(filter) {
            *self.counts.entry(topic).or_insert(0) += 1;
        }
    }

    pub(crate) fn remove(&mut self, filter: &EventFilter) {
        for topic in Self::keys(filter) {
            if let Some(count) = self.counts.get_mut(&topic) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.counts.remove(&topic);
                }
            }
        }
    }

    fn count(&self, topic: EventTopic) -> usize {
        let direct = if topic == EventTopic::All {
            0
        } else {
            self.counts.get(&topic).copied().unwrap_or(0)
        };
        direct + self.counts.get(&EventTopic::All).copied().unwrap_or(0)
    }
}

/// Releases a subscription's topic interest when dropped.
pub(crate) struct InterestGuard {
    interest: Arc<Mutex<TopicInterest>>,
    filter: EventFilter,
}

impl InterestGuard {
    fn new(interest: Arc<Mutex<TopicInterest>>, filter: EventFilter) -> Self {
        interest.lock().add(&filter);
        Self { interest, filter }
    }

    pub(crate) fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Drop for InterestGuard {
    fn drop(&mut self) {
        self.interest.lock().remove(&self.filter);
        trace!(topics = ?self.filter.topics, "Subscription released");
    }
}

/// Broadcast bus shared by the registry callback, the dispatcher and any
/// observers.
///
/// Every subscriber sees every event; filtering happens on the receiving
/// side. A subscriber that falls more than `capacity` events behind loses
/// the oldest ones.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<CardEmulationEvent>,
    interest: Arc<Mutex<TopicInterest>>,
    published: AtomicU64,
    undelivered: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// `capacity` is the per-subscriber backlog and must be non-zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            interest: Arc::new(Mutex::new(TopicInterest::default())),
            published: AtomicU64::new(0),
            undelivered: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, "Subscription opened");
        let guard = InterestGuard::new(Arc::clone(&self.interest), filter);
        Subscription::new(self.sender.subscribe(), guard)
    }

    /// Same as [`subscribe`](Self::subscribe), as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        let guard = InterestGuard::new(Arc::clone(&self.interest), filter);
        EventStream::new(self.sender.subscribe(), guard)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Subscribers whose filter admits `topic`.
    #[must_use]
    pub fn interested(&self, topic: EventTopic) -> usize {
        self.interest.lock().count(topic)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events emitted while nobody was subscribed.
    #[must_use]
    pub fn undelivered(&self) -> u64 {
        self.undelivered.load(Ordering::Relaxed)
    }

    /// Synchronous publish. Returns the number of receivers.
    pub fn emit(&self, event: CardEmulationEvent) -> usize {
        let topic = event.topic();
        self.published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(?topic, receivers, "Event emitted");
                receivers
            }
            Err(_) => {
                self.undelivered.fetch_add(1, Ordering::Relaxed);
                trace!(?topic, "Event emitted with no subscribers");
                0
            }
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: CardEmulationEvent) -> usize {
        self.emit(event)
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
