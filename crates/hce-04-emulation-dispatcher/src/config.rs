use std::time::Duration;

/// Dispatcher tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Items held for a service that is still binding. Oldest dropped first.
    pub pending_capacity: usize,
    /// Capacity of the event queue behind `DispatcherHandle`.
    pub event_queue_capacity: usize,
    /// Abandon a bind that has not connected within this time.
    pub bind_timeout: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            pending_capacity: 16,
            event_queue_capacity: 64,
            bind_timeout: None,
        }
    }
}

impl DispatcherConfig {
    #[must_use]
    pub fn with_bind_timeout(mut self, timeout: Duration) -> Self {
        self.bind_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_pending_capacity(mut self, capacity: usize) -> Self {
        self.pending_capacity = capacity.max(1);
        self
    }
}
