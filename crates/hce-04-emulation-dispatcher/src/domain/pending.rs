use std::collections::VecDeque;

use shared_types::PollingFrame;

/// Data held until the target service's channel is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingItem {
    Apdu(Vec<u8>),
    Frames(Vec<PollingFrame>),
}

/// Bounded FIFO; a push into a full queue evicts the oldest item.
#[derive(Debug, Clone)]
pub struct PendingQueue {
    items: VecDeque<PendingItem>,
    capacity: usize,
}

impl PendingQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns the evicted item, if any.
    pub fn push(&mut self, item: PendingItem) -> Option<PendingItem> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Removes everything in arrival order.
    pub fn drain(&mut self) -> Vec<PendingItem> {
        self.items.drain(..).collect()
    }

    /// Drops everything. Returns how many items were dropped.
    pub fn clear(&mut self) -> usize {
        let n = self.items.len();
        self.items.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oldest_evicted_when_full() {
        let mut queue = PendingQueue::new(2);
        assert!(queue.push(PendingItem::Apdu(vec![1])).is_none());
        assert!(queue.push(PendingItem::Apdu(vec![2])).is_none());
        assert_eq!(queue.push(PendingItem::Apdu(vec![3])), Some(PendingItem::Apdu(vec![1])));
        assert_eq!(
            queue.drain(),
            vec![PendingItem::Apdu(vec![2]), PendingItem::Apdu(vec![3])]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut queue = PendingQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        queue.push(PendingItem::Apdu(vec![1]));
        assert_eq!(queue.clear(), 1);
    }
}
