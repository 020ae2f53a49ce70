// Copyright (c) 2026 muondaq contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/muondaq/muondaq

//! Bounded hand-off queues between the producer and consumers

use crossbeam::queue::ArrayQueue;
use std::sync::Arc;

use crate::event::Event;

/// Bounded event queue with a non-blocking, drop-oldest push.
///
/// The producer never waits on a slow consumer: a push into a full queue
/// evicts the oldest unread entry instead of blocking. Consumers pop at
/// their own pace.
pub struct EventQueue {
    inner: ArrayQueue<Arc<Event>>,
}

impl EventQueue {
    /// Creates a queue holding at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: ArrayQueue::new(capacity),
        }
    }

    /// Pushes an event, evicting the oldest entry if the queue is full.
    ///
    /// Returns `true` when an entry was evicted.
    pub fn push(&self, event: Arc<Event>) -> bool {
        self.inner.force_push(event).is_some()
    }

    /// Pops the oldest available event.
    pub fn pop(&self) -> Option<Arc<Event>> {
        self.inner.pop()
    }

    /// Number of events currently queued.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when no events are queued.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Maximum number of events the queue can hold.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: u64) -> Arc<Event> {
        Arc::new(Event::new(id))
    }

    #[test]
    fn pops_in_fifo_order() {
        let queue = EventQueue::new(4);
        for id in 0..3 {
            assert!(!queue.push(event(id)));
        }
        assert_eq!(queue.pop().unwrap().event_id, 0);
        assert_eq!(queue.pop().unwrap().event_id, 1);
        assert_eq!(queue.pop().unwrap().event_id, 2);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn overflow_keeps_newest_suffix() {
        let queue = EventQueue::new(3);
        let mut evicted = 0;
        for id in 0..10 {
            if queue.push(event(id)) {
                evicted += 1;
            }
        }
        assert_eq!(evicted, 7);
        assert_eq!(queue.len(), 3);
        // Exactly the last `capacity` events survive, oldest dropped first.
        let ids: Vec<u64> = std::iter::from_fn(|| queue.pop().map(|e| e.event_id)).collect();
        assert_eq!(ids, vec![7, 8, 9]);
    }
}
