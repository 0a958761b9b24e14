// Copyright 2024 bsd-input-core contributors
// SPDX-License-Identifier: Apache-2.0

//! Bounded event queue.
//!
//! Modeled on a capacity-bounded `VecDeque`
//! (a capacity-bounded `VecDeque` that rejects pushes once full rather
//! than growing). Spec.md §4.9 wants a fixed-size array with a reset
//! counter; a capacity-checked `Vec` gives the same observable
//! behavior (silent drop past capacity) without `unsafe` uninitialized
//! storage.

/// A queue bounded to a fixed capacity. Pushing past capacity silently
/// drops the event and increments a counter instead of growing.
#[derive(Debug)]
pub struct EventQueue<T> {
    items: Vec<T>,
    capacity: usize,
    dropped: u64,
}

impl<T> EventQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Push an event. Returns `false` (and counts a drop) if the queue
    /// was already at capacity.
    pub fn push(&mut self, item: T) -> bool {
        if self.items.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        self.items.push(item);
        true
    }

    /// Number of events currently buffered.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total events dropped for capacity overflow over this queue's
    /// lifetime.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Reset the queue at the start of a poll cycle without returning
    /// its contents.
    pub fn reset(&mut self) {
        self.items.clear();
    }

    /// Return the buffered events and empty the queue, the same
    /// contract as `drain_key_events`/`drain_mouse_events` in
    /// drain contract.
    pub fn drain(&mut self) -> Vec<T> {
        std::mem::take(&mut self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_respects_capacity() {
        let mut q = EventQueue::with_capacity(2);
        assert!(q.push(1));
        assert!(q.push(2));
        assert!(!q.push(3));
        assert_eq!(q.len(), 2);
        assert_eq!(q.dropped_count(), 1);
    }

    #[test]
    fn drain_empties_queue() {
        let mut q = EventQueue::with_capacity(4);
        q.push(1);
        q.push(2);
        let drained = q.drain();
        assert_eq!(drained, vec![1, 2]);
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn reset_clears_without_returning() {
        let mut q = EventQueue::with_capacity(4);
        q.push(1);
        q.reset();
        assert_eq!(q.len(), 0);
    }
}
