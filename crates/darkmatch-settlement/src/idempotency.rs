//! Bounded "seen" set used to do work at most once.
//!
//! The settler keys it by computation so a computation is never settled
//! twice; the confirmer keys it by order so an order is never emitted in
//! two confirmed matches.
//!
//! The guard is an LRU-style bounded cache so memory usage stays
//! predictable in long-running nodes.

use std::{
    collections::{HashSet, VecDeque},
    hash::Hash,
};

/// Remembers up to `max_size` keys, evicting the oldest first.
#[derive(Debug)]
pub struct IdempotencyGuard<K> {
    seen: HashSet<K>,
    /// Insertion order for eviction (front = oldest).
    order: VecDeque<K>,
    max_size: usize,
}

impl<K: Hash + Eq + Copy> IdempotencyGuard<K> {
    /// Create a new guard with the given maximum cache size.
    ///
    /// # Panics
    /// Panics if `max_size` is zero.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "IdempotencyGuard max_size must be > 0");
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            max_size,
        }
    }

    /// Mark `key`. Returns `false` if it was already marked.
    pub fn mark(&mut self, key: K) -> bool {
        if self.seen.contains(&key) {
            return false;
        }

        if self.seen.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }

        self.seen.insert(key);
        self.order.push_back(key);
        true
    }

    /// Forget `key` so it can be marked again. Returns whether it was
    /// marked.
    pub fn release(&mut self, key: &K) -> bool {
        if !self.seen.remove(key) {
            return false;
        }
        self.order.retain(|k| k != key);
        true
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.seen.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
