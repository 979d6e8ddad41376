//! Priority-sorted queue of candidate computations.
//!
//! Entries are kept in ascending order of combined priority. Entries with
//! equal priority keep their insertion order, so draining is deterministic
//! for a given sequence of inserts.

use std::collections::{HashSet, VecDeque};

use darkmatch_types::{Computation, OrderId};

#[derive(Debug, Clone)]
struct Entry {
    priority: u128,
    computation: Computation,
}

#[derive(Debug, Default)]
pub struct Backlog {
    entries: VecDeque<Entry>,
}

impl Backlog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert after every entry whose priority is `<= priority`.
    pub fn insert(&mut self, priority: u128, computation: Computation) {
        let at = self.entries.partition_point(|e| e.priority <= priority);
        self.entries.insert(
            at,
            Entry {
                priority,
                computation,
            },
        );
    }

    /// Remove and return up to `max` entries from the front.
    pub fn drain_front(&mut self, max: usize) -> Vec<Computation> {
        let n = max.min(self.entries.len());
        self.entries.drain(..n).map(|e| e.computation).collect()
    }

    /// Drop every entry referencing any of `orders` on either side.
    /// Returns the number of entries removed.
    pub fn purge(&mut self, orders: &HashSet<OrderId>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| !orders.contains(&e.computation.buy) && !orders.contains(&e.computation.sell));
        before - self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Priorities front to back.
    pub fn priorities(&self) -> impl Iterator<Item = u128> + '_ {
        self.entries.iter().map(|e| e.priority)
    }
}
