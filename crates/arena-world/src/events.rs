//! `EventRing` — fixed-capacity history of recent non-position events.
//!
//! # Why this exists
//!
//! Late-joining observers and polling agents need a short window of "what
//! just happened" (chat, joins, battle rounds) without the server keeping
//! unbounded history.  A 200-slot ring holds roughly the last few minutes
//! of social activity at typical populations; anything older is the
//! external database's problem.

use arena_core::constants::EVENT_RING_CAPACITY;
use arena_core::{TimeMs, WorldMessage};

/// Circular buffer of the last `capacity` events, oldest overwritten first.
pub struct EventRing {
    slots: Vec<WorldMessage>,
    capacity: usize,
    /// Next slot to overwrite once the ring is full.
    write: usize,
    /// Total events ever pushed (not capped).
    total: u64,
}

impl EventRing {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_RING_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            write: 0,
            total: 0,
        }
    }

    pub fn push(&mut self, msg: WorldMessage) {
        if self.slots.len() < self.capacity {
            self.slots.push(msg);
        } else {
            self.slots[self.write] = msg;
        }
        self.write = (self.write + 1) % self.capacity;
        self.total += 1;
    }

    /// Events strictly newer than `since`, oldest first, at most `limit`.
    pub fn since(&self, since: TimeMs, limit: usize) -> Vec<WorldMessage> {
        self.iter_oldest_first()
            .filter(|msg| msg.timestamp() > since)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Iterate the ring contents in insertion order.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &WorldMessage> {
        let start = if self.slots.len() < self.capacity {
            0
        } else {
            self.write
        };
        (0..self.slots.len()).map(move |i| &self.slots[(start + i) % self.slots.len()])
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Total events ever recorded, including overwritten ones.
    pub fn total_count(&self) -> u64 {
        self.total
    }
}

impl Default for EventRing {
    fn default() -> Self {
        Self::new()
    }
}
