//! Sliding-window rate limiter.
//!
//! # Implementation
//!
//! Each agent owns a timestamp ring: a `Vec<TimeMs>` plus a head pointer.
//! Checking advances the head past entries older than the 1-second window
//! (O(expired) amortized), compares the live count against the cap, and
//! appends.  The vector is compacted once the dead prefix grows past a
//! threshold, and buckets idle for 5 s are evicted wholesale so departed
//! agents do not leak memory.

use rustc_hash::FxHashMap;

use arena_core::constants::{RATE_BUCKET_IDLE_MS, RATE_LIMIT_PER_SEC, RATE_WINDOW_MS};
use arena_core::{AgentId, TimeMs};

/// Dead-prefix length that triggers a compaction.
const COMPACT_THRESHOLD: usize = 64;

#[derive(Default)]
struct Bucket {
    stamps: Vec<TimeMs>,
    head: usize,
    last_used: TimeMs,
}

impl Bucket {
    fn live(&self) -> usize {
        self.stamps.len() - self.head
    }
}

/// Per-agent sliding-window limiter, capped at
/// [`RATE_LIMIT_PER_SEC`] commands per [`RATE_WINDOW_MS`].
#[derive(Default)]
pub struct RateLimiter {
    buckets: FxHashMap<AgentId, Bucket>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one command attempt.  `Err(retry_after_ms)` when over the cap;
    /// rejected attempts do not consume a slot.
    pub fn check(&mut self, id: &AgentId, now: TimeMs) -> Result<(), u64> {
        let bucket = self.buckets.entry(id.clone()).or_default();
        bucket.last_used = now;

        while bucket.head < bucket.stamps.len()
            && now.since(bucket.stamps[bucket.head]) >= RATE_WINDOW_MS
        {
            bucket.head += 1;
        }
        if bucket.head >= COMPACT_THRESHOLD {
            bucket.stamps.drain(..bucket.head);
            bucket.head = 0;
        }

        if bucket.live() >= RATE_LIMIT_PER_SEC {
            let oldest = bucket.stamps[bucket.head];
            let retry = RATE_WINDOW_MS.saturating_sub(now.since(oldest)).max(1);
            return Err(retry);
        }
        bucket.stamps.push(now);
        Ok(())
    }

    /// Drop buckets with no activity inside the idle window.
    pub fn evict_stale(&mut self, now: TimeMs) {
        self.buckets
            .retain(|_, bucket| now.since(bucket.last_used) < RATE_BUCKET_IDLE_MS);
    }

    /// Forget one agent entirely (called on leave).
    pub fn forget(&mut self, id: &AgentId) {
        self.buckets.remove(id);
    }

    /// Number of tracked agents (test hook).
    pub fn tracked(&self) -> usize {
        self.buckets.len()
    }
}
