//! World time model.
//!
//! # Design
//!
//! All wire-visible timestamps are Unix-epoch milliseconds (`TimeMs`).  The
//! server is the only stamp source: [`WorldClock::stamp`] reads the wall
//! clock and clamps it to be non-decreasing, so the ordering guarantee
//! "event timestamps never go backwards, within a tick they reflect enqueue
//! order" holds even across NTP adjustments.
//!
//! The tick counter (`TickId`) is bookkeeping only — snapshot cadence,
//! observer acks, metrics.  It never appears in agent-facing payloads.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

// ── TimeMs ────────────────────────────────────────────────────────────────────

/// A Unix-epoch timestamp in milliseconds.
///
/// Stored as `u64`: overflows in ~584 million years.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TimeMs(pub u64);

impl TimeMs {
    pub const ZERO: TimeMs = TimeMs(0);

    /// The timestamp `ms` milliseconds after `self`.
    #[inline]
    pub fn offset(self, ms: u64) -> TimeMs {
        TimeMs(self.0 + ms)
    }

    /// Milliseconds elapsed from `earlier` to `self`; 0 if `earlier` is later.
    #[inline]
    pub fn since(self, earlier: TimeMs) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for TimeMs {
    type Output = TimeMs;
    #[inline]
    fn add(self, rhs: u64) -> TimeMs {
        TimeMs(self.0 + rhs)
    }
}

impl fmt::Display for TimeMs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

// ── TickId ────────────────────────────────────────────────────────────────────

/// An absolute simulation tick counter (20 Hz nominal).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TickId(pub u64);

impl TickId {
    pub const ZERO: TickId = TickId(0);

    #[inline]
    pub fn next(self) -> TickId {
        TickId(self.0 + 1)
    }

    /// True every `n` ticks (used for the 5-second snapshot cadence).
    #[inline]
    pub fn is_multiple_of(self, n: u64) -> bool {
        n > 0 && self.0.is_multiple_of(n)
    }
}

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── WorldClock ────────────────────────────────────────────────────────────────

/// Monotonic wall-clock stamp source.
///
/// `stamp()` never returns a value smaller than the previous one.  Equal
/// stamps are allowed (several commands in the same millisecond); strict
/// per-command increments are the command queue's job via `stamp_after`.
#[derive(Clone, Debug, Default)]
pub struct WorldClock {
    last: TimeMs,
}

impl WorldClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw wall-clock reading, unclamped.  Prefer [`stamp`][Self::stamp]
    /// anywhere the result is attached to an event.
    pub fn wall_now() -> TimeMs {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        TimeMs(ms)
    }

    /// Non-decreasing wall-clock stamp.
    pub fn stamp(&mut self) -> TimeMs {
        let now = Self::wall_now().max(self.last);
        self.last = now;
        now
    }

    /// A stamp guaranteed to be `> floor` and non-decreasing.  Used for
    /// server-synthesized follow-up events (e.g. the `leave` that trails a
    /// battle death at `timestamp + 1`).
    pub fn stamp_after(&mut self, floor: TimeMs) -> TimeMs {
        let t = self.stamp().max(floor.offset(1));
        self.last = t;
        t
    }

    /// Pin the clock floor — test hook so stamp sequences are predictable.
    pub fn advance_to(&mut self, at: TimeMs) {
        self.last = self.last.max(at);
    }
}
