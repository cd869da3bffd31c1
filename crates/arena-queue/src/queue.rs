//! The queue itself.

use arena_core::constants::{
    MAX_CHAT_LEN, MAX_QUEUE_DEPTH, OBSTACLE_CLEARANCE, RATE_BUCKET_IDLE_MS,
};
use arena_core::geom::{self, Obstacle};
use arena_core::{AgentId, Reject, RejectResult, TimeMs, WorldMessage};

use crate::limiter::RateLimiter;

/// Enqueued commands may not claim a timestamp further than this from the
/// server clock in either direction.
const MAX_TIMESTAMP_SKEW_MS: u64 = 5 * 60 * 1_000;

/// Pending world messages in arrival order, with boundary validation.
pub struct CommandQueue {
    pending: Vec<WorldMessage>,
    limiter: RateLimiter,
    obstacles: Vec<Obstacle>,
    last_evict: TimeMs,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            limiter: RateLimiter::new(),
            obstacles: Vec::new(),
            last_evict: TimeMs::ZERO,
        }
    }

    /// Install the static world geometry.  Called once at startup.
    pub fn set_obstacles(&mut self, obstacles: Vec<Obstacle>) {
        self.obstacles = obstacles;
    }

    // ── Enqueue ───────────────────────────────────────────────────────────

    /// Validate and append one message.
    ///
    /// Checks run in a fixed order — agent id, timestamp, rate limit,
    /// position (finite, bounds, obstacles), text, capacity — and the first
    /// failure is returned without mutating anything except the rate-limit
    /// bookkeeping for accepted commands.
    pub fn enqueue(&mut self, msg: WorldMessage, now: TimeMs) -> RejectResult<()> {
        self.maybe_evict(now);

        if !AgentId::is_well_formed(msg.agent_id().as_str()) {
            return Err(Reject::InvalidAgentId);
        }

        let ts = msg.timestamp();
        if ts == TimeMs::ZERO
            || ts.since(now) > MAX_TIMESTAMP_SKEW_MS
            || now.since(ts) > MAX_TIMESTAMP_SKEW_MS
        {
            return Err(Reject::InvalidTimestamp);
        }

        if msg.is_rate_limited() {
            if let Err(retry_after_ms) = self.limiter.check(msg.agent_id(), now) {
                return Err(Reject::RateLimited { retry_after_ms });
            }
        }

        if let WorldMessage::Position { x, y, z, rotation, .. } = &msg {
            if !geom::all_finite(&[*x, *y, *z, *rotation]) {
                return Err(Reject::InvalidPosition);
            }
            if !geom::in_bounds(*x, *z) {
                return Err(Reject::OutOfBounds);
            }
            if self
                .obstacles
                .iter()
                .any(|o| o.blocks(*x, *z, OBSTACLE_CLEARANCE))
            {
                return Err(Reject::Collision);
            }
        }

        match &msg {
            WorldMessage::Chat { text, .. } | WorldMessage::Whisper { text, .. } => {
                if text.trim().is_empty() {
                    return Err(Reject::InvalidText);
                }
                if text.chars().count() > MAX_CHAT_LEN {
                    return Err(Reject::TextTooLong);
                }
            }
            _ => {}
        }

        if self.pending.len() >= MAX_QUEUE_DEPTH {
            return Err(Reject::QueueFull);
        }

        self.pending.push(msg);
        Ok(())
    }

    /// Append a server-originated message, skipping agent-facing validation.
    ///
    /// Used for events the simulation mints itself (battle updates, phase
    /// changes, the deferred `leave` after a death).  These bypass the
    /// capacity cap: dropping them would desynchronize observers.
    pub fn push_trusted(&mut self, msg: WorldMessage) {
        self.pending.push(msg);
    }

    // ── Tick-side operations ──────────────────────────────────────────────

    /// Take the pending batch, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<WorldMessage> {
        std::mem::take(&mut self.pending)
    }

    /// Drop an agent's pending commands and limiter state (called on leave).
    pub fn prune_agent(&mut self, id: &AgentId) {
        self.pending.retain(|msg| msg.agent_id() != id);
        self.limiter.forget(id);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn maybe_evict(&mut self, now: TimeMs) {
        if now.since(self.last_evict) >= RATE_BUCKET_IDLE_MS {
            self.limiter.evict_stale(now);
            self.last_evict = now;
        }
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}
