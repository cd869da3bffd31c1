//! `arena-queue` — the validated command queue.
//!
//! Everything an agent asks of the world passes through [`CommandQueue::enqueue`]
//! before the tick loop sees it.  Validation is synchronous so the caller gets
//! its rejection (rate limit, bounds, capacity) in the command response; the
//! accepted messages sit in arrival order until the next tick drains them.
//!
//! Backpressure is intentional: `rate_limited` and `queue_full` are surfaced
//! to the agent so it can slow down.  The queue is not persistent — commands
//! in flight across a restart are lost by design.

pub mod limiter;
pub mod queue;

#[cfg(test)]
mod tests;

pub use limiter::RateLimiter;
pub use queue::CommandQueue;
