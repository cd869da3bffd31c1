//! Unit tests for arena-queue.

use arena_core::constants::{MAX_QUEUE_DEPTH, WORLD_HALF};
use arena_core::{AgentId, Obstacle, Reject, TimeMs, WorldMessage};

use crate::limiter::RateLimiter;
use crate::queue::CommandQueue;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn move_msg(id: &str, x: f64, z: f64, ts: u64) -> WorldMessage {
    WorldMessage::Position {
        agent_id:  AgentId::from(id),
        x,
        y:         0.0,
        z,
        rotation:  0.0,
        timestamp: TimeMs(ts),
    }
}

fn chat_msg(id: &str, text: &str, ts: u64) -> WorldMessage {
    WorldMessage::Chat {
        agent_id:  AgentId::from(id),
        text:      text.to_owned(),
        timestamp: TimeMs(ts),
    }
}

fn join_msg(id: &str, ts: u64) -> WorldMessage {
    WorldMessage::Join {
        agent_id:  AgentId::from(id),
        name:      id.to_owned(),
        color:     "#fff".to_owned(),
        x:         0.0,
        z:         0.0,
        rotation:  0.0,
        timestamp: TimeMs(ts),
    }
}

// ── Rate limiter ──────────────────────────────────────────────────────────────

mod limiter_tests {
    use super::*;

    #[test]
    fn exactly_twenty_pass_then_reject() {
        let mut limiter = RateLimiter::new();
        let id = AgentId::from("a");
        for i in 0..20 {
            assert!(limiter.check(&id, TimeMs(1_000 + i)).is_ok(), "command {i}");
        }
        let retry = limiter.check(&id, TimeMs(1_030)).unwrap_err();
        assert!(retry > 0 && retry <= 1_000);
    }

    #[test]
    fn window_slides() {
        let mut limiter = RateLimiter::new();
        let id = AgentId::from("a");
        for i in 0..20 {
            limiter.check(&id, TimeMs(1_000 + i)).unwrap();
        }
        assert!(limiter.check(&id, TimeMs(1_500)).is_err());
        // 1 s after the first stamp, one slot frees up.
        assert!(limiter.check(&id, TimeMs(2_000)).is_ok());
        assert!(limiter.check(&id, TimeMs(2_000)).is_err(), "slot refilled immediately");
        assert!(limiter.check(&id, TimeMs(2_001)).is_ok(), "second stamp expires a ms later");
    }

    #[test]
    fn rejected_attempts_do_not_consume_slots() {
        let mut limiter = RateLimiter::new();
        let id = AgentId::from("a");
        for _ in 0..20 {
            limiter.check(&id, TimeMs(1_000)).unwrap();
        }
        for _ in 0..50 {
            assert!(limiter.check(&id, TimeMs(1_500)).is_err());
        }
        // All 20 real stamps expire together; the 50 rejects left no trace.
        assert!(limiter.check(&id, TimeMs(2_000)).is_ok());
    }

    #[test]
    fn agents_are_isolated() {
        let mut limiter = RateLimiter::new();
        for _ in 0..20 {
            limiter.check(&AgentId::from("a"), TimeMs(1_000)).unwrap();
        }
        assert!(limiter.check(&AgentId::from("b"), TimeMs(1_000)).is_ok());
    }

    #[test]
    fn idle_buckets_are_evicted() {
        let mut limiter = RateLimiter::new();
        limiter.check(&AgentId::from("a"), TimeMs(1_000)).unwrap();
        limiter.check(&AgentId::from("b"), TimeMs(4_000)).unwrap();
        limiter.evict_stale(TimeMs(6_500));
        assert_eq!(limiter.tracked(), 1, "only the recently active bucket stays");
    }

    #[test]
    fn compaction_preserves_live_window() {
        let mut limiter = RateLimiter::new();
        let id = AgentId::from("a");
        // Push enough expired traffic to trigger compaction several times.
        for burst in 0..10u64 {
            let base = 1_000 + burst * 2_000;
            for i in 0..20 {
                limiter.check(&id, TimeMs(base + i)).unwrap();
            }
        }
        // Fresh window still enforces the cap.
        let base = 100_000;
        for i in 0..20 {
            limiter.check(&id, TimeMs(base + i)).unwrap();
        }
        assert!(limiter.check(&id, TimeMs(base + 100)).is_err());
    }
}

// ── Queue validation ──────────────────────────────────────────────────────────

mod queue_tests {
    use super::*;

    const NOW: TimeMs = TimeMs(1_000_000);

    fn queue() -> CommandQueue {
        CommandQueue::new()
    }

    #[test]
    fn accepts_and_drains_in_order() {
        let mut q = queue();
        q.enqueue(move_msg("a", 1.0, 1.0, NOW.0), NOW).unwrap();
        q.enqueue(chat_msg("b", "hi", NOW.0 + 1), NOW).unwrap();

        let batch = q.drain();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].agent_id(), &AgentId::from("a"));
        assert_eq!(batch[1].agent_id(), &AgentId::from("b"));
        assert!(q.drain().is_empty(), "drain clears pending");
    }

    #[test]
    fn malformed_agent_id_rejected() {
        let mut q = queue();
        assert_eq!(
            q.enqueue(move_msg("has space", 0.0, 0.0, NOW.0), NOW),
            Err(Reject::InvalidAgentId)
        );
    }

    #[test]
    fn zero_or_skewed_timestamp_rejected() {
        let mut q = queue();
        assert_eq!(
            q.enqueue(move_msg("a", 0.0, 0.0, 0), NOW),
            Err(Reject::InvalidTimestamp)
        );
        assert_eq!(
            q.enqueue(move_msg("a", 0.0, 0.0, NOW.0 + 600_000), NOW),
            Err(Reject::InvalidTimestamp)
        );
    }

    #[test]
    fn bounds_are_exact() {
        let mut q = queue();
        assert!(q.enqueue(move_msg("a", WORLD_HALF, 0.0, NOW.0), NOW).is_ok());
        assert!(q.enqueue(move_msg("a", -WORLD_HALF, WORLD_HALF, NOW.0), NOW).is_ok());
        assert_eq!(
            q.enqueue(move_msg("a", WORLD_HALF + 0.001, 0.0, NOW.0), NOW),
            Err(Reject::OutOfBounds)
        );
        assert_eq!(
            q.enqueue(move_msg("a", f64::NAN, 0.0, NOW.0), NOW),
            Err(Reject::InvalidPosition)
        );
    }

    #[test]
    fn obstacle_collision_rejected() {
        let mut q = queue();
        q.set_obstacles(vec![Obstacle { x: 50.0, z: 50.0, radius: 3.0 }]);
        // 3.5 from center < 3 + 1 clearance.
        assert_eq!(
            q.enqueue(move_msg("a", 53.5, 50.0, NOW.0), NOW),
            Err(Reject::Collision)
        );
        assert!(q.enqueue(move_msg("a", 54.5, 50.0, NOW.0), NOW).is_ok());
    }

    #[test]
    fn chat_length_boundary() {
        let mut q = queue();
        assert!(q.enqueue(chat_msg("a", &"x".repeat(500), NOW.0), NOW).is_ok());
        assert_eq!(
            q.enqueue(chat_msg("a", &"x".repeat(501), NOW.0), NOW),
            Err(Reject::TextTooLong)
        );
        assert_eq!(
            q.enqueue(chat_msg("a", "   ", NOW.0), NOW),
            Err(Reject::InvalidText)
        );
    }

    #[test]
    fn rate_limit_applies_only_to_high_frequency_verbs() {
        let mut q = queue();
        for i in 0..20 {
            q.enqueue(move_msg("a", 0.0, 0.0, NOW.0 + i), NOW).unwrap();
        }
        let rejected = q.enqueue(move_msg("a", 0.0, 0.0, NOW.0 + 20), NOW);
        assert!(matches!(rejected, Err(Reject::RateLimited { .. })));

        // Join is not rate limited even for the same busy agent.
        assert!(q.enqueue(join_msg("a", NOW.0 + 21), NOW).is_ok());
    }

    #[test]
    fn capacity_is_exactly_ten_thousand() {
        let mut q = queue();
        for i in 0..MAX_QUEUE_DEPTH {
            // Joins dodge the rate limiter so the cap itself is exercised.
            q.enqueue(join_msg(&format!("agent{i}"), NOW.0), NOW).unwrap();
        }
        assert_eq!(q.len(), MAX_QUEUE_DEPTH);
        assert_eq!(
            q.enqueue(join_msg("straw", NOW.0), NOW),
            Err(Reject::QueueFull)
        );
    }

    #[test]
    fn prune_agent_drops_pending_and_limits() {
        let mut q = queue();
        q.enqueue(move_msg("a", 0.0, 0.0, NOW.0), NOW).unwrap();
        q.enqueue(move_msg("b", 0.0, 0.0, NOW.0), NOW).unwrap();
        q.prune_agent(&AgentId::from("a"));
        let batch = q.drain();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].agent_id(), &AgentId::from("b"));
    }

    #[test]
    fn trusted_push_skips_validation() {
        let mut q = queue();
        // A server-minted leave with a synthetic timestamp sails through.
        q.push_trusted(WorldMessage::Leave {
            agent_id:  AgentId::from("a"),
            reason:    Some("defeated".into()),
            timestamp: TimeMs(1),
        });
        assert_eq!(q.len(), 1);
    }
}
