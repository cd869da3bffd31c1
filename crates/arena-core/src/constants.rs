//! World constants that appear on the wire or in validation rules.
//!
//! Everything here is part of the protocol contract with agents and
//! observers; tunables that are deployment-local (phase durations, bind
//! address) live in the server configuration instead.

// ── Geometry ──────────────────────────────────────────────────────────────────

/// Side length of the square island; coordinates span `[-150, 150]`.
pub const WORLD_SIZE: f64 = 300.0;

/// Half-extent of the island: the bounds check is `|x|, |z| <= WORLD_HALF`.
pub const WORLD_HALF: f64 = WORLD_SIZE / 2.0;

/// Radius of the spawn disc around the origin.
pub const SPAWN_RADIUS: f64 = 35.0;

/// Explicit join coordinates are clamped this far inside the island edge.
pub const SPAWN_EDGE_MARGIN: f64 = 6.0;

/// Minimum spacing between a spawn candidate and any existing agent.
pub const SPAWN_SEPARATION: f64 = 4.8;

/// Extra clearance between a spawn candidate and an obstacle edge.
pub const SPAWN_OBSTACLE_CLEARANCE: f64 = 1.2;

/// Rejection-sampling attempts before falling back to the annulus.
pub const SPAWN_ATTEMPTS: u32 = 48;

/// Fallback annulus `[min, max]` radius when the spawn disc is saturated.
pub const SPAWN_FALLBACK_ANNULUS: (f64, f64) = (12.0, 22.0);

/// How long a chosen spawn point stays reserved against burst joins.
pub const SPAWN_RESERVE_MS: u64 = 20_000;

/// Clearance added to an obstacle radius for movement collision checks.
pub const OBSTACLE_CLEARANCE: f64 = 1.0;

// ── Interaction ranges ────────────────────────────────────────────────────────

/// Maximum distance between duelists at battle start.
pub const BATTLE_START_RANGE: f64 = 12.0;

/// Audible chat radius around a speaker.
pub const CHAT_RANGE: f64 = 20.0;

/// Area-of-interest radius around an observer viewport.
pub const AOI_RADIUS: f64 = 40.0;

/// General proximity radius (nearby-agent queries).
pub const PROXIMITY_RADIUS: f64 = 60.0;

// ── Rates & capacities ────────────────────────────────────────────────────────

/// Simulation ticks per second.
pub const TICK_RATE: u64 = 20;

/// Nominal tick period in milliseconds.
pub const TICK_INTERVAL_MS: u64 = 1_000 / TICK_RATE;

/// A full snapshot goes to every observer this often (5 s at 20 Hz).
pub const SNAPSHOT_INTERVAL_TICKS: u64 = TICK_RATE * 5;

/// Per-agent command cap within [`RATE_WINDOW_MS`].
pub const RATE_LIMIT_PER_SEC: usize = 20;

/// Sliding rate-limit window.
pub const RATE_WINDOW_MS: u64 = 1_000;

/// Rate-limit buckets idle this long are evicted.
pub const RATE_BUCKET_IDLE_MS: u64 = 5_000;

/// Maximum pending commands; the next enqueue is rejected.
pub const MAX_QUEUE_DEPTH: usize = 10_000;

/// Maximum chat/whisper text length in characters.
pub const MAX_CHAT_LEN: usize = 500;

/// Maximum concurrently registered-and-present agents.
pub const MAX_AGENTS: usize = 100;

/// Capacity of the late-joiner event history ring.
pub const EVENT_RING_CAPACITY: usize = 200;

// ── Timeouts & windows ────────────────────────────────────────────────────────

/// Wall-clock budget for a battle turn before auto-guard kicks in.
pub const TURN_TIMEOUT_MS: u64 = 30_000;

/// How often the battle timeout scan runs.
pub const TIMEOUT_SCAN_INTERVAL_MS: u64 = 1_000;

/// `last_seen` within this window counts as "online" for snapshots.
pub const ONLINE_WINDOW_MS: u64 = 5 * 60 * 1_000;

/// Registry mutations are coalesced for this long before a disk flush.
pub const REGISTRY_FLUSH_DEBOUNCE_MS: u64 = 5_000;

/// Inbound observer frames larger than this are dropped.
pub const MAX_INBOUND_FRAME_BYTES: usize = 64 * 1024;

/// Viewport coordinates beyond this magnitude are rejected.
pub const MAX_VIEWPORT_ABS: f64 = 10_000.0;

// ── Wallet shape ──────────────────────────────────────────────────────────────

pub const WALLET_MIN_LEN: usize = 12;
pub const WALLET_MAX_LEN: usize = 180;
