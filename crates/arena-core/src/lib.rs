//! `arena-core` — foundational types for the arena world server.
//!
//! This crate is a dependency of every other `arena-*` crate.  It intentionally
//! has no `arena-*` dependencies and minimal external ones (only `rand`,
//! `serde`, and `thiserror`).
//!
//! # What lives here
//!
//! | Module        | Contents                                                |
//! |---------------|---------------------------------------------------------|
//! | [`ids`]       | `AgentId`, `BattleId`, `AllianceId`, `ObserverId`       |
//! | [`time`]      | `TimeMs`, `TickId`, `WorldClock`                        |
//! | [`constants`] | World bounds, ranges, rates, capacities                 |
//! | [`geom`]      | Plane distance helpers, finiteness checks, `Obstacle`   |
//! | [`rng`]       | `SimRng` — seedable RNG for spawns and id minting       |
//! | [`message`]   | `WorldMessage` sum type and delivery classification     |
//! | [`combat`]    | `BattleIntent`, `BattleUpdate`, `EndReason`             |
//! | [`round`]     | `GamePhase`, `SurvivalStatus`                           |
//! | [`reject`]    | `Reject` — the wire-token rejection taxonomy            |

pub mod combat;
pub mod constants;
pub mod geom;
pub mod ids;
pub mod message;
pub mod reject;
pub mod rng;
pub mod round;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use combat::{BattleIntent, BattleUpdate, EndReason};
pub use geom::Obstacle;
pub use ids::{AgentId, AllianceId, BattleId, ObserverId};
pub use message::{AgentAction, AgentEmote, Delivery, SkillSpec, WorldMessage};
pub use reject::{Reject, RejectResult};
pub use rng::SimRng;
pub use round::{GamePhase, SurvivalStatus};
pub use time::{TickId, TimeMs, WorldClock};
