//! `arena-phase` — round structure overlaying the world.
//!
//! Three cooperating pieces:
//!
//! - [`PhaseManager`]: the `lobby → battle → showdown` timer that gates
//!   combat and sets the alliance size cap.
//! - [`SurvivalContract`]: prize-pool settlement — winner, split, or refusal.
//! - [`AllianceBook`]: named member sets consulted by battle-start checks
//!   and trimmed at phase transitions.

pub mod alliance;
pub mod phase;
pub mod survival;


pub use alliance::{Alliance, AllianceBook};
pub use phase::{PhaseManager, PhaseState, PhaseTimings};
pub use survival::{SurvivalContract, SurvivalState};
