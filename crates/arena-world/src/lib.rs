//! `arena-world` — the authoritative world state.
//!
//! Owns agent positions and action labels while agents are in the world,
//! the 200-event history ring for late joiners, and spawn-point selection.
//! Profiles belong to `arena-registry`; the world only touches them through
//! the registry reference handed into [`WorldState::apply`], so the two
//! stores never hold pointers to each other.

pub mod events;
pub mod spawn;
pub mod state;


pub use events::EventRing;
pub use spawn::SpawnSelector;
pub use state::{AgentPosition, AgentSnapshot, WorldState};
