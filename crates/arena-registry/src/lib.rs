//! `arena-registry` — durable agent identity and combat bookkeeping.
//!
//! The registry is the only component that outlives an agent's presence in
//! the world: positions vanish on `leave`, but the profile (and its combat
//! record, including permanent death) stays until round reset.  Profiles are
//! periodically snapshotted to disk as a JSON list; the flush is debounced
//! so a burst of mutations costs one write.

pub mod profile;
pub mod registry;
pub mod store;


pub use profile::{AgentProfile, CombatStats, RegisterSpec};
pub use registry::AgentRegistry;
pub use store::{RegistryStoreError, load_profiles, save_profiles};
