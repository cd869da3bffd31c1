//! Fluent builder for constructing an [`Arena`].

use arena_core::{Obstacle, WorldClock};
use arena_phase::PhaseTimings;
use arena_registry::{AgentProfile, AgentRegistry};

use crate::arena::Arena;

/// Startup configuration for the simulation core.
///
/// Deployment-level settings (bind address, data dir) live in the server
/// binary; this is only what the simulation itself needs.
#[derive(Clone, Debug, Default)]
pub struct ArenaConfig {
    /// RNG seed.  `None` seeds from entropy; tests pin it.
    pub seed: Option<u64>,
    /// Static world geometry, fixed for the process lifetime.
    pub obstacles: Vec<Obstacle>,
    /// Phase durations.
    pub phase_timings: PhaseTimings,
}

/// Fluent builder for [`Arena`].
///
/// # Example
///
/// ```rust,ignore
/// let arena = ArenaBuilder::new()
///     .seed(42)
///     .obstacles(obstacles)
///     .profiles(load_profiles(&path)?)
///     .build();
/// ```
pub struct ArenaBuilder {
    config: ArenaConfig,
    profiles: Vec<AgentProfile>,
}

impl ArenaBuilder {
    pub fn new() -> Self {
        Self {
            config: ArenaConfig::default(),
            profiles: Vec::new(),
        }
    }

    pub fn config(mut self, config: ArenaConfig) -> Self {
        self.config = config;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn obstacles(mut self, obstacles: Vec<Obstacle>) -> Self {
        self.config.obstacles = obstacles;
        self
    }

    pub fn phase_timings(mut self, timings: PhaseTimings) -> Self {
        self.config.phase_timings = timings;
        self
    }

    /// Seed the registry from a disk snapshot.
    pub fn profiles(mut self, profiles: Vec<AgentProfile>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn build(self) -> Arena {
        let registry = AgentRegistry::from_profiles(self.profiles);
        Arena::from_parts(self.config, registry, WorldClock::new())
    }
}

impl Default for ArenaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
