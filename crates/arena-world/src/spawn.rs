//! Spawn-point selection.
//!
//! Joins without explicit coordinates get a uniformly distributed point in
//! the spawn disc (radius 35 around the origin), rejection-sampled away
//! from other agents and obstacles.  Chosen points are reserved for 20 s so
//! a burst of simultaneous joins cannot all pick the same clearing before
//! any of them has a recorded position.

use std::f64::consts::TAU;

use arena_core::constants::{
    SPAWN_ATTEMPTS, SPAWN_FALLBACK_ANNULUS, SPAWN_OBSTACLE_CLEARANCE, SPAWN_RADIUS,
    SPAWN_RESERVE_MS, SPAWN_SEPARATION,
};
use arena_core::geom::{self, Obstacle};
use arena_core::{SimRng, TimeMs};

/// A resolved spawn: position plus facing.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpawnPoint {
    pub x: f64,
    pub z: f64,
    pub rotation: f64,
}

/// Stateful selector holding the short-lived reservations.
#[derive(Default)]
pub struct SpawnSelector {
    reservations: Vec<(f64, f64, TimeMs)>,
}

impl SpawnSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick a spawn point.
    ///
    /// `explicit` coordinates (when finite) are clamped to the island
    /// interior and used verbatim.  `occupied` is the current position list;
    /// reservations from recent joins count as occupied too.
    pub fn select(
        &mut self,
        explicit: Option<(f64, f64, f64)>,
        occupied: &[(f64, f64)],
        obstacles: &[Obstacle],
        rng: &mut SimRng,
        now: TimeMs,
    ) -> SpawnPoint {
        self.prune(now);

        if let Some((x, z, rotation)) = explicit {
            if geom::all_finite(&[x, z, rotation]) {
                let (x, z) = geom::clamp_to_interior(x, z);
                self.reserve(x, z, now);
                return SpawnPoint { x, z, rotation };
            }
        }

        for _ in 0..SPAWN_ATTEMPTS {
            // sqrt scaling → uniform density over the disc area.
            let r = SPAWN_RADIUS * rng.unit().sqrt();
            let theta = rng.unit() * TAU;
            let x = r * theta.cos();
            let z = r * theta.sin();
            if self.is_clear(x, z, occupied, obstacles) {
                let rotation = rng.unit() * TAU;
                self.reserve(x, z, now);
                return SpawnPoint { x, z, rotation };
            }
        }

        // Disc saturated: fall back to a random point in the [12, 22] annulus.
        let (min_r, max_r) = SPAWN_FALLBACK_ANNULUS;
        let r = rng.gen_range(min_r..max_r);
        let theta = rng.unit() * TAU;
        let point = SpawnPoint {
            x: r * theta.cos(),
            z: r * theta.sin(),
            rotation: rng.unit() * TAU,
        };
        self.reserve(point.x, point.z, now);
        point
    }

    /// Reservation count, post-prune (test hook).
    pub fn reserved(&self) -> usize {
        self.reservations.len()
    }

    fn is_clear(&self, x: f64, z: f64, occupied: &[(f64, f64)], obstacles: &[Obstacle]) -> bool {
        let sep_sq = SPAWN_SEPARATION * SPAWN_SEPARATION;
        // Reservations participate in the same separation rule as live agents.
        let crowded = occupied
            .iter()
            .any(|&(ox, oz)| geom::dist_sq(x, z, ox, oz) < sep_sq)
            || self
                .reservations
                .iter()
                .any(|&(rx, rz, _)| geom::dist_sq(x, z, rx, rz) < sep_sq);
        if crowded {
            return false;
        }
        !obstacles
            .iter()
            .any(|o| o.blocks(x, z, SPAWN_OBSTACLE_CLEARANCE))
    }

    fn reserve(&mut self, x: f64, z: f64, now: TimeMs) {
        self.reservations.push((x, z, now));
    }

    fn prune(&mut self, now: TimeMs) {
        self.reservations
            .retain(|(_, _, at)| now.since(*at) < SPAWN_RESERVE_MS);
    }
}
