//! Plane geometry helpers.
//!
//! The island is a flat square on the `x,z` plane (`y` is always 0 for
//! grounded agents), so everything here is 2-D: squared distances for cheap
//! comparisons, finiteness checks at the validation boundary, and the static
//! obstacle shape.

use crate::constants::{SPAWN_EDGE_MARGIN, WORLD_HALF};

/// Squared Euclidean distance on the `x,z` plane.
#[inline]
pub fn dist_sq(x1: f64, z1: f64, x2: f64, z2: f64) -> f64 {
    let dx = x2 - x1;
    let dz = z2 - z1;
    dx * dx + dz * dz
}

/// Euclidean distance on the `x,z` plane.
#[inline]
pub fn dist(x1: f64, z1: f64, x2: f64, z2: f64) -> f64 {
    dist_sq(x1, z1, x2, z2).sqrt()
}

/// True when both points are within `r` of each other.
#[inline]
pub fn within(x1: f64, z1: f64, x2: f64, z2: f64, r: f64) -> bool {
    dist_sq(x1, z1, x2, z2) <= r * r
}

/// True when every value is a finite float (rejects NaN and ±∞).
#[inline]
pub fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// True when the point lies on the island: `|x|, |z| <= WORLD_HALF`.
#[inline]
pub fn in_bounds(x: f64, z: f64) -> bool {
    x.abs() <= WORLD_HALF && z.abs() <= WORLD_HALF
}

/// Clamp a point to the island interior, `SPAWN_EDGE_MARGIN` from the edge.
#[inline]
pub fn clamp_to_interior(x: f64, z: f64) -> (f64, f64) {
    let lim = WORLD_HALF - SPAWN_EDGE_MARGIN;
    (x.clamp(-lim, lim), z.clamp(-lim, lim))
}

// ── Obstacle ──────────────────────────────────────────────────────────────────

/// A static circular obstacle on the island plane.
///
/// The list is fixed at startup and shared read-only with the command queue
/// (movement collision) and the world state (spawn clearance).
#[derive(Copy, Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Obstacle {
    pub x: f64,
    pub z: f64,
    pub radius: f64,
}

impl Obstacle {
    /// True when `(x, z)` is closer than `radius + clearance` to the center.
    #[inline]
    pub fn blocks(&self, x: f64, z: f64, clearance: f64) -> bool {
        let r = self.radius + clearance;
        dist_sq(self.x, self.z, x, z) < r * r
    }
}
