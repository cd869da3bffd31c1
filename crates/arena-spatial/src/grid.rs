//! The grid itself.

use rustc_hash::{FxHashMap, FxHashSet};

use arena_core::geom::dist_sq;
use arena_core::AgentId;

/// Cell side length in world units.
const CELL_SIZE: f64 = 10.0;

/// A uniform grid mapping cell coordinates to the agents inside them.
///
/// Rebuilt from scratch each tick by the simulation loop; queries between
/// rebuilds see a consistent snapshot of that tick's positions.
#[derive(Default)]
pub struct SpatialGrid {
    cells: FxHashMap<(i32, i32), Vec<AgentId>>,
    /// Positions retained for the exact-distance filter in `query_radius`.
    positions: FxHashMap<AgentId, (f64, f64)>,
}

impl SpatialGrid {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn cell_of(x: f64, z: f64) -> (i32, i32) {
        (
            (x / CELL_SIZE).floor() as i32,
            (z / CELL_SIZE).floor() as i32,
        )
    }

    /// Replace the index with the current position map.
    pub fn rebuild<'a, I>(&mut self, positions: I)
    where
        I: IntoIterator<Item = (&'a AgentId, (f64, f64))>,
    {
        self.cells.clear();
        self.positions.clear();
        for (id, (x, z)) in positions {
            self.cells
                .entry(Self::cell_of(x, z))
                .or_default()
                .push(id.clone());
            self.positions.insert(id.clone(), (x, z));
        }
    }

    /// All agents within `radius` of `(x, z)`, by true Euclidean distance.
    pub fn query_radius(&self, x: f64, z: f64, radius: f64) -> FxHashSet<AgentId> {
        let mut found = FxHashSet::default();
        if !radius.is_finite() || radius < 0.0 {
            return found;
        }
        let (min_cx, min_cz) = Self::cell_of(x - radius, z - radius);
        let (max_cx, max_cz) = Self::cell_of(x + radius, z + radius);
        let r_sq = radius * radius;

        for cx in min_cx..=max_cx {
            for cz in min_cz..=max_cz {
                let Some(ids) = self.cells.get(&(cx, cz)) else {
                    continue;
                };
                for id in ids {
                    let (ax, az) = self.positions[id];
                    if dist_sq(x, z, ax, az) <= r_sq {
                        found.insert(id.clone());
                    }
                }
            }
        }
        found
    }

    /// Number of indexed agents.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
