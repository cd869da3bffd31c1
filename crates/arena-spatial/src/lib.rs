//! `arena-spatial` — a uniform 2-D grid over the `x,z` plane.
//!
//! # Why full rebuild
//!
//! The population is bounded (≤ 100 agents), so rebuilding the whole index
//! from the position map once per tick is an O(N) scan with no incremental
//! bookkeeping to get wrong.  Radius queries then touch only the cells whose
//! bounding box intersects the query disc.

mod grid;

#[cfg(test)]
mod tests;

pub use grid::SpatialGrid;
