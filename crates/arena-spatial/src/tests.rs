//! Unit tests for arena-spatial.

use arena_core::AgentId;

use crate::SpatialGrid;

fn grid_of(points: &[(&str, f64, f64)]) -> (SpatialGrid, Vec<AgentId>) {
    let ids: Vec<AgentId> = points.iter().map(|(id, _, _)| AgentId::from(*id)).collect();
    let mut grid = SpatialGrid::new();
    grid.rebuild(
        ids.iter()
            .zip(points)
            .map(|(id, (_, x, z))| (id, (*x, *z))),
    );
    (grid, ids)
}

#[test]
fn finds_agents_within_radius() {
    let (grid, _) = grid_of(&[("a", 0.0, 0.0), ("b", 3.0, 4.0), ("c", 50.0, 50.0)]);
    let hits = grid.query_radius(0.0, 0.0, 5.0);
    assert!(hits.contains(&AgentId::from("a")));
    assert!(hits.contains(&AgentId::from("b"))); // exactly 5.0 away
    assert!(!hits.contains(&AgentId::from("c")));
}

#[test]
fn radius_filter_is_exact_not_cell_granular() {
    // Same cell as the origin (cell size 10) but 9.9 units away.
    let (grid, _) = grid_of(&[("far", 7.0, 7.0)]);
    assert!(grid.query_radius(0.0, 0.0, 9.0).is_empty());
    assert_eq!(grid.query_radius(0.0, 0.0, 10.0).len(), 1);
}

#[test]
fn crosses_cell_boundaries() {
    let (grid, _) = grid_of(&[("west", -1.0, 0.0), ("east", 1.0, 0.0)]);
    let hits = grid.query_radius(0.0, 0.0, 2.0);
    assert_eq!(hits.len(), 2);
}

#[test]
fn negative_coordinates_index_correctly() {
    let (grid, _) = grid_of(&[("sw", -145.0, -145.0)]);
    assert_eq!(grid.query_radius(-145.0, -145.0, 1.0).len(), 1);
    assert!(grid.query_radius(145.0, 145.0, 1.0).is_empty());
}

#[test]
fn rebuild_replaces_previous_contents() {
    let (mut grid, _) = grid_of(&[("a", 0.0, 0.0)]);
    assert_eq!(grid.len(), 1);

    let b = AgentId::from("b");
    grid.rebuild([(&b, (20.0, 20.0))]);
    assert_eq!(grid.len(), 1);
    assert!(grid.query_radius(0.0, 0.0, 5.0).is_empty());
    assert_eq!(grid.query_radius(20.0, 20.0, 1.0).len(), 1);
}

#[test]
fn degenerate_radius_is_empty() {
    let (grid, _) = grid_of(&[("a", 0.0, 0.0)]);
    assert!(grid.query_radius(0.0, 0.0, -1.0).is_empty());
    assert!(grid.query_radius(0.0, 0.0, f64::NAN).is_empty());
    // Zero radius still matches an agent at the exact point.
    assert_eq!(grid.query_radius(0.0, 0.0, 0.0).len(), 1);
}
