//! Uniform-grid broad phase.
//!
//! Every body is binned into each grid cell its bounding circle overlaps.
//! Bodies sharing a cell become candidate pairs for the narrow phase.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;

use crate::BodyHandle;

/// Grid cell coordinate.
type GridKey = (i32, i32);

/// Candidate pair finder over a uniform grid.
#[derive(Debug)]
pub(crate) struct BroadPhase {
    cell_size: f32,
    cells: BTreeMap<GridKey, Vec<BodyHandle>>,
}

impl BroadPhase {
    pub(crate) fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: BTreeMap::new(),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn key(&self, point: Vec2) -> GridKey {
        (
            (point.x / self.cell_size).floor() as i32,
            (point.y / self.cell_size).floor() as i32,
        )
    }

    /// Bins a body by its bounding circle.
    pub(crate) fn insert(&mut self, handle: BodyHandle, centre: Vec2, radius: f32) {
        let (min_x, min_y) = self.key(centre - Vec2::splat(radius));
        let (max_x, max_y) = self.key(centre + Vec2::splat(radius));
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                self.cells.entry((x, y)).or_default().push(handle);
            }
        }
    }

    /// Returns every candidate pair once, ordered `(lower, higher)` and sorted.
    pub(crate) fn pairs(&self) -> BTreeSet<(BodyHandle, BodyHandle)> {
        let mut pairs = BTreeSet::new();
        for bucket in self.cells.values() {
            for (i, &a) in bucket.iter().enumerate() {
                for &b in &bucket[i + 1..] {
                    pairs.insert(if a < b { (a, b) } else { (b, a) });
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearby_bodies_pair_once() {
        let mut grid = BroadPhase::new(10.0);
        // Straddles four cells together with the second body.
        grid.insert(BodyHandle(1), Vec2::new(9.0, 9.0), 3.0);
        grid.insert(BodyHandle(2), Vec2::new(11.0, 11.0), 3.0);
        let pairs = grid.pairs();
        assert_eq!(pairs.len(), 1);
        assert!(pairs.contains(&(BodyHandle(1), BodyHandle(2))));
    }

    #[test]
    fn distant_bodies_do_not_pair() {
        let mut grid = BroadPhase::new(10.0);
        grid.insert(BodyHandle(1), Vec2::new(0.0, 0.0), 1.0);
        grid.insert(BodyHandle(2), Vec2::new(100.0, 0.0), 1.0);
        assert!(grid.pairs().is_empty());
    }

    #[test]
    fn negative_coordinates_bin_by_floor() {
        let mut grid = BroadPhase::new(10.0);
        grid.insert(BodyHandle(3), Vec2::new(-0.5, -0.5), 0.1);
        grid.insert(BodyHandle(4), Vec2::new(0.5, 0.5), 0.1);
        assert!(grid.pairs().is_empty());
    }
}
