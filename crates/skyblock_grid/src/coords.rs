//! Grid alignment arithmetic.
//!
//! Island centers sit on a lattice: `offset + k * island_distance` on both
//! axes. Everything here is pure and works on block coordinates.

use crate::types::Location;

/// Lattice parameters for island centers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub island_distance: i32,
    pub x_offset: i32,
    pub z_offset: i32,
    pub island_height: i32,
}

impl GridLayout {
    pub fn new(island_distance: i32, x_offset: i32, z_offset: i32, island_height: i32) -> Self {
        Self {
            island_distance: island_distance.max(1),
            x_offset,
            z_offset,
            island_height,
        }
    }

    /// True when `(x, z)` is a lattice point.
    pub fn on_grid(&self, x: i32, z: i32) -> bool {
        (i64::from(x) - i64::from(self.x_offset)) % i64::from(self.island_distance) == 0
            && (i64::from(z) - i64::from(self.z_offset)) % i64::from(self.island_distance) == 0
    }

    pub fn on_grid_location(&self, location: &Location) -> bool {
        self.on_grid(location.block_x(), location.block_z())
    }

    /// Nearest lattice coordinate on one axis. Ties round away from the offset.
    pub fn closest_axis(&self, value: i32, offset: i32) -> i32 {
        let distance = f64::from(self.island_distance);
        let steps = ((f64::from(value) - f64::from(offset)) / distance).round();
        // `as` saturates on the way back into i32
        (steps * distance + f64::from(offset)) as i32
    }

    /// Nearest lattice point to `(x, z)`.
    pub fn closest_point(&self, x: i32, z: i32) -> (i32, i32) {
        (
            self.closest_axis(x, self.x_offset),
            self.closest_axis(z, self.z_offset),
        )
    }

    /// Nearest island center to a location, at island height, in the same world.
    pub fn closest_slot(&self, location: &Location) -> Location {
        let (x, z) = self.closest_point(location.block_x(), location.block_z());
        Location::block(&location.world, x, self.island_height, z)
    }

    /// Lattice points in square rings around `(x, z)`, nearest ring first.
    ///
    /// Ring 0 is the start point itself. `max_rings` bounds the search.
    pub fn spiral(&self, x: i32, z: i32, max_rings: u32) -> SlotSpiral {
        let (cx, cz) = self.closest_point(x, z);
        SlotSpiral {
            center_x: cx,
            center_z: cz,
            step: self.island_distance,
            ring: 0,
            index: 0,
            max_rings: max_rings as i32,
        }
    }
}

/// Iterator returned by [`GridLayout::spiral`].
#[derive(Debug, Clone)]
pub struct SlotSpiral {
    center_x: i32,
    center_z: i32,
    step: i32,
    ring: i32,
    index: i32,
    max_rings: i32,
}

impl Iterator for SlotSpiral {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.ring > self.max_rings {
            return None;
        }
        if self.ring == 0 {
            self.ring = 1;
            self.index = 0;
            return Some((self.center_x, self.center_z));
        }

        // A ring of radius r has 8r cells, walked as four edges of length 2r.
        let r = self.ring;
        let edge = 2 * r;
        let side = self.index / edge;
        let along = self.index % edge;
        let (dx, dz) = match side {
            0 => (-r + along, -r),
            1 => (r, -r + along),
            2 => (r - along, r),
            _ => (-r, r - along),
        };

        self.index += 1;
        if self.index == 8 * r {
            self.ring += 1;
            self.index = 0;
        }

        Some((
            self.center_x + dx * self.step,
            self.center_z + dz * self.step,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn layout() -> GridLayout {
        GridLayout::new(200, 0, 0, 120)
    }

    #[test]
    fn test_on_grid() {
        let grid = layout();
        assert!(grid.on_grid(0, 0));
        assert!(grid.on_grid(400, -200));
        assert!(!grid.on_grid(100, 0));

        let shifted = GridLayout::new(200, 50, -30, 120);
        assert!(shifted.on_grid(250, -230));
        assert!(!shifted.on_grid(200, -200));
    }

    #[test]
    fn test_closest_point_rounds_to_nearest() {
        let grid = layout();
        assert_eq!(grid.closest_point(99, 101), (0, 200));
        assert_eq!(grid.closest_point(-99, -101), (0, -200));
        assert_eq!(grid.closest_point(100, -100), (200, -200));
        assert_eq!(grid.closest_point(400, 0), (400, 0));
    }

    #[test]
    fn test_closest_point_respects_offset() {
        let grid = GridLayout::new(200, 50, 50, 120);
        assert_eq!(grid.closest_point(120, -20), (50, 50));
        assert_eq!(grid.closest_point(160, 260), (250, 250));
        assert!(grid.on_grid(grid.closest_point(-777, 1234).0, grid.closest_point(-777, 1234).1));
    }

    #[test]
    fn test_closest_slot_uses_island_height() {
        let grid = layout();
        let slot = grid.closest_slot(&Location::new("skyblock", 210.7, 64.0, -15.2));
        assert_eq!(slot, Location::block("skyblock", 200, 120, 0));
    }

    #[test]
    fn test_extreme_coordinates_saturate() {
        let grid = layout();
        assert_eq!(grid.closest_point(i32::MAX, i32::MIN), (2_147_483_600, -2_147_483_600));
        assert!(grid.on_grid(2_147_483_600, -2_147_483_600));
        assert!(!grid.on_grid(i32::MAX, i32::MIN));

        let shifted = GridLayout::new(200, 50, -30, 120);
        assert!(!shifted.on_grid(i32::MIN, i32::MAX));
    }

    #[test]
    fn test_spiral_visits_each_ring_once() {
        let grid = layout();
        let points: Vec<(i32, i32)> = grid.spiral(0, 0, 2).collect();
        assert_eq!(points.len(), 1 + 8 + 16);
        assert_eq!(points[0], (0, 0));

        let unique: HashSet<_> = points.iter().collect();
        assert_eq!(unique.len(), points.len());
        assert!(points.iter().all(|&(x, z)| grid.on_grid(x, z)));
        assert!(points[1..9].iter().all(|&(x, z)| x.abs().max(z.abs()) == 200));
    }
}
