//! Safe teleport targets.
//!
//! A location is safe when a player can stand there: solid, non-hazardous
//! ground below, and room for their body in the two blocks above it. Block
//! contents come from the host through [`BlockView`].

use crate::types::Location;

/// What occupies a block, reduced to the distinctions safety cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Air,
    Water,
    Lava,
    /// Nether or end portal
    Portal,
    Cactus,
    Fence,
    Sign,
    Boat,
    TrapDoor { open: bool },
    /// Torches, buttons, ladders and similar wall-mounted blocks
    Attachable,
    /// Any other full block
    Solid,
    /// Any other block a player can walk through
    Passable,
}

impl BlockKind {
    pub fn is_liquid(self) -> bool {
        matches!(self, BlockKind::Water | BlockKind::Lava)
    }

    pub fn is_solid(self) -> bool {
        matches!(
            self,
            BlockKind::Solid
                | BlockKind::Cactus
                | BlockKind::Fence
                | BlockKind::Sign
                | BlockKind::TrapDoor { .. }
        )
    }
}

/// Read access to world blocks.
pub trait BlockView {
    fn block_at(&self, world: &str, x: i32, y: i32, z: i32) -> BlockKind;

    /// Exclusive upper build limit of the world.
    fn max_height(&self, _world: &str) -> i32 {
        256
    }
}

/// True when a player can safely stand at `location`.
///
/// # Arguments
///
/// * `view` - Block source
/// * `location` - Feet position
/// * `acid_damage` - Configured acid damage; when positive every liquid is unsafe
pub fn is_safe_location(view: &dyn BlockView, location: &Location, acid_damage: f64) -> bool {
    let (x, y, z) = (location.block_x(), location.block_y(), location.block_z());
    let world = location.world.as_str();
    let ground = view.block_at(world, x, y - 1, z);
    let feet = view.block_at(world, x, y, z);
    let head = view.block_at(world, x, y + 1, z);

    if [ground, feet, head].contains(&BlockKind::Portal) {
        return false;
    }
    if ground == BlockKind::Air {
        return false;
    }
    if ground.is_liquid() || feet.is_liquid() || head.is_liquid() {
        if acid_damage > 0.0 {
            return false;
        }
        if [ground, feet, head].contains(&BlockKind::Lava) {
            return false;
        }
    }
    match ground {
        BlockKind::TrapDoor { open: true }
        | BlockKind::Attachable
        | BlockKind::Cactus
        | BlockKind::Boat
        | BlockKind::Fence
        | BlockKind::Sign => return false,
        _ => {}
    }

    let clear = |kind: BlockKind| !kind.is_solid() || kind == BlockKind::Sign;
    clear(feet) && clear(head)
}

/// Searches outward from `origin` for a safe location.
///
/// Each pass checks the surface of a box that grows by one block per axis
/// until it reaches `radius` horizontally, `depth` below and `height` above.
/// Found positions are centered on their block.
pub fn big_scan(
    view: &dyn BlockView,
    origin: &Location,
    radius: i32,
    depth: i32,
    height: i32,
    acid_damage: f64,
) -> Option<Location> {
    let (ox, oy, oz) = (origin.block_x(), origin.block_y(), origin.block_z());
    let (mut r, mut down, mut up) = (0, 0, 0);
    loop {
        let (min_x, max_x) = (ox - r, ox + r);
        let (min_z, max_z) = (oz - r, oz + r);
        let (min_y, max_y) = (oy - down, oy + up);

        for x in min_x..=max_x {
            for z in min_z..=max_z {
                for y in min_y..=max_y {
                    let inside = x > min_x && x < max_x && z > min_z && z < max_z && y > min_y && y < max_y;
                    if inside {
                        continue;
                    }
                    let candidate = Location::new(&origin.world, x as f64 + 0.5, y as f64, z as f64 + 0.5);
                    if is_safe_location(view, &candidate, acid_damage) {
                        return Some(candidate);
                    }
                }
            }
        }

        if r >= radius && down >= depth && up >= height {
            return None;
        }
        if r < radius {
            r += 1;
        }
        if down < depth {
            down += 1;
        }
        if up < height {
            up += 1;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::MapView;
    use super::*;

    fn spot(x: i32, y: i32, z: i32) -> Location {
        Location::block("skyblock", x, y, z)
    }

    #[test]
    fn test_solid_floor_is_safe() {
        let mut view = MapView::default();
        view.floor(0, 99, 0);
        assert!(is_safe_location(&view, &spot(0, 100, 0), 0.0));
    }

    #[test]
    fn test_air_below_is_unsafe() {
        let view = MapView::default();
        assert!(!is_safe_location(&view, &spot(0, 100, 0), 0.0));
    }

    #[test]
    fn test_portals_are_unsafe() {
        let mut view = MapView::default();
        view.floor(0, 99, 0);
        view.set(0, 101, 0, BlockKind::Portal);
        assert!(!is_safe_location(&view, &spot(0, 100, 0), 0.0));
    }

    #[test]
    fn test_liquids_depend_on_acid() {
        let mut view = MapView::default();
        view.floor(0, 99, 0);
        view.set(0, 100, 0, BlockKind::Water);
        assert!(is_safe_location(&view, &spot(0, 100, 0), 0.0));
        assert!(!is_safe_location(&view, &spot(0, 100, 0), 5.0));

        view.set(0, 100, 0, BlockKind::Lava);
        assert!(!is_safe_location(&view, &spot(0, 100, 0), 0.0));
    }

    #[test]
    fn test_bad_ground() {
        for kind in [
            BlockKind::Cactus,
            BlockKind::Fence,
            BlockKind::Sign,
            BlockKind::Boat,
            BlockKind::Attachable,
            BlockKind::TrapDoor { open: true },
        ] {
            let mut view = MapView::default();
            view.set(0, 99, 0, kind);
            assert!(!is_safe_location(&view, &spot(0, 100, 0), 0.0), "{kind:?}");
        }

        let mut view = MapView::default();
        view.set(0, 99, 0, BlockKind::TrapDoor { open: false });
        assert!(is_safe_location(&view, &spot(0, 100, 0), 0.0));
    }

    #[test]
    fn test_blocked_head_room() {
        let mut view = MapView::default();
        view.floor(0, 99, 0);
        view.set(0, 101, 0, BlockKind::Solid);
        assert!(!is_safe_location(&view, &spot(0, 100, 0), 0.0));

        view.set(0, 101, 0, BlockKind::Sign);
        assert!(is_safe_location(&view, &spot(0, 100, 0), 0.0));
    }

    #[test]
    fn test_big_scan_finds_nearby_floor() {
        let mut view = MapView::default();
        view.floor(3, 99, -2);
        let found = big_scan(&view, &spot(0, 100, 0), 5, 2, 2, 0.0).unwrap();
        assert_eq!((found.block_x(), found.block_y(), found.block_z()), (3, 100, -2));
        assert_eq!(found.x, 3.5);
        assert_eq!(found.z, -1.5);
    }

    #[test]
    fn test_big_scan_gives_up() {
        let view = MapView::default();
        assert!(big_scan(&view, &spot(0, 100, 0), 3, 3, 3, 0.0).is_none());
    }
}
