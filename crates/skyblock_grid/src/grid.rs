//! # Island Grid
//!
//! The registry of every island in the island world, and the only place
//! island records are created, owned and destroyed.
//!
//! ## Indices
//!
//! - **Arena** `IslandId -> Island`: owns the records. Handles are never
//!   reused.
//! - **Spatial index** `min_x -> (min_z -> IslandId)`: two nested ordered
//!   maps keyed by the outer-bound minimum corner.
//! - **Ownership index** `PlayerId -> IslandId`: one entry per owned island.
//!
//! ## Point lookup
//!
//! A floor lookup on `min_x` then `min_z` narrows the candidates; each
//! candidate is confirmed with [`Island::contains_point`]. Islands may have
//! different distances, so the walk continues down both key ranges until the
//! key is more than the largest registered distance away from the query.
//! Outer bounds never overlap, so the first confirmed candidate is the only
//! one.
//!
//! ## Integrity
//!
//! Insertion refuses any island whose outer bound overlaps an existing one.
//! The refusal is logged and returned as [`GridError::Conflict`]; the first
//! registered island keeps the space.

use crate::config::GridSettings;
use crate::coords::GridLayout;
use crate::error::{GridError, GridResult};
use crate::island::{Island, IslandRole};
use crate::ownership::TeamLookup;
use crate::types::{IslandId, Location, PlayerId};
use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;
use tracing::{debug, info, warn};

/// Registry of islands.
#[derive(Debug, Clone)]
pub struct IslandGrid {
    world: String,
    nether_world: Option<String>,
    layout: GridLayout,
    protection_range: i32,
    islands: HashMap<IslandId, Island>,
    spatial: BTreeMap<i32, BTreeMap<i32, IslandId>>,
    owners: HashMap<PlayerId, IslandId>,
    spawn: Option<IslandId>,
    next_id: u64,
    max_distance: i32,
}

impl IslandGrid {
    /// Creates an empty grid for the configured island world.
    pub fn new(settings: &GridSettings) -> Self {
        Self {
            world: settings.world.clone(),
            nether_world: settings.nether_world.clone(),
            layout: settings.layout(),
            protection_range: settings.protection_range,
            islands: HashMap::new(),
            spatial: BTreeMap::new(),
            owners: HashMap::new(),
            spawn: None,
            next_id: 1,
            max_distance: 0,
        }
    }

    pub fn world(&self) -> &str {
        &self.world
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// True when the location is in the island world or its nether.
    pub fn in_world(&self, location: &Location) -> bool {
        location.world == self.world || self.nether_world.as_deref() == Some(location.world.as_str())
    }

    // ========================================================================
    // Record access
    // ========================================================================

    pub fn island(&self, id: IslandId) -> Option<&Island> {
        self.islands.get(&id)
    }

    /// Mutable access to flags, lock, biome and other metadata.
    ///
    /// Ownership and position can only change through grid operations.
    pub fn island_mut(&mut self, id: IslandId) -> Option<&mut Island> {
        self.islands.get_mut(&id)
    }

    /// Every island in spatial order.
    pub fn islands(&self) -> impl Iterator<Item = (IslandId, &Island)> + '_ {
        self.spatial
            .values()
            .flat_map(|column| column.values())
            .filter_map(move |id| self.islands.get(id).map(|island| (*id, island)))
    }

    /// Number of records, owned or not.
    pub fn len(&self) -> usize {
        self.islands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.islands.is_empty()
    }

    /// Number of owned islands.
    pub fn island_count(&self) -> usize {
        self.owners.len()
    }

    /// Owners and their islands.
    pub fn owned_islands(&self) -> impl Iterator<Item = (PlayerId, IslandId)> + '_ {
        self.owners.iter().map(|(owner, id)| (*owner, *id))
    }

    /// Purge candidates: no owner, not spawn, not purge-protected.
    pub fn unowned_islands(&self) -> Vec<(IslandId, &Island)> {
        self.islands()
            .filter(|(_, island)| {
                island.owner().is_none() && !island.is_spawn() && !island.is_purge_protected()
            })
            .collect()
    }

    // ========================================================================
    // Spatial queries
    // ========================================================================

    /// Island whose outer bound contains the block column.
    pub fn find_island_at(&self, x: i32, z: i32) -> Option<IslandId> {
        if self.max_distance <= 0 {
            return None;
        }
        let x_keys = key_window(x, self.max_distance)?;
        for (_, column) in self.spatial.range(x_keys).rev() {
            let Some(z_keys) = key_window(z, self.max_distance) else {
                continue;
            };
            for (_, id) in column.range(z_keys).rev() {
                if let Some(island) = self.islands.get(id) {
                    if island.contains_point(x, z) {
                        return Some(*id);
                    }
                }
            }
        }
        None
    }

    /// Island whose outer bound contains the location.
    ///
    /// Locations outside the island world and its nether resolve to nothing.
    pub fn island_id_at(&self, location: &Location) -> Option<IslandId> {
        if !self.in_world(location) {
            return None;
        }
        self.find_island_at(location.block_x(), location.block_z())
    }

    pub fn island_at(&self, location: &Location) -> Option<&Island> {
        self.island_id_at(location).and_then(|id| self.islands.get(&id))
    }

    /// Island whose protection bound contains the location.
    pub fn protected_island_at(&self, location: &Location) -> Option<&Island> {
        self.island_at(location)
            .filter(|island| island.is_protected_at(location.block_x(), location.block_z()))
    }

    /// True when the grid slot nearest the location is taken.
    pub fn island_at_slot(&self, location: &Location) -> bool {
        let slot = self.layout.closest_slot(location);
        self.island_id_at(&slot).is_some()
    }

    /// Nearest grid-aligned island center to an arbitrary location.
    pub fn closest_slot(&self, location: &Location) -> Location {
        self.layout.closest_slot(location)
    }

    pub fn on_grid(&self, location: &Location) -> bool {
        self.layout.on_grid_location(location)
    }

    /// First free grid slot, searching outward from `start`.
    pub fn next_free_slot(&self, start: &Location, max_rings: u32) -> Option<Location> {
        for (x, z) in self.layout.spiral(start.block_x(), start.block_z(), max_rings) {
            let candidate = Island::new(
                &self.world,
                x,
                self.layout.island_height,
                z,
                self.layout.island_distance,
                self.protection_range,
            );
            if self.find_conflict(&candidate).is_none() {
                return Some(Location::block(&self.world, x, self.layout.island_height, z));
            }
        }
        None
    }

    /// First registered island whose outer bound overlaps `candidate`.
    pub fn find_conflict(&self, candidate: &Island) -> Option<IslandId> {
        let reach = self.max_distance.max(candidate.island_distance());
        let x_keys = span_window(candidate.min_x(), candidate.max_x(), reach)?;
        let z_keys = span_window(candidate.min_z(), candidate.max_z(), reach)?;
        for (_, column) in self.spatial.range(x_keys) {
            for (_, id) in column.range(z_keys.clone()) {
                if let Some(existing) = self.islands.get(id) {
                    if existing.overlaps(candidate) {
                        return Some(*id);
                    }
                }
            }
        }
        None
    }

    // ========================================================================
    // Ownership queries
    // ========================================================================

    /// Island directly owned by the player.
    pub fn island_owned_by(&self, owner: PlayerId) -> Option<IslandId> {
        self.owners.get(&owner).copied()
    }

    /// Island the player owns, or else their team leader's island.
    pub fn find_island_owned_by<T>(&self, player: PlayerId, teams: &T) -> Option<IslandId>
    where
        T: TeamLookup + ?Sized,
    {
        if let Some(id) = self.island_owned_by(player) {
            return Some(id);
        }
        let leader = teams.team_leader(player)?;
        if leader == player {
            return None;
        }
        self.island_owned_by(leader)
    }

    pub fn has_island(&self, owner: PlayerId) -> bool {
        self.owners.contains_key(&owner)
    }

    /// Display name of the player's island.
    pub fn island_name(&self, owner: PlayerId) -> Option<&str> {
        self.island_owned_by(owner)
            .and_then(|id| self.islands.get(&id))
            .and_then(|island| island.name())
    }

    /// Names the player's island. Returns `false` if they own none.
    pub fn set_island_name(&mut self, owner: PlayerId, name: Option<String>) -> bool {
        let Some(id) = self.island_owned_by(owner) else {
            return false;
        };
        match self.islands.get_mut(&id) {
            Some(island) => {
                island.set_name(name);
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Creates an island centered on `(x, z)` at island height.
    ///
    /// An owner who already has an island elsewhere loses it first; the old
    /// record stays in the grid as an unowned plot. Claiming the center the
    /// owner already holds returns the existing island.
    ///
    /// # Returns
    ///
    /// The new island, or [`GridError::Conflict`] when the outer bound would
    /// overlap a registered island.
    pub fn claim_island(&mut self, x: i32, z: i32, owner: Option<PlayerId>) -> GridResult<IslandId> {
        if let Some(owner) = owner {
            if let Some(existing) = self.island_owned_by(owner) {
                if let Some(island) = self.islands.get(&existing) {
                    if island.center_x() == x && island.center_z() == z {
                        debug!("Player {} already owns the island at {}:{}", owner, x, z);
                        return Ok(existing);
                    }
                }
            }
        }

        let mut island = Island::new(
            &self.world,
            x,
            self.layout.island_height,
            z,
            self.layout.island_distance,
            self.protection_range,
        );
        if let Some(owner) = owner {
            island.set_role(IslandRole::Owned(owner));
        }
        self.reject_conflict(&island)?;

        if let Some(owner) = owner {
            if let Some(previous) = self.owners.remove(&owner) {
                if let Some(old) = self.islands.get_mut(&previous) {
                    info!(
                        "🔄 Player {} moves from island at {}:{} to {}:{}",
                        owner,
                        old.center_x(),
                        old.center_z(),
                        x,
                        z
                    );
                    old.set_role(IslandRole::Unowned);
                }
            }
        }

        let id = self.store(island);
        info!("🏝️ Claimed island at {}:{} for {}", x, z, owner_label(owner));
        Ok(id)
    }

    /// Registers a fully built island, e.g. one read from storage.
    ///
    /// An island whose owner already has another island is registered
    /// unowned, and a second spawn is registered as a plain unowned plot.
    pub fn insert_island(&mut self, mut island: Island) -> GridResult<IslandId> {
        self.reject_conflict(&island)?;

        if let Some(owner) = island.owner() {
            if self.owners.contains_key(&owner) {
                warn!(
                    "⚠️ Player {} already owns an island, registering {}:{} unowned",
                    owner,
                    island.center_x(),
                    island.center_z()
                );
                island.set_role(IslandRole::Unowned);
            }
        }
        if island.is_spawn() && self.spawn.is_some() {
            warn!(
                "⚠️ Spawn is already set, registering {}:{} as an unowned island",
                island.center_x(),
                island.center_z()
            );
            island.set_role(IslandRole::Unowned);
        }

        Ok(self.store(island))
    }

    fn reject_conflict(&self, island: &Island) -> GridResult<()> {
        let Some(existing_id) = self.find_conflict(island) else {
            return Ok(());
        };
        let Some(existing) = self.islands.get(&existing_id) else {
            return Ok(());
        };
        let existing_owner = describe_role(existing.role());
        warn!(
            "⚠️ Island conflict: {}:{} (owner {}) overlaps {}:{} (owner {}), keeping the existing island",
            island.center_x(),
            island.center_z(),
            describe_role(island.role()),
            existing.center_x(),
            existing.center_z(),
            existing_owner
        );
        Err(GridError::Conflict {
            x: island.center_x(),
            z: island.center_z(),
            existing_x: existing.center_x(),
            existing_z: existing.center_z(),
            existing_owner,
        })
    }

    fn store(&mut self, island: Island) -> IslandId {
        let id = IslandId(self.next_id);
        self.next_id += 1;

        self.max_distance = self.max_distance.max(island.island_distance());
        self.spatial
            .entry(island.min_x())
            .or_default()
            .insert(island.min_z(), id);
        if let Some(owner) = island.owner() {
            self.owners.insert(owner, id);
        }
        if island.is_spawn() {
            self.spawn = Some(id);
        }
        self.islands.insert(id, island);
        id
    }

    /// Removes the island containing the location.
    ///
    /// # Returns
    ///
    /// The removed record with owner and lock cleared, if there was one.
    pub fn delete_island(&mut self, location: &Location) -> Option<Island> {
        let id = self.island_id_at(location)?;
        self.delete_island_by_id(id)
    }

    pub fn delete_island_by_id(&mut self, id: IslandId) -> Option<Island> {
        let mut island = self.islands.remove(&id)?;

        if let Some(column) = self.spatial.get_mut(&island.min_x()) {
            if column.get(&island.min_z()) == Some(&id) {
                column.remove(&island.min_z());
            }
            if column.is_empty() {
                self.spatial.remove(&island.min_x());
            }
        }
        if let Some(owner) = island.owner() {
            if self.owners.get(&owner) == Some(&id) {
                self.owners.remove(&owner);
            }
        }
        if self.spawn == Some(id) {
            self.spawn = None;
        }

        island.release();
        info!(
            "🗑️ Deleted island at {}:{}",
            island.center_x(),
            island.center_z()
        );
        Some(island)
    }

    /// Sets or clears the owner of an island.
    ///
    /// When the new owner already holds a different island, that island is
    /// released first so the player ends up owning exactly one.
    pub fn set_island_owner(&mut self, id: IslandId, new_owner: Option<PlayerId>) -> GridResult<()> {
        let (old_owner, is_spawn) = match self.islands.get(&id) {
            Some(island) => (island.owner(), island.is_spawn()),
            None => return Err(GridError::IslandNotFound(id)),
        };
        if is_spawn && new_owner.is_some() {
            return Err(GridError::SpawnNotOwnable);
        }

        if let Some(new_owner) = new_owner {
            if let Some(previous) = self.owners.get(&new_owner).copied() {
                if previous != id {
                    if let Some(old) = self.islands.get_mut(&previous) {
                        old.set_role(IslandRole::Unowned);
                        old.set_name(None);
                    }
                    self.owners.remove(&new_owner);
                }
            }
        }

        if let Some(old_owner) = old_owner {
            if self.owners.get(&old_owner) == Some(&id) {
                self.owners.remove(&old_owner);
            }
        }

        if let Some(island) = self.islands.get_mut(&id) {
            if !is_spawn {
                island.set_role(match new_owner {
                    Some(owner) => IslandRole::Owned(owner),
                    None => IslandRole::Unowned,
                });
            }
            if old_owner != new_owner {
                island.set_name(None);
            }
        }
        if let Some(new_owner) = new_owner {
            self.owners.insert(new_owner, id);
        }

        info!(
            "🔑 Island {} owner changed from {} to {}",
            id,
            owner_label(old_owner),
            owner_label(new_owner)
        );
        Ok(())
    }

    /// Moves `old_owner`'s island to `new_owner`.
    pub fn transfer_ownership(&mut self, old_owner: PlayerId, new_owner: PlayerId) -> GridResult<IslandId> {
        let id = self
            .island_owned_by(old_owner)
            .ok_or(GridError::NoIsland(old_owner))?;
        self.set_island_owner(id, Some(new_owner))?;
        Ok(id)
    }

    /// Changes the protection range of an island.
    pub fn resize_island(&mut self, id: IslandId, range: i32) -> GridResult<()> {
        let island = self
            .islands
            .get_mut(&id)
            .ok_or(GridError::IslandNotFound(id))?;
        if island.resize(range) {
            Ok(())
        } else {
            Err(GridError::InvalidProtectionRange {
                range,
                distance: island.island_distance(),
            })
        }
    }

    // ========================================================================
    // Spawn
    // ========================================================================

    pub fn spawn_id(&self) -> Option<IslandId> {
        self.spawn
    }

    pub fn spawn(&self) -> Option<&Island> {
        self.spawn.and_then(|id| self.islands.get(&id))
    }

    /// Turns an island into the spawn island.
    ///
    /// The previous spawn, if any, becomes an unowned plot. The island's owner
    /// loses it, and its protection widens to the full island distance.
    pub fn set_spawn(&mut self, id: IslandId) -> GridResult<()> {
        if !self.islands.contains_key(&id) {
            return Err(GridError::IslandNotFound(id));
        }
        if let Some(previous) = self.spawn {
            if previous != id {
                if let Some(old) = self.islands.get_mut(&previous) {
                    warn!(
                        "⚠️ Replacing spawn at {}:{}",
                        old.center_x(),
                        old.center_z()
                    );
                    old.set_role(IslandRole::Unowned);
                }
            }
        }

        if let Some(island) = self.islands.get_mut(&id) {
            if let Some(owner) = island.owner() {
                if self.owners.get(&owner) == Some(&id) {
                    self.owners.remove(&owner);
                }
            }
            let distance = island.island_distance();
            island.set_role(IslandRole::Spawn { spawn_point: None });
            island.resize(distance);
            info!(
                "🏁 Spawn set to island at {}:{}",
                island.center_x(),
                island.center_z()
            );
        }
        self.spawn = Some(id);
        Ok(())
    }

    pub fn spawn_point(&self) -> Option<Location> {
        self.spawn().and_then(|spawn| spawn.spawn_point().cloned())
    }

    /// Sets the spawn arrival point. Returns `false` when there is no spawn.
    pub fn set_spawn_point(&mut self, point: Location) -> bool {
        match self.spawn.and_then(|id| self.islands.get_mut(&id)) {
            Some(spawn) => spawn.set_spawn_point(point),
            None => false,
        }
    }

    /// True when the location is inside spawn protection.
    pub fn is_at_spawn(&self, location: &Location) -> bool {
        self.in_world(location)
            && self
                .spawn()
                .is_some_and(|spawn| spawn.is_protected_at(location.block_x(), location.block_z()))
    }
}

/// Keys `k` with `value - reach < k <= value`.
fn key_window(value: i32, reach: i32) -> Option<RangeInclusive<i32>> {
    let low = value.saturating_sub(reach).saturating_add(1);
    (low <= value).then_some(low..=value)
}

/// Keys of islands that could overlap `[min, max)` given the largest distance.
fn span_window(min: i32, max: i32, reach: i32) -> Option<RangeInclusive<i32>> {
    let low = min.saturating_sub(reach).saturating_add(1);
    let high = max.saturating_sub(1).max(min);
    (low <= high).then_some(low..=high)
}

fn owner_label(owner: Option<PlayerId>) -> String {
    owner
        .map(|o| o.to_string())
        .unwrap_or_else(|| "nobody".to_string())
}

fn describe_role(role: &IslandRole) -> String {
    match role {
        IslandRole::Unowned => "nobody".to_string(),
        IslandRole::Owned(owner) => owner.to_string(),
        IslandRole::Spawn { .. } => "spawn".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ownership::{MemoryDirectory, PlayerDirectory};

    fn settings() -> GridSettings {
        GridSettings {
            island_distance: 200,
            protection_range: 100,
            ..GridSettings::default()
        }
    }

    fn at(x: i32, z: i32) -> Location {
        Location::block("skyblock", x, 64, z)
    }

    #[test]
    fn test_claim_and_find() {
        let mut grid = IslandGrid::new(&settings());
        let owner = PlayerId::new();
        let id = grid.claim_island(100, 100, Some(owner)).unwrap();

        assert_eq!(grid.island_id_at(&at(100, 100)), Some(id));
        assert_eq!(grid.island_id_at(&at(0, 0)), Some(id));
        assert_eq!(grid.island_id_at(&at(250, 100)), None);
        assert_eq!(grid.island_owned_by(owner), Some(id));
        assert_eq!(grid.island_count(), 1);
    }

    #[test]
    fn test_other_world_finds_nothing() {
        let mut grid = IslandGrid::new(&settings());
        grid.claim_island(0, 0, Some(PlayerId::new())).unwrap();
        assert!(grid.island_at(&Location::block("world", 0, 64, 0)).is_none());
        assert!(grid.island_at(&Location::block("skyblock_nether", 0, 64, 0)).is_some());
    }

    #[test]
    fn test_conflict_keeps_first_island() {
        let mut grid = IslandGrid::new(&settings());
        let first = PlayerId::new();
        let second = PlayerId::new();
        let id = grid.claim_island(0, 0, Some(first)).unwrap();

        let err = grid.claim_island(150, 0, Some(second)).unwrap_err();
        assert!(matches!(err, GridError::Conflict { existing_x: 0, existing_z: 0, .. }));
        assert_eq!(grid.island_id_at(&at(60, 0)), Some(id));
        assert!(!grid.has_island(second));
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_adjacent_islands_do_not_conflict() {
        let mut grid = IslandGrid::new(&settings());
        grid.claim_island(0, 0, None).unwrap();
        grid.claim_island(200, 0, None).unwrap();
        grid.claim_island(0, -200, None).unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid.island_count(), 0);
    }

    #[test]
    fn test_reclaim_moves_owner() {
        let mut grid = IslandGrid::new(&settings());
        let owner = PlayerId::new();
        let first = grid.claim_island(0, 0, Some(owner)).unwrap();
        assert_eq!(grid.claim_island(0, 0, Some(owner)).unwrap(), first);

        let second = grid.claim_island(400, 0, Some(owner)).unwrap();
        assert_ne!(first, second);
        assert_eq!(grid.island_owned_by(owner), Some(second));
        assert_eq!(grid.island(first).unwrap().owner(), None);
        assert_eq!(grid.unowned_islands().len(), 1);
    }

    #[test]
    fn test_delete_and_reclaim() {
        let mut grid = IslandGrid::new(&settings());
        let owner = PlayerId::new();
        grid.claim_island(100, 100, Some(owner)).unwrap();
        grid.island_mut(grid.island_owned_by(owner).unwrap())
            .unwrap()
            .set_locked(true);

        let removed = grid.delete_island(&at(100, 100)).unwrap();
        assert_eq!(removed.owner(), None);
        assert!(!removed.is_locked());
        assert!(grid.island_at(&at(100, 100)).is_none());
        assert!(!grid.has_island(owner));

        let other = PlayerId::new();
        assert!(grid.claim_island(100, 100, Some(other)).is_ok());
    }

    #[test]
    fn test_protected_island_at() {
        let mut grid = IslandGrid::new(&settings());
        grid.claim_island(100, 100, Some(PlayerId::new())).unwrap();
        assert!(grid.protected_island_at(&at(100, 100)).is_some());
        assert!(grid.island_at(&at(10, 10)).is_some());
        assert!(grid.protected_island_at(&at(10, 10)).is_none());
    }

    #[test]
    fn test_set_owner_releases_new_owners_other_island() {
        let mut grid = IslandGrid::new(&settings());
        let a = PlayerId::new();
        let b = PlayerId::new();
        let island_a = grid.claim_island(0, 0, Some(a)).unwrap();
        let island_b = grid.claim_island(400, 0, Some(b)).unwrap();

        grid.transfer_ownership(a, b).unwrap();
        assert_eq!(grid.island_owned_by(b), Some(island_a));
        assert_eq!(grid.island_owned_by(a), None);
        assert_eq!(grid.island(island_b).unwrap().owner(), None);
        assert_eq!(grid.island_count(), 1);
    }

    #[test]
    fn test_transfer_without_island_fails() {
        let mut grid = IslandGrid::new(&settings());
        let a = PlayerId::new();
        assert!(matches!(
            grid.transfer_ownership(a, PlayerId::new()),
            Err(GridError::NoIsland(p)) if p == a
        ));
    }

    #[test]
    fn test_team_lookup_falls_back_to_leader() {
        let mut grid = IslandGrid::new(&settings());
        let mut directory = MemoryDirectory::new();
        let leader = PlayerId::new();
        let member = PlayerId::new();
        directory.set_team_leader(leader, Some(leader));
        directory.set_team_leader(member, Some(leader));

        let id = grid.claim_island(0, 0, Some(leader)).unwrap();
        assert_eq!(grid.find_island_owned_by(member, &directory), Some(id));
        assert_eq!(grid.island_owned_by(member), None);
        assert_eq!(grid.find_island_owned_by(PlayerId::new(), &directory), None);
    }

    #[test]
    fn test_spawn_handling() {
        let mut grid = IslandGrid::new(&settings());
        let owner = PlayerId::new();
        let id = grid.claim_island(0, 0, Some(owner)).unwrap();
        grid.set_spawn(id).unwrap();

        assert!(!grid.has_island(owner));
        let spawn = grid.spawn().unwrap();
        assert!(spawn.is_spawn());
        assert_eq!(spawn.protection_range(), 200);
        assert!(grid.is_at_spawn(&at(-100, 99)));
        assert!(!grid.is_at_spawn(&at(100, 0)));
        assert!(grid.unowned_islands().is_empty());

        let point = Location::block("skyblock", 0, 121, 0);
        assert!(grid.set_spawn_point(point.clone()));
        assert_eq!(grid.spawn_point(), Some(point));
        assert!(matches!(
            grid.set_island_owner(id, Some(owner)),
            Err(GridError::SpawnNotOwnable)
        ));

        grid.delete_island_by_id(id).unwrap();
        assert!(grid.spawn().is_none());
    }

    #[test]
    fn test_unowned_list_skips_purge_protected() {
        let mut grid = IslandGrid::new(&settings());
        let kept = grid.claim_island(0, 0, None).unwrap();
        grid.claim_island(200, 0, None).unwrap();
        grid.island_mut(kept).unwrap().set_purge_protected(true);
        let unowned = grid.unowned_islands();
        assert_eq!(unowned.len(), 1);
        assert_eq!(unowned[0].1.center_x(), 200);
    }

    #[test]
    fn test_slots() {
        let mut grid = IslandGrid::new(&settings());
        grid.claim_island(0, 0, None).unwrap();
        assert!(grid.island_at_slot(&at(60, -40)));
        assert!(!grid.island_at_slot(&at(180, 0)));

        let free = grid.next_free_slot(&at(0, 0), 3).unwrap();
        assert_ne!(free, Location::block("skyblock", 0, 120, 0));
        assert!(grid.on_grid(&free));
        assert_eq!(free.block_y(), 120);
    }

    #[test]
    fn test_island_names_follow_owner() {
        let mut grid = IslandGrid::new(&settings());
        let owner = PlayerId::new();
        let other = PlayerId::new();
        grid.claim_island(0, 0, Some(owner)).unwrap();
        assert!(grid.set_island_name(owner, Some("Paradise".to_string())));
        assert_eq!(grid.island_name(owner), Some("Paradise"));
        assert!(!grid.set_island_name(other, Some("Nope".to_string())));

        grid.transfer_ownership(owner, other).unwrap();
        assert_eq!(grid.island_name(other), None);
    }

    #[test]
    fn test_resize_island_bounds() {
        let mut grid = IslandGrid::new(&settings());
        let id = grid.claim_island(0, 0, None).unwrap();
        assert!(grid.resize_island(id, 150).is_ok());
        assert!(matches!(
            grid.resize_island(id, 400),
            Err(GridError::InvalidProtectionRange { range: 400, distance: 200 })
        ));
    }
}
