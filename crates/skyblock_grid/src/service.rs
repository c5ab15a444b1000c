//! # Skyblock Service
//!
//! [`Skyblock`] owns the grid, the coop registry, the event listeners, the
//! player directory and the cleanup queue, and is the single writer for all
//! of them. Hosts construct one and hand it to whatever drives the game tick.
//!
//! Gameplay code asks it two kinds of questions many times per second:
//! "which island is here" ([`Skyblock::island_at`]) and "may this player do
//! this here" ([`Skyblock::is_allowed`]). Administrative operations (claim,
//! delete, transfer, teams, coop) mutate state synchronously and are
//! persisted later from a [`PersistSnapshot`].

use crate::cleanup::{ChunkRegenerator, CleanupQueue};
use crate::config::{CoopSettings, GridSettings};
use crate::coop::{CleanupReport, CoopDocument, CoopRegistry, IslandCenter};
use crate::error::{CoopError, GridError, Result, SkyblockError};
use crate::events::{IslandEvent, IslandEvents, IslandListener, LeaveReason, Verdict};
use crate::flags::SettingsFlag;
use crate::grid::IslandGrid;
use crate::island::Island;
use crate::ownership::PlayerDirectory;
use crate::persistence::{GridDocument, GridStorage, LoadReport};
use crate::safety::{big_scan, is_safe_location, BlockView};
use crate::types::{IslandId, Location, PlayerId};
use std::sync::Arc;
use tracing::{error, info, warn};

/// How far [`Skyblock::claim_next_free`] searches, in grid rings.
const FREE_SLOT_RINGS: u32 = 1000;

/// Everything that needs saving, captured on the owning thread.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistSnapshot {
    pub grid: GridDocument,
    pub coops: CoopDocument,
}

impl PersistSnapshot {
    /// Writes both documents.
    pub async fn write(&self, storage: &dyn GridStorage) -> Result<()> {
        storage.save_grid(&self.grid).await?;
        storage.save_coops(&self.coops).await?;
        Ok(())
    }
}

/// The island world.
pub struct Skyblock {
    settings: GridSettings,
    coop_settings: CoopSettings,
    grid: IslandGrid,
    coops: CoopRegistry,
    events: IslandEvents,
    directory: Box<dyn PlayerDirectory>,
    cleanup: CleanupQueue,
}

impl std::fmt::Debug for Skyblock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Skyblock")
            .field("world", &self.settings.world)
            .field("islands", &self.grid.len())
            .field("coops", &self.coops.len())
            .field("pending_cleanup", &self.cleanup.pending())
            .finish()
    }
}

impl Skyblock {
    /// Creates an empty island world.
    pub fn new(
        settings: GridSettings,
        coop_settings: CoopSettings,
        directory: Box<dyn PlayerDirectory>,
    ) -> Result<Self> {
        settings.validate().map_err(SkyblockError::Settings)?;
        Ok(Self {
            grid: IslandGrid::new(&settings),
            cleanup: CleanupQueue::new(settings.clean_rate),
            coops: CoopRegistry::new(),
            events: IslandEvents::new(),
            settings,
            coop_settings,
            directory,
        })
    }

    /// Restores the island world from storage.
    ///
    /// A document saved for another world is moved aside and an empty grid
    /// is started. Coop grants on islands that no longer exist are dropped.
    pub async fn load(
        settings: GridSettings,
        coop_settings: CoopSettings,
        directory: Box<dyn PlayerDirectory>,
        storage: &dyn GridStorage,
    ) -> Result<(Self, LoadReport)> {
        let mut skyblock = Self::new(settings, coop_settings, directory)?;
        let mut report = LoadReport::default();

        match storage.load_grid().await? {
            Some(document) if document.world == skyblock.settings.world => {
                let (grid, loaded) = document.restore(&skyblock.settings);
                skyblock.grid = grid;
                report = loaded;
            }
            Some(document) => {
                error!(
                    "❌ Island document is for world '{}' but the island world is '{}'",
                    document.world, skyblock.settings.world
                );
                error!("❌ Moving it aside; fix the world name and restore the backup");
                storage.backup_grid().await?;
            }
            None => info!("🆕 No saved islands, starting with an empty grid"),
        }

        let coop_document = storage.load_coops().await?;
        let grid = &skyblock.grid;
        let dropped = skyblock.coops.load_document(&coop_document, |center| {
            grid.island_at(&center.to_location())
                .is_some_and(|island| island.center_x() == center.x && island.center_z() == center.z)
        });
        if dropped > 0 {
            warn!("⚠️ Dropped {} coop grants that no longer apply", dropped);
        }

        Ok((skyblock, report))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn settings(&self) -> &GridSettings {
        &self.settings
    }

    pub fn coop_settings(&self) -> &CoopSettings {
        &self.coop_settings
    }

    pub fn grid(&self) -> &IslandGrid {
        &self.grid
    }

    pub fn coops(&self) -> &CoopRegistry {
        &self.coops
    }

    pub fn directory(&self) -> &dyn PlayerDirectory {
        self.directory.as_ref()
    }

    pub fn directory_mut(&mut self) -> &mut dyn PlayerDirectory {
        self.directory.as_mut()
    }

    pub fn events(&self) -> &IslandEvents {
        &self.events
    }

    pub fn register_listener(&mut self, listener: Arc<dyn IslandListener>) {
        self.events.register(listener);
    }

    /// Metadata access for an island (flags, lock, biome, range).
    pub fn island_mut(&mut self, id: IslandId) -> Option<&mut Island> {
        self.grid.island_mut(id)
    }

    pub fn cleanup_pending(&self) -> usize {
        self.cleanup.pending()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn island_at(&self, location: &Location) -> Option<&Island> {
        self.grid.island_at(location)
    }

    pub fn protected_island_at(&self, location: &Location) -> Option<&Island> {
        self.grid.protected_island_at(location)
    }

    /// The island the player owns or, for team members, their leader's.
    pub fn island_of(&self, player: PlayerId) -> Option<IslandId> {
        self.grid.find_island_owned_by(player, &*self.directory)
    }

    /// Owner, team and coop players of an island.
    pub fn members(&self, id: IslandId) -> Vec<PlayerId> {
        let Some(island) = self.grid.island(id) else {
            return Vec::new();
        };
        let mut members = self
            .coops
            .coop_players(&IslandCenter::from_location(&island.center()));
        if let Some(owner) = island.owner() {
            members.push(owner);
            for member in self.directory.team_members(owner) {
                if !members.contains(&member) {
                    members.push(member);
                }
            }
        }
        members
    }

    /// True when the player is the owner, a team member or a coop player.
    pub fn is_member(&self, player: PlayerId, id: IslandId) -> bool {
        let Some(island) = self.grid.island(id) else {
            return false;
        };
        if let Some(owner) = island.owner() {
            if owner == player || self.directory.team_leader(player) == Some(owner) {
                return true;
            }
        }
        self.coops
            .is_coop(player, &IslandCenter::from_location(&island.center()))
    }

    /// True when the location is inside the protection of an island the
    /// player belongs to.
    pub fn location_is_on_island(&self, player: PlayerId, location: &Location) -> bool {
        let Some(id) = self.grid.island_id_at(location) else {
            return false;
        };
        self.grid
            .island(id)
            .is_some_and(|island| island.is_protected_at(location.block_x(), location.block_z()))
            && self.is_member(player, id)
    }

    /// True when the location is inside the protection of the player's own
    /// or team island, or of a coop island when `include_coop` is set.
    pub fn location_is_at_home(&self, player: PlayerId, location: &Location, include_coop: bool) -> bool {
        if !self.grid.in_world(location) {
            return false;
        }
        let protected = |island: &Island| island.is_protected_at(location.block_x(), location.block_z());

        if let Some(island) = self.island_of(player).and_then(|id| self.grid.island(id)) {
            if protected(island) {
                return true;
            }
        }
        include_coop
            && self.coops.coop_islands(player).iter().any(|center| {
                self.grid
                    .island_at(&center.to_location())
                    .is_some_and(|island| protected(island))
            })
    }

    /// True when `visitor` stands inside the protection of `owner`'s island
    /// without belonging to its team.
    pub fn is_trespassing(&self, owner: PlayerId, visitor: PlayerId, location: &Location) -> bool {
        let team_owner = self.directory.effective_owner(owner);
        if self.directory.effective_owner(visitor) == team_owner {
            return false;
        }
        self.island_of(owner)
            .and_then(|id| self.grid.island(id))
            .is_some_and(|island| {
                self.grid.in_world(location)
                    && island.is_protected_at(location.block_x(), location.block_z())
            })
    }

    /// Whether the player may perform the flagged action at the location.
    ///
    /// Outside any protection everything is allowed; island members may do
    /// anything on their island; visitors get the island's flag value.
    pub fn is_allowed(&self, player: PlayerId, location: &Location, flag: SettingsFlag) -> bool {
        let Some(id) = self.grid.island_id_at(location) else {
            return true;
        };
        let Some(island) = self.grid.island(id) else {
            return true;
        };
        if !island.is_protected_at(location.block_x(), location.block_z()) {
            return true;
        }
        if self.is_member(player, id) {
            return true;
        }
        island.flag(flag, &self.settings.default_flags)
    }

    /// Effective flag value at a location, or the island default in the open.
    pub fn flag_at(&self, location: &Location, flag: SettingsFlag) -> bool {
        match self.grid.protected_island_at(location) {
            Some(island) => island.flag(flag, &self.settings.default_flags),
            None => self.settings.default_flags.island_default(flag),
        }
    }

    pub fn coop_islands(&self, player: PlayerId) -> Vec<IslandCenter> {
        self.coops.coop_islands(player)
    }

    /// Coop players of the island at a location.
    pub fn coop_players_at(&self, location: &Location) -> Vec<PlayerId> {
        self.grid
            .island_at(location)
            .map(|island| {
                self.coops
                    .coop_players(&IslandCenter::from_location(&island.center()))
            })
            .unwrap_or_default()
    }

    // ========================================================================
    // Islands
    // ========================================================================

    /// Claims the slot nearest to `location` for `owner`.
    pub fn claim_island(&mut self, owner: PlayerId, location: &Location) -> Result<IslandId> {
        if self.directory.in_team(owner) && !self.directory.is_leader(owner) {
            return Err(GridError::TeamMemberCannotOwn(owner).into());
        }
        let slot = self.grid.closest_slot(location);
        let id = self
            .grid
            .claim_island(slot.block_x(), slot.block_z(), Some(owner))?;
        self.link_owner(owner, id);
        Ok(id)
    }

    /// Claims the first free slot, searching outward from the grid origin.
    pub fn claim_next_free(&mut self, owner: PlayerId) -> Result<IslandId> {
        let layout = *self.grid.layout();
        let origin = Location::block(
            &self.settings.world,
            layout.x_offset,
            layout.island_height,
            layout.z_offset,
        );
        let slot = self
            .grid
            .next_free_slot(&origin, FREE_SLOT_RINGS)
            .ok_or_else(|| SkyblockError::Settings("no free island slot left".to_string()))?;
        self.claim_island(owner, &slot)
    }

    fn link_owner(&mut self, owner: PlayerId, id: IslandId) {
        if let Some(center) = self.grid.island(id).map(Island::center) {
            self.directory.set_island_location(owner, Some(center.clone()));
            for member in self.directory.team_members(owner) {
                if member != owner {
                    self.directory.set_team_island_location(member, Some(center.clone()));
                }
            }
        }
    }

    /// Deletes the island at a location.
    ///
    /// Coop grants on it are revoked, its owner and team lose their island
    /// references, and world cleanup is queued.
    pub fn delete_island(&mut self, location: &Location) -> Option<Island> {
        let id = self.grid.island_id_at(location)?;
        self.delete_island_by_id(id)
    }

    pub fn delete_island_by_id(&mut self, id: IslandId) -> Option<Island> {
        let owner = self.grid.island(id).and_then(Island::owner);
        let removed = self.grid.delete_island_by_id(id)?;

        let center = IslandCenter::from_location(&removed.center());
        let report = self
            .coops
            .clear_island(&center, &mut self.events, self.coop_settings.cleanup_policy());
        log_dangling(&report, "island deletion");

        if let Some(owner) = owner {
            self.directory.set_island_location(owner, None);
            for member in self.directory.team_members(owner) {
                if member != owner {
                    self.directory.set_team_island_location(member, None);
                }
            }
        }
        if !removed.is_spawn() {
            self.cleanup.enqueue_island(&removed);
        }
        Some(removed)
    }

    /// Moves `old_owner`'s island to `new_owner`.
    ///
    /// Listeners may cancel the change. If `new_owner` had an island it is
    /// released. The old owner and the rest of their team become members of
    /// `new_owner`'s team, so they still resolve to the island. A receiver who
    /// is a plain member of some other team is rejected.
    pub fn transfer_island(&mut self, old_owner: PlayerId, new_owner: PlayerId) -> Result<IslandId> {
        let id = self
            .grid
            .island_owned_by(old_owner)
            .ok_or(GridError::NoIsland(old_owner))?;
        let center = self
            .grid
            .island(id)
            .map(Island::center)
            .ok_or(GridError::IslandNotFound(id))?;
        if old_owner == new_owner {
            return Ok(id);
        }

        if let Some(leader) = self.directory.team_leader(new_owner) {
            if leader != new_owner && leader != old_owner {
                return Err(GridError::TeamMemberCannotOwn(new_owner).into());
            }
        }

        let event = IslandEvent::OwnerChange {
            island: IslandCenter::from_location(&center),
            old_owner: Some(old_owner),
            new_owner,
        };
        if let Verdict::Veto { listener, .. } = self.events.propose(&event) {
            return Err(SkyblockError::Vetoed(listener));
        }

        self.grid.transfer_ownership(old_owner, new_owner)?;

        let mut followers = self.directory.team_members(old_owner);
        if !followers.contains(&old_owner) {
            followers.push(old_owner);
        }
        followers.retain(|player| *player != new_owner);

        self.directory.set_team_leader(new_owner, Some(new_owner));
        self.directory.set_island_location(new_owner, Some(center.clone()));
        self.directory.set_team_island_location(new_owner, None);
        self.directory.set_island_location(old_owner, None);
        for member in followers {
            self.directory.set_team_leader(member, Some(new_owner));
            self.directory.set_team_island_location(member, Some(center.clone()));
        }
        info!("🔄 Island at {} moved from {} to {}", center, old_owner, new_owner);

        self.events.commit(&event);
        Ok(id)
    }

    /// Releases an island to nobody. The record stays on the grid.
    pub fn release_island(&mut self, id: IslandId) -> Result<()> {
        let owner = self.grid.island(id).and_then(Island::owner);
        self.grid.set_island_owner(id, None)?;
        if let Some(owner) = owner {
            self.directory.set_island_location(owner, None);
        }
        Ok(())
    }

    /// Makes the island at a location the spawn island.
    pub fn set_spawn(&mut self, location: &Location) -> Result<IslandId> {
        let id = self
            .grid
            .island_id_at(location)
            .ok_or_else(|| SkyblockError::Settings(format!("no island at {}", location)))?;
        let owner = self.grid.island(id).and_then(Island::owner);
        self.grid.set_spawn(id)?;
        if let Some(owner) = owner {
            self.directory.set_island_location(owner, None);
        }
        Ok(id)
    }

    // ========================================================================
    // Teams
    // ========================================================================

    /// Adds `member` to `leader`'s team.
    ///
    /// The member's own island is released; a team member never owns one.
    pub fn join_team(&mut self, member: PlayerId, leader: PlayerId) -> Result<()> {
        let leader_island = self
            .grid
            .island_owned_by(leader)
            .ok_or(GridError::NoIsland(leader))?;
        let center = self.grid.island(leader_island).map(Island::center);

        if let Some(own) = self.grid.island_owned_by(member) {
            info!("🔄 Player {} gives up their island to join {}'s team", member, leader);
            self.grid.set_island_owner(own, None)?;
            self.directory.set_island_location(member, None);
        }

        self.directory.set_team_leader(leader, Some(leader));
        self.directory.set_team_leader(member, Some(leader));
        self.directory.set_team_island_location(member, center);
        Ok(())
    }

    /// Removes a member from their team. Coop grants they issued are revoked.
    pub fn leave_team(&mut self, member: PlayerId) -> Result<()> {
        let leader = self
            .directory
            .team_leader(member)
            .ok_or(SkyblockError::NotInTeam(member))?;
        if leader == member {
            if self.directory.team_members(leader).len() > 1 {
                return Err(SkyblockError::LeaderCannotLeave(member));
            }
            self.directory.set_team_leader(member, None);
            return Ok(());
        }

        self.directory.set_team_leader(member, None);
        self.directory.set_team_island_location(member, None);
        let report = self.coops.clear_grantor(
            member,
            &mut self.events,
            self.coop_settings.cleanup_policy(),
        );
        log_dangling(&report, "team leave");

        if self.directory.team_members(leader).len() <= 1 {
            self.directory.set_team_leader(leader, None);
        }
        Ok(())
    }

    // ========================================================================
    // Coop
    // ========================================================================

    /// Grants `grantee` coop access to the requester's island.
    pub fn add_coop(&mut self, requester: PlayerId, grantee: PlayerId) -> std::result::Result<(), CoopError> {
        if grantee == requester
            || (self.directory.in_team(requester)
                && self.directory.effective_owner(grantee) == self.directory.effective_owner(requester))
        {
            return Err(CoopError::SameTeam(grantee));
        }
        if self.coop_settings.only_leader_can_coop
            && self.directory.in_team(requester)
            && !self.directory.is_leader(requester)
        {
            return Err(CoopError::NotLeader(requester));
        }
        let center = self
            .island_of(requester)
            .and_then(|id| self.grid.island(id))
            .map(|island| IslandCenter::from_location(&island.center()))
            .ok_or(CoopError::NoIsland(requester))?;
        if self.coops.is_coop(grantee, &center) {
            return Err(CoopError::AlreadyCoop { grantee });
        }

        let event = IslandEvent::CoopJoin {
            grantee,
            island: center.clone(),
            grantor: requester,
        };
        if let Verdict::Veto { listener, .. } = self.events.propose(&event) {
            return Err(CoopError::Vetoed(listener));
        }
        self.coops.grant(grantee, center, requester);
        self.events.commit(&event);
        info!("🤝 {} is now coop on {}'s island", grantee, requester);
        Ok(())
    }

    /// Revokes `grantee`'s coop access to the requester's island.
    pub fn remove_coop(&mut self, requester: PlayerId, grantee: PlayerId) -> std::result::Result<(), CoopError> {
        let center = self
            .island_of(requester)
            .and_then(|id| self.grid.island(id))
            .map(|island| IslandCenter::from_location(&island.center()))
            .ok_or(CoopError::NoIsland(requester))?;
        if !self.coops.is_coop(grantee, &center) {
            return Err(CoopError::NotCoop { grantee });
        }

        let event = IslandEvent::CoopLeave {
            grantee,
            island: center.clone(),
            grantor: requester,
            reason: LeaveReason::Removed,
        };
        if let Verdict::Veto { listener, .. } = self.events.propose(&event) {
            return Err(CoopError::Vetoed(listener));
        }
        self.coops.revoke(grantee, &center);
        self.events.commit(&event);
        info!("👋 {} is no longer coop on {}'s island", grantee, requester);
        Ok(())
    }

    /// Drops the grants a player holds and issued, if configured to.
    pub fn on_player_logout(&mut self, player: PlayerId) -> CleanupReport {
        if !self.coop_settings.clear_on_logout {
            return CleanupReport::default();
        }
        let policy = self.coop_settings.cleanup_policy();
        let held = self.coops.clear_grantee(player, &mut self.events, policy);
        let issued = self.coops.clear_grantor(player, &mut self.events, policy);
        let report = CleanupReport {
            revoked: held.revoked + issued.revoked,
            retained: held.retained + issued.retained,
        };
        log_dangling(&report, "logout");
        report
    }

    // ========================================================================
    // Safe locations
    // ========================================================================

    /// Finds somewhere safe to send a player home.
    ///
    /// Tries the numbered home (falling back to home 1) and the block above
    /// it, then the team island or the leader's home, then the island center,
    /// two spots above the center, and finally every height above it. The
    /// first safe spot found becomes the player's home.
    pub fn safe_home_location(&mut self, player: PlayerId, number: u32, view: &dyn BlockView) -> Option<Location> {
        let acid = self.settings.acid_damage;
        let safe = |location: &Location| is_safe_location(view, location, acid);
        let centered = |location: &Location| location.offset(0.5, 0.0, 0.5);

        let mut number = number;
        let mut home = self.directory.home_location(player, number);
        if home.is_none() {
            number = 1;
            home = self.directory.home_location(player, number);
        }
        if let Some(home) = &home {
            if safe(home) {
                return Some(centered(home));
            }
            let above = home.offset(0.0, 1.0, 0.0);
            if safe(&above) {
                self.directory.set_home_location(player, number, Some(above.clone()));
                return Some(centered(&above));
            }
        }

        let base = if self.directory.in_team(player) {
            let team_island = self.directory.team_island_location(player);
            if let Some(location) = team_island.clone().filter(|l| safe(l)) {
                self.directory.set_home_location(player, number, Some(location.clone()));
                return Some(centered(&location));
            }
            if let Some(leader) = self.directory.team_leader(player) {
                if let Some(leader_home) = self.directory.home_location(leader, 1).filter(|l| safe(l)) {
                    self.directory.set_home_location(player, number, Some(leader_home.clone()));
                    return Some(centered(&leader_home));
                }
            }
            team_island
        } else {
            let own = self.directory.island_location(player);
            if let Some(location) = own.clone().filter(|l| safe(l)) {
                self.directory.set_home_location(player, number, Some(location.clone()));
                return Some(centered(&location));
            }
            own
        };

        let Some(base) = base else {
            warn!("⚠️ Player {} has no island to go home to", player);
            return None;
        };

        for candidate in [
            base.offset(0.5, 5.0, 2.5).with_facing(0.0, 30.0),
            base.offset(0.5, 5.0, 0.5).with_facing(0.0, 30.0),
        ] {
            if safe(&candidate) {
                self.directory.set_home_location(player, number, Some(candidate.clone()));
                return Some(candidate);
            }
        }

        let top = view.max_height(&base.world) - 1;
        for y in base.block_y()..top {
            let candidate = Location::new(&base.world, base.x + 0.5, y as f64, base.z + 0.5);
            if safe(&candidate) {
                self.directory.set_home_location(player, number, Some(candidate.clone()));
                return Some(candidate);
            }
        }
        None
    }

    /// Scans the whole island around `location` for a safe spot.
    pub fn scan_island(&self, location: &Location, view: &dyn BlockView) -> Option<Location> {
        let island = self.grid.island_at(location)?;
        let radius = island.protection_range();
        let depth = location.block_y();
        let height = view.max_height(&location.world) - location.block_y();
        big_scan(view, location, radius, depth, height, self.settings.acid_damage)
    }

    // ========================================================================
    // Ticking and persistence
    // ========================================================================

    /// Runs one tick of queued world cleanup.
    pub fn tick(&mut self, regenerator: &mut dyn ChunkRegenerator) -> usize {
        self.cleanup.tick(regenerator)
    }

    /// Captures the state to persist.
    pub fn snapshot(&self) -> PersistSnapshot {
        PersistSnapshot {
            grid: GridDocument::from_grid(&self.grid, &self.settings.default_flags),
            coops: self.coops.to_document(),
        }
    }

    /// Captures and writes the state.
    pub async fn save(&self, storage: &dyn GridStorage) -> Result<()> {
        self.snapshot().write(storage).await
    }
}

fn log_dangling(report: &CleanupReport, cause: &str) {
    if report.retained > 0 {
        warn!(
            "⚠️ {} coop grants survived {} because a listener cancelled their removal",
            report.retained, cause
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ownership::MemoryDirectory;
    use crate::safety::test_support::MapView;

    fn skyblock() -> Skyblock {
        let settings = GridSettings {
            island_distance: 200,
            protection_range: 100,
            ..GridSettings::default()
        };
        Skyblock::new(settings, CoopSettings::default(), Box::new(MemoryDirectory::new())).unwrap()
    }

    fn at(x: i32, z: i32) -> Location {
        Location::block("skyblock", x, 120, z)
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let settings = GridSettings {
            island_distance: -5,
            ..GridSettings::default()
        };
        assert!(matches!(
            Skyblock::new(settings, CoopSettings::default(), Box::new(MemoryDirectory::new())),
            Err(SkyblockError::Settings(_))
        ));
    }

    #[test]
    fn test_claim_snaps_to_grid_and_links_directory() {
        let mut sky = skyblock();
        let owner = PlayerId::new();
        let id = sky.claim_island(owner, &at(190, -10)).unwrap();
        let island = sky.grid().island(id).unwrap();
        assert_eq!((island.center_x(), island.center_z()), (200, 0));
        assert_eq!(sky.directory().island_location(owner), Some(at(200, 0)));
    }

    #[test]
    fn test_claim_next_free_fills_slots() {
        let mut sky = skyblock();
        let a = sky.claim_next_free(PlayerId::new()).unwrap();
        let b = sky.claim_next_free(PlayerId::new()).unwrap();
        assert_ne!(a, b);
        assert_eq!(sky.grid().island_count(), 2);
    }

    #[test]
    fn test_team_member_cannot_claim() {
        let mut sky = skyblock();
        let leader = PlayerId::new();
        let member = PlayerId::new();
        sky.claim_island(leader, &at(0, 0)).unwrap();
        sky.join_team(member, leader).unwrap();
        assert!(matches!(
            sky.claim_island(member, &at(400, 0)),
            Err(SkyblockError::Grid(GridError::TeamMemberCannotOwn(_)))
        ));
    }

    #[test]
    fn test_joining_a_team_releases_own_island() {
        let mut sky = skyblock();
        let leader = PlayerId::new();
        let member = PlayerId::new();
        let team_island = sky.claim_island(leader, &at(0, 0)).unwrap();
        let own = sky.claim_island(member, &at(400, 0)).unwrap();

        sky.join_team(member, leader).unwrap();
        assert!(!sky.grid().has_island(member));
        assert_eq!(sky.grid().island(own).unwrap().owner(), None);
        assert_eq!(sky.island_of(member), Some(team_island));
        assert_eq!(sky.directory().team_island_location(member), Some(at(0, 0)));
        assert!(sky.location_is_on_island(member, &at(10, 10)));
    }

    #[test]
    fn test_is_allowed_uses_flags_for_visitors() {
        let mut sky = skyblock();
        let owner = PlayerId::new();
        let visitor = PlayerId::new();
        let id = sky.claim_island(owner, &at(0, 0)).unwrap();

        assert!(sky.is_allowed(owner, &at(10, 10), SettingsFlag::BreakBlocks));
        assert!(!sky.is_allowed(visitor, &at(10, 10), SettingsFlag::BreakBlocks));
        // Outside protection but inside island space.
        assert!(sky.is_allowed(visitor, &at(90, 90), SettingsFlag::BreakBlocks));

        sky.island_mut(id).unwrap().set_flag(SettingsFlag::BreakBlocks, true);
        assert!(sky.is_allowed(visitor, &at(10, 10), SettingsFlag::BreakBlocks));
        assert!(sky.flag_at(&at(10, 10), SettingsFlag::BreakBlocks));
    }

    #[test]
    fn test_coop_grants_access() {
        let mut sky = skyblock();
        let owner = PlayerId::new();
        let friend = PlayerId::new();
        let id = sky.claim_island(owner, &at(0, 0)).unwrap();

        assert_eq!(sky.add_coop(owner, owner), Err(CoopError::SameTeam(owner)));
        sky.add_coop(owner, friend).unwrap();
        assert_eq!(
            sky.add_coop(owner, friend),
            Err(CoopError::AlreadyCoop { grantee: friend })
        );
        assert!(sky.is_member(friend, id));
        assert!(sky.is_allowed(friend, &at(10, 10), SettingsFlag::BreakBlocks));
        assert!(sky.location_is_at_home(friend, &at(10, 10), true));
        assert!(!sky.location_is_at_home(friend, &at(10, 10), false));
        assert_eq!(sky.coop_players_at(&at(5, 5)), vec![friend]);
        assert_eq!(sky.members(id).len(), 2);

        sky.remove_coop(owner, friend).unwrap();
        assert!(!sky.is_member(friend, id));
        assert_eq!(
            sky.remove_coop(owner, friend),
            Err(CoopError::NotCoop { grantee: friend })
        );
    }

    #[test]
    fn test_coop_requires_island_and_leader_rule() {
        let settings = GridSettings::default();
        let coop = CoopSettings {
            only_leader_can_coop: true,
            ..CoopSettings::default()
        };
        let mut sky = Skyblock::new(settings, coop, Box::new(MemoryDirectory::new())).unwrap();
        let leader = PlayerId::new();
        let member = PlayerId::new();
        let outsider = PlayerId::new();

        assert_eq!(
            sky.add_coop(leader, outsider),
            Err(CoopError::NoIsland(leader))
        );
        sky.claim_island(leader, &at(0, 0)).unwrap();
        sky.join_team(member, leader).unwrap();
        assert_eq!(sky.add_coop(member, outsider), Err(CoopError::NotLeader(member)));
        assert_eq!(sky.add_coop(leader, member), Err(CoopError::SameTeam(member)));
        assert!(sky.add_coop(leader, outsider).is_ok());
    }

    #[test]
    fn test_leaving_team_revokes_issued_coops() {
        let mut sky = skyblock();
        let leader = PlayerId::new();
        let member = PlayerId::new();
        let guest = PlayerId::new();
        sky.claim_island(leader, &at(0, 0)).unwrap();
        sky.join_team(member, leader).unwrap();
        sky.add_coop(member, guest).unwrap();

        assert!(matches!(
            sky.leave_team(leader),
            Err(SkyblockError::LeaderCannotLeave(_))
        ));
        sky.leave_team(member).unwrap();
        assert!(sky.coop_islands(guest).is_empty());
        assert!(!sky.directory().in_team(member));
        assert!(!sky.directory().in_team(leader));
        assert!(matches!(sky.leave_team(member), Err(SkyblockError::NotInTeam(_))));
    }

    #[test]
    fn test_logout_clears_coops() {
        let mut sky = skyblock();
        let owner = PlayerId::new();
        let guest = PlayerId::new();
        sky.claim_island(owner, &at(0, 0)).unwrap();
        sky.add_coop(owner, guest).unwrap();

        let report = sky.on_player_logout(guest);
        assert_eq!(report.revoked, 1);
        assert!(sky.coops().is_empty());
    }

    #[test]
    fn test_trespassing() {
        let mut sky = skyblock();
        let owner = PlayerId::new();
        let member = PlayerId::new();
        let stranger = PlayerId::new();
        sky.claim_island(owner, &at(0, 0)).unwrap();
        sky.join_team(member, owner).unwrap();

        assert!(sky.is_trespassing(owner, stranger, &at(10, 10)));
        assert!(!sky.is_trespassing(owner, member, &at(10, 10)));
        assert!(!sky.is_trespassing(owner, stranger, &at(400, 0)));
    }

    #[test]
    fn test_delete_queues_cleanup_and_unlinks() {
        let mut sky = skyblock();
        let owner = PlayerId::new();
        sky.claim_island(owner, &at(0, 0)).unwrap();
        let removed = sky.delete_island(&at(0, 0)).unwrap();
        assert_eq!(removed.owner(), None);
        assert_eq!(sky.directory().island_location(owner), None);
        assert!(sky.cleanup_pending() > 0);
    }

    #[test]
    fn test_set_spawn() {
        let mut sky = skyblock();
        let owner = PlayerId::new();
        sky.claim_island(owner, &at(0, 0)).unwrap();
        sky.set_spawn(&at(0, 0)).unwrap();
        assert!(sky.grid().is_at_spawn(&at(-50, 50)));
        assert!(sky.directory().island_location(owner).is_none());
        assert!(sky.set_spawn(&at(4000, 0)).is_err());
    }

    #[test]
    fn test_safe_home_prefers_home_then_island() {
        let mut sky = skyblock();
        let owner = PlayerId::new();
        sky.claim_island(owner, &at(0, 0)).unwrap();

        let mut view = MapView::default();
        view.floor(0, 119, 0);
        let found = sky.safe_home_location(owner, 1, &view).unwrap();
        assert_eq!((found.x, found.y, found.z), (0.5, 120.0, 0.5));
        assert_eq!(sky.directory().home_location(owner, 1), Some(at(0, 0)));

        // Home is now set; the next call uses it directly.
        let again = sky.safe_home_location(owner, 1, &view).unwrap();
        assert_eq!(again, found);
    }

    #[test]
    fn test_safe_home_sweeps_upward() {
        let mut sky = skyblock();
        let owner = PlayerId::new();
        sky.claim_island(owner, &at(0, 0)).unwrap();

        let mut view = MapView::default();
        view.floor(0, 139, 0);
        let found = sky.safe_home_location(owner, 1, &view).unwrap();
        assert_eq!(found.block_y(), 140);
        assert_eq!(found.x, 0.5);
    }

    #[test]
    fn test_safe_home_without_island() {
        let mut sky = skyblock();
        let view = MapView::default();
        assert!(sky.safe_home_location(PlayerId::new(), 1, &view).is_none());
    }

    #[test]
    fn test_scan_island() {
        let mut sky = skyblock();
        sky.claim_island(PlayerId::new(), &at(0, 0)).unwrap();
        let mut view = MapView::default();
        view.floor(7, 100, 3);
        let found = sky.scan_island(&at(0, 0), &view).unwrap();
        assert_eq!((found.block_x(), found.block_y(), found.block_z()), (7, 101, 3));
        assert!(sky.scan_island(&at(5000, 0), &view).is_none());
    }
}
