//! Team membership and per-player island references.
//!
//! The grid only knows direct owners. Team membership, home locations and
//! the island references kept per player live in a player directory owned by
//! the host. [`MemoryDirectory`] is a complete in-process implementation.
//!
//! A team leader is reported as their own leader, so `team_leader(p) ==
//! Some(p)` identifies leaders and `None` means the player is not in a team.

use crate::types::{Location, PlayerId};
use std::collections::{BTreeMap, HashMap};

/// Read access to team structure.
pub trait TeamLookup {
    /// Leader of the player's team, the player themselves for a leader.
    fn team_leader(&self, player: PlayerId) -> Option<PlayerId>;

    /// Every member of the team led by `leader`, leader included.
    fn team_members(&self, leader: PlayerId) -> Vec<PlayerId>;

    fn in_team(&self, player: PlayerId) -> bool {
        self.team_leader(player).is_some()
    }

    fn is_leader(&self, player: PlayerId) -> bool {
        self.team_leader(player) == Some(player)
    }

    /// The player whose island this player acts for.
    fn effective_owner(&self, player: PlayerId) -> PlayerId {
        self.team_leader(player).unwrap_or(player)
    }
}

/// Per-player attribute store.
pub trait PlayerDirectory: TeamLookup + Send + Sync {
    /// Sets or clears the player's team leader.
    fn set_team_leader(&mut self, player: PlayerId, leader: Option<PlayerId>);

    /// Numbered home. Number 1 is the default home.
    fn home_location(&self, player: PlayerId, number: u32) -> Option<Location>;

    fn set_home_location(&mut self, player: PlayerId, number: u32, location: Option<Location>);

    /// Center of the island the player owns.
    fn island_location(&self, player: PlayerId) -> Option<Location>;

    fn set_island_location(&mut self, player: PlayerId, location: Option<Location>);

    /// Center of the team island for team members.
    fn team_island_location(&self, player: PlayerId) -> Option<Location>;

    fn set_team_island_location(&mut self, player: PlayerId, location: Option<Location>);

    fn has_island(&self, player: PlayerId) -> bool {
        self.island_location(player).is_some()
    }
}

#[derive(Debug, Clone, Default)]
struct PlayerEntry {
    team_leader: Option<PlayerId>,
    homes: BTreeMap<u32, Location>,
    island_location: Option<Location>,
    team_island_location: Option<Location>,
}

/// In-memory player directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    players: HashMap<PlayerId, PlayerEntry>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    fn entry(&mut self, player: PlayerId) -> &mut PlayerEntry {
        self.players.entry(player).or_default()
    }
}

impl TeamLookup for MemoryDirectory {
    fn team_leader(&self, player: PlayerId) -> Option<PlayerId> {
        self.players.get(&player).and_then(|p| p.team_leader)
    }

    fn team_members(&self, leader: PlayerId) -> Vec<PlayerId> {
        let mut members: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|(_, entry)| entry.team_leader == Some(leader))
            .map(|(id, _)| *id)
            .collect();
        members.sort();
        members
    }
}

impl PlayerDirectory for MemoryDirectory {
    fn set_team_leader(&mut self, player: PlayerId, leader: Option<PlayerId>) {
        self.entry(player).team_leader = leader;
    }

    fn home_location(&self, player: PlayerId, number: u32) -> Option<Location> {
        self.players
            .get(&player)
            .and_then(|p| p.homes.get(&number).cloned())
    }

    fn set_home_location(&mut self, player: PlayerId, number: u32, location: Option<Location>) {
        let entry = self.entry(player);
        match location {
            Some(location) => {
                entry.homes.insert(number, location);
            }
            None => {
                entry.homes.remove(&number);
            }
        }
    }

    fn island_location(&self, player: PlayerId) -> Option<Location> {
        self.players
            .get(&player)
            .and_then(|p| p.island_location.clone())
    }

    fn set_island_location(&mut self, player: PlayerId, location: Option<Location>) {
        self.entry(player).island_location = location;
    }

    fn team_island_location(&self, player: PlayerId) -> Option<Location> {
        self.players
            .get(&player)
            .and_then(|p| p.team_island_location.clone())
    }

    fn set_team_island_location(&mut self, player: PlayerId, location: Option<Location>) {
        self.entry(player).team_island_location = location;
    }
}
