//! # Coop Grants
//!
//! Temporary access a team grants to a non-member for one island. State is
//! keyed by grantee, then by island center, and remembers the grantor:
//!
//! ```text
//! grantee -> { island center -> grantor }
//! ```
//!
//! A grantee may hold grants on several islands and an island may have
//! several coop players. Raw mutation ([`CoopRegistry::grant`],
//! [`CoopRegistry::revoke`]) never fires events; the cleanup cascades here
//! propose a [`IslandEvent::CoopLeave`] for each grant first.
//!
//! ## Persistence
//!
//! Saved as one list per grantor of `islandCenter|granteeId` entries, where
//! the island center uses the location string format.

use crate::events::{IslandEvent, IslandEvents, LeaveReason, Verdict};
use crate::types::{Location, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Block position of an island center, used as the coop key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IslandCenter {
    pub world: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl IslandCenter {
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    pub fn from_location(location: &Location) -> Self {
        Self::new(
            location.world.clone(),
            location.block_x(),
            location.block_y(),
            location.block_z(),
        )
    }

    pub fn to_location(&self) -> Location {
        Location::block(&self.world, self.x, self.y, self.z)
    }
}

impl fmt::Display for IslandCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.world, self.x, self.y, self.z)
    }
}

/// How the cleanup cascades treat a listener veto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPolicy {
    /// A veto keeps the grant in place.
    Vetoable,
    /// Listeners are told, but the grant is removed regardless.
    Forced,
}

/// Outcome of a cleanup cascade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub revoked: usize,
    /// Grants a listener kept alive.
    pub retained: usize,
}

/// Persisted coop document: grantor id to `center|grantee` entries.
pub type CoopDocument = BTreeMap<String, Vec<String>>;

/// Live coop grants.
#[derive(Debug, Clone, Default)]
pub struct CoopRegistry {
    grants: BTreeMap<PlayerId, BTreeMap<IslandCenter, PlayerId>>,
}

impl CoopRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a grant. Returns `false` if the grantee already had one there.
    pub fn grant(&mut self, grantee: PlayerId, island: IslandCenter, grantor: PlayerId) -> bool {
        let islands = self.grants.entry(grantee).or_default();
        if islands.contains_key(&island) {
            return false;
        }
        islands.insert(island, grantor);
        true
    }

    /// Removes a grant and returns its grantor.
    pub fn revoke(&mut self, grantee: PlayerId, island: &IslandCenter) -> Option<PlayerId> {
        let islands = self.grants.get_mut(&grantee)?;
        let grantor = islands.remove(island);
        if islands.is_empty() {
            self.grants.remove(&grantee);
        }
        grantor
    }

    pub fn is_coop(&self, grantee: PlayerId, island: &IslandCenter) -> bool {
        self.grants
            .get(&grantee)
            .is_some_and(|islands| islands.contains_key(island))
    }

    /// Islands the player is coop on.
    pub fn coop_islands(&self, grantee: PlayerId) -> Vec<IslandCenter> {
        self.grants
            .get(&grantee)
            .map(|islands| islands.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Coop players of an island.
    pub fn coop_players(&self, island: &IslandCenter) -> Vec<PlayerId> {
        self.grants
            .iter()
            .filter(|(_, islands)| islands.contains_key(island))
            .map(|(grantee, _)| *grantee)
            .collect()
    }

    /// Total number of grants.
    pub fn len(&self) -> usize {
        self.grants.values().map(|islands| islands.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    fn grants_where(
        &self,
        keep: impl Fn(PlayerId, &IslandCenter, PlayerId) -> bool,
    ) -> Vec<(PlayerId, IslandCenter, PlayerId)> {
        let mut out = Vec::new();
        for (grantee, islands) in &self.grants {
            for (island, grantor) in islands {
                if keep(*grantee, island, *grantor) {
                    out.push((*grantee, island.clone(), *grantor));
                }
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // Cascades
    // ------------------------------------------------------------------

    /// Revokes every grant on an island, e.g. when it is deleted or reset.
    pub fn clear_island(
        &mut self,
        island: &IslandCenter,
        events: &mut IslandEvents,
        policy: CleanupPolicy,
    ) -> CleanupReport {
        let targets = self.grants_where(|_, center, _| center == island);
        self.revoke_all(targets, LeaveReason::IslandDeleted, events, policy)
    }

    /// Revokes every grant the player holds, e.g. on logout.
    pub fn clear_grantee(
        &mut self,
        grantee: PlayerId,
        events: &mut IslandEvents,
        policy: CleanupPolicy,
    ) -> CleanupReport {
        let targets = self.grants_where(|g, _, _| g == grantee);
        self.revoke_all(targets, LeaveReason::Logout, events, policy)
    }

    /// Revokes every grant issued by the player, e.g. when they leave a team.
    pub fn clear_grantor(
        &mut self,
        grantor: PlayerId,
        events: &mut IslandEvents,
        policy: CleanupPolicy,
    ) -> CleanupReport {
        let targets = self.grants_where(|_, _, by| by == grantor);
        self.revoke_all(targets, LeaveReason::GrantorLeft, events, policy)
    }

    fn revoke_all(
        &mut self,
        targets: Vec<(PlayerId, IslandCenter, PlayerId)>,
        reason: LeaveReason,
        events: &mut IslandEvents,
        policy: CleanupPolicy,
    ) -> CleanupReport {
        let mut report = CleanupReport::default();
        for (grantee, island, grantor) in targets {
            let event = IslandEvent::CoopLeave {
                grantee,
                island: island.clone(),
                grantor,
                reason,
            };
            if let Verdict::Veto { listener, .. } = events.propose(&event) {
                if policy == CleanupPolicy::Vetoable {
                    warn!(
                        "⚠️ Listener '{}' kept coop grant for {} on {} alive after {:?}",
                        listener, grantee, island, reason
                    );
                    report.retained += 1;
                    continue;
                }
            }
            self.revoke(grantee, &island);
            events.commit(&event);
            report.revoked += 1;
        }
        if report.revoked > 0 {
            debug!("Revoked {} coop grants ({:?})", report.revoked, reason);
        }
        report
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    pub fn to_document(&self) -> CoopDocument {
        let mut document = CoopDocument::new();
        for (grantee, islands) in &self.grants {
            for (island, grantor) in islands {
                document
                    .entry(grantor.to_string())
                    .or_default()
                    .push(format!("{}|{}", island.to_location().to_location_string(), grantee));
            }
        }
        document
    }

    /// Rebuilds the registry from a document.
    ///
    /// Entries that cannot be parsed, or whose island no longer exists
    /// according to `island_exists`, are dropped.
    ///
    /// # Returns
    ///
    /// The number of dropped entries.
    pub fn load_document(
        &mut self,
        document: &CoopDocument,
        island_exists: impl Fn(&IslandCenter) -> bool,
    ) -> usize {
        self.grants.clear();
        let mut dropped = 0;
        for (grantor, entries) in document {
            let Ok(grantor) = grantor.parse::<PlayerId>() else {
                warn!("⚠️ Skipping coop entries for unreadable grantor {:?}", grantor);
                dropped += entries.len();
                continue;
            };
            for entry in entries {
                match parse_entry(entry) {
                    Some((island, grantee)) if island_exists(&island) => {
                        self.grant(grantee, island, grantor);
                    }
                    Some((island, _)) => {
                        debug!("Dropping coop grant on missing island {}", island);
                        dropped += 1;
                    }
                    None => {
                        warn!("⚠️ Skipping unreadable coop entry {:?}", entry);
                        dropped += 1;
                    }
                }
            }
        }
        dropped
    }
}

fn parse_entry(entry: &str) -> Option<(IslandCenter, PlayerId)> {
    let (center, grantee) = entry.split_once('|')?;
    let location = Location::parse_location_string(center)?;
    let grantee = grantee.trim().parse().ok()?;
    Some((IslandCenter::from_location(&location), grantee))
}
