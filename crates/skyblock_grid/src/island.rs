//! # Island Record
//!
//! One plot on the grid: its geometry, role, permission flags and metadata.
//!
//! ## Geometry
//!
//! Two square bounds share the island center:
//!
//! - the **outer bound** (island space), `[center - d/2, center + d/2)` on each
//!   axis, where `d` is the island distance. No two islands may have
//!   overlapping outer bounds.
//! - the **protection bound**, `[center - r/2, center - r/2 + r)` where `r` is
//!   the protection range. Build and interact rules apply inside it.
//!
//! Halving uses truncating integer division. For an odd distance the outer
//! bound is one block narrower than `d` and reaches one block further on the
//! negative side than on the positive side. The protection bound always spans
//! exactly `r` blocks. Existing worlds depend on both rules.
//!
//! ## Persistence
//!
//! [`Island::to_record`] and [`Island::from_record`] implement the
//! colon-separated record line:
//!
//! ```text
//! x:y:z:protectionRange:islandDistance:owner:locked:purgeProtected:flagBits:biome:levelHandicap
//! ```
//!
//! `owner` is a player id, `null` for an unowned plot, or `spawn`. Spawn
//! records stop after `purgeProtected` and may append `:SP:<location>`.

use crate::error::RecordError;
use crate::flags::{BitsOutcome, FlagDefaults, IslandFlags, SettingsFlag};
use crate::types::{current_timestamp, Location, PlayerId};
use serde::{Deserialize, Serialize};
use tracing::warn;

const UNOWNED_SENTINEL: &str = "null";
const SPAWN_SENTINEL: &str = "spawn";
const SPAWN_POINT_MARKER: &str = ":SP:";

/// What an island is used for. Exactly one applies at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IslandRole {
    /// A claimed-then-released or reserved plot with no owner.
    Unowned,
    /// A player's island.
    Owned(PlayerId),
    /// The world spawn, optionally with an explicit arrival point.
    Spawn { spawn_point: Option<Location> },
}

impl IslandRole {
    pub fn owner(&self) -> Option<PlayerId> {
        match self {
            IslandRole::Owned(owner) => Some(*owner),
            _ => None,
        }
    }

    pub fn is_spawn(&self) -> bool {
        matches!(self, IslandRole::Spawn { .. })
    }
}

/// A single island plot.
#[derive(Debug, Clone, PartialEq)]
pub struct Island {
    world: String,
    center_x: i32,
    center_y: i32,
    center_z: i32,
    island_distance: i32,
    protection_range: i32,
    min_x: i32,
    min_z: i32,
    min_protected_x: i32,
    min_protected_z: i32,
    role: IslandRole,
    locked: bool,
    purge_protected: bool,
    flags: IslandFlags,
    created_at: u64,
    updated_at: u64,
    biome: Option<String>,
    level_handicap: i32,
    name: Option<String>,
}

impl Island {
    /// Creates an unowned island.
    ///
    /// # Arguments
    ///
    /// * `world` - Name of the island world
    /// * `x`, `y`, `z` - Center block
    /// * `island_distance` - Outer spacing, must be positive
    /// * `protection_range` - Protected width, clamped into `1..=island_distance`
    pub fn new(
        world: impl Into<String>,
        x: i32,
        y: i32,
        z: i32,
        island_distance: i32,
        protection_range: i32,
    ) -> Self {
        let island_distance = island_distance.max(1);
        let protection_range = protection_range.clamp(1, island_distance);
        let now = current_timestamp();
        Self {
            world: world.into(),
            center_x: x,
            center_y: y,
            center_z: z,
            island_distance,
            protection_range,
            min_x: x.saturating_sub(island_distance / 2),
            min_z: z.saturating_sub(island_distance / 2),
            min_protected_x: x.saturating_sub(protection_range / 2),
            min_protected_z: z.saturating_sub(protection_range / 2),
            role: IslandRole::Unowned,
            locked: false,
            purge_protected: false,
            flags: IslandFlags::default(),
            created_at: now,
            updated_at: now,
            biome: None,
            level_handicap: 0,
            name: None,
        }
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    pub fn world(&self) -> &str {
        &self.world
    }

    pub fn center(&self) -> Location {
        Location::block(&self.world, self.center_x, self.center_y, self.center_z)
    }

    pub fn center_x(&self) -> i32 {
        self.center_x
    }

    pub fn center_y(&self) -> i32 {
        self.center_y
    }

    pub fn center_z(&self) -> i32 {
        self.center_z
    }

    pub fn island_distance(&self) -> i32 {
        self.island_distance
    }

    pub fn protection_range(&self) -> i32 {
        self.protection_range
    }

    pub fn min_x(&self) -> i32 {
        self.min_x
    }

    pub fn min_z(&self) -> i32 {
        self.min_z
    }

    /// Exclusive upper x of the outer bound.
    pub fn max_x(&self) -> i32 {
        self.center_x.saturating_add(self.island_distance / 2)
    }

    /// Exclusive upper z of the outer bound.
    pub fn max_z(&self) -> i32 {
        self.center_z.saturating_add(self.island_distance / 2)
    }

    pub fn min_protected_x(&self) -> i32 {
        self.min_protected_x
    }

    pub fn min_protected_z(&self) -> i32 {
        self.min_protected_z
    }

    /// True when the block column lies inside the outer bound.
    pub fn contains_point(&self, x: i32, z: i32) -> bool {
        x >= self.min_x && x < self.max_x() && z >= self.min_z && z < self.max_z()
    }

    /// True when the block column lies inside the protection bound.
    pub fn is_protected_at(&self, x: i32, z: i32) -> bool {
        x >= self.min_protected_x
            && x < self.min_protected_x.saturating_add(self.protection_range)
            && z >= self.min_protected_z
            && z < self.min_protected_z.saturating_add(self.protection_range)
    }

    /// True when the outer bounds of both islands share at least one block.
    pub fn overlaps(&self, other: &Island) -> bool {
        self.min_x < other.max_x()
            && other.min_x < self.max_x()
            && self.min_z < other.max_z()
            && other.min_z < self.max_z()
    }

    /// Changes the protection range, keeping the center.
    ///
    /// # Returns
    ///
    /// `false` (and no change) when `range` is not in `1..=island_distance`.
    pub fn resize(&mut self, range: i32) -> bool {
        if range <= 0 || range > self.island_distance {
            return false;
        }
        self.protection_range = range;
        self.min_protected_x = self.center_x.saturating_sub(range / 2);
        self.min_protected_z = self.center_z.saturating_sub(range / 2);
        self.touch();
        true
    }

    // ------------------------------------------------------------------
    // Role
    // ------------------------------------------------------------------

    pub fn role(&self) -> &IslandRole {
        &self.role
    }

    pub fn owner(&self) -> Option<PlayerId> {
        self.role.owner()
    }

    pub fn is_spawn(&self) -> bool {
        self.role.is_spawn()
    }

    pub fn spawn_point(&self) -> Option<&Location> {
        match &self.role {
            IslandRole::Spawn { spawn_point } => spawn_point.as_ref(),
            _ => None,
        }
    }

    /// Sets the arrival point of a spawn island. Ignored on other islands.
    pub fn set_spawn_point(&mut self, point: Location) -> bool {
        match &mut self.role {
            IslandRole::Spawn { spawn_point } => {
                *spawn_point = Some(point);
                self.updated_at = current_timestamp();
                true
            }
            _ => false,
        }
    }

    pub(crate) fn set_role(&mut self, role: IslandRole) {
        self.role = role;
        self.touch();
    }

    /// Releases the owner and lock. Used when the grid forgets the island.
    pub(crate) fn release(&mut self) {
        if !self.is_spawn() {
            self.role = IslandRole::Unowned;
        }
        self.locked = false;
        self.touch();
    }

    // ------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------

    pub fn flags(&self) -> &IslandFlags {
        &self.flags
    }

    /// Effective flag value, resolving unset flags against `defaults`.
    pub fn flag(&self, flag: SettingsFlag, defaults: &FlagDefaults) -> bool {
        if self.is_spawn() {
            self.flags.effective(flag, |f| defaults.spawn_default(f))
        } else {
            self.flags.effective(flag, |f| defaults.island_default(f))
        }
    }

    pub fn set_flag(&mut self, flag: SettingsFlag, value: bool) {
        self.flags.set(flag, Some(value));
        self.touch();
    }

    /// Pins the negation of the current effective value and returns it.
    pub fn toggle_flag(&mut self, flag: SettingsFlag, defaults: &FlagDefaults) -> bool {
        let value = !self.flag(flag, defaults);
        self.set_flag(flag, value);
        value
    }

    /// Pins every unset flag to its current effective value, so later changes
    /// to the configured defaults no longer affect this island.
    pub fn pin_defaults(&mut self, defaults: &FlagDefaults) {
        for flag in SettingsFlag::ALL {
            if self.flags.get(flag).is_none() {
                let value = self.flag(flag, defaults);
                self.flags.set(flag, Some(value));
            }
        }
        self.touch();
    }

    /// Unsets every flag so all of them follow the configured defaults again.
    pub fn reset_flags(&mut self) {
        self.flags.clear();
        self.touch();
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
        self.touch();
    }

    pub fn is_purge_protected(&self) -> bool {
        self.purge_protected
    }

    pub fn set_purge_protected(&mut self, purge_protected: bool) {
        self.purge_protected = purge_protected;
        self.touch();
    }

    pub fn biome(&self) -> Option<&str> {
        self.biome.as_deref()
    }

    pub fn set_biome(&mut self, biome: Option<String>) {
        self.biome = biome.filter(|b| !b.is_empty());
        self.touch();
    }

    pub fn level_handicap(&self) -> i32 {
        self.level_handicap
    }

    pub fn set_level_handicap(&mut self, handicap: i32) {
        self.level_handicap = handicap;
        self.touch();
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name;
        self.touch();
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn updated_at(&self) -> u64 {
        self.updated_at
    }

    pub(crate) fn set_timestamps(&mut self, created_at: u64, updated_at: u64) {
        self.created_at = created_at;
        self.updated_at = updated_at;
    }

    fn touch(&mut self) {
        self.updated_at = current_timestamp();
    }

    // ------------------------------------------------------------------
    // Record line
    // ------------------------------------------------------------------

    /// Encodes the island as a record line.
    ///
    /// Flags are written as their effective values, so unset flags are
    /// pinned to the defaults in force at save time.
    pub fn to_record(&self, defaults: &FlagDefaults) -> String {
        let head = format!(
            "{}:{}:{}:{}:{}",
            self.center_x, self.center_y, self.center_z, self.protection_range, self.island_distance
        );
        match &self.role {
            IslandRole::Spawn { spawn_point } => {
                let mut line = format!(
                    "{}:{}:{}:{}",
                    head, SPAWN_SENTINEL, self.locked, self.purge_protected
                );
                if let Some(point) = spawn_point {
                    line.push_str(SPAWN_POINT_MARKER);
                    line.push_str(&point.to_location_string());
                }
                line
            }
            role => {
                let owner = role
                    .owner()
                    .map(|o| o.to_string())
                    .unwrap_or_else(|| UNOWNED_SENTINEL.to_string());
                format!(
                    "{}:{}:{}:{}:{}:{}:{}",
                    head,
                    owner,
                    self.locked,
                    self.purge_protected,
                    self.flag_bits(defaults),
                    self.biome.as_deref().unwrap_or(""),
                    self.level_handicap
                )
            }
        }
    }

    /// Effective flag values as a bitstring in canonical flag order.
    pub fn flag_bits(&self, defaults: &FlagDefaults) -> String {
        if self.is_spawn() {
            self.flags.to_bitstring(|f| defaults.spawn_default(f))
        } else {
            self.flags.to_bitstring(|f| defaults.island_default(f))
        }
    }

    /// Decodes a record line for `world`.
    ///
    /// Coordinates and sizes must parse; everything after them degrades to
    /// defaults with a warning. A protection range larger than the island
    /// distance is clamped.
    pub fn from_record(
        world: &str,
        line: &str,
        settings_key: &[String],
    ) -> Result<Island, RecordError> {
        let split: Vec<&str> = line.split(':').collect();
        if split.len() < 6 {
            return Err(RecordError::TooFewFields(split.len()));
        }

        let x = parse_int("x", split[0])?;
        let y = parse_int("y", split[1])?;
        let z = parse_int("z", split[2])?;
        let protection_range = parse_int("protectionRange", split[3])?;
        let island_distance = parse_int("islandDistance", split[4])?;
        if island_distance <= 0 {
            return Err(RecordError::InvalidDistance(island_distance));
        }
        if protection_range > island_distance || protection_range <= 0 {
            warn!(
                "⚠️ Island at {}:{} has protection range {} outside 1..={}, clamping",
                x, z, protection_range, island_distance
            );
        }

        let mut island = Island::new(world, x, y, z, island_distance, protection_range);
        island.locked = split.get(6).is_some_and(|v| v.eq_ignore_ascii_case("true"));
        island.purge_protected = split.get(7).is_some_and(|v| v.eq_ignore_ascii_case("true"));

        match split[5] {
            SPAWN_SENTINEL => {
                let spawn_point = line
                    .find(SPAWN_POINT_MARKER)
                    .and_then(|idx| {
                        let text = &line[idx + SPAWN_POINT_MARKER.len()..];
                        let point = Location::parse_location_string(text);
                        if point.is_none() {
                            warn!("⚠️ Spawn point {:?} could not be parsed, ignoring", text);
                        }
                        point
                    });
                island.role = IslandRole::Spawn { spawn_point };
                return Ok(island);
            }
            UNOWNED_SENTINEL => {}
            owner => match owner.parse::<PlayerId>() {
                Ok(owner) => island.role = IslandRole::Owned(owner),
                Err(_) => {
                    warn!(
                        "⚠️ Island at {}:{} has unreadable owner {:?}, loading it unowned",
                        x, z, owner
                    );
                }
            },
        }

        if let Some(bits) = split.get(8) {
            island.apply_flag_bits(bits, settings_key);
        }

        if let Some(biome) = split.get(9) {
            if !biome.is_empty() {
                island.biome = Some(biome.to_string());
            }
        }

        if let Some(handicap) = split.get(10) {
            island.level_handicap = handicap.trim().parse().unwrap_or(0);
        }

        Ok(island)
    }

    /// Applies a persisted flag bitstring, warning when it does not match the key.
    pub(crate) fn apply_flag_bits(&mut self, bits: &str, settings_key: &[String]) {
        if let BitsOutcome::LengthMismatch { bits, key } =
            self.flags.apply_bitstring(bits, settings_key)
        {
            warn!(
                "⚠️ Island at {}:{} has {} flag bits but the settings key has {}, using defaults",
                self.center_x, self.center_z, bits, key
            );
        }
    }
}

fn parse_int(field: &'static str, value: &str) -> Result<i32, RecordError> {
    value
        .trim()
        .parse()
        .map_err(|_| RecordError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}
