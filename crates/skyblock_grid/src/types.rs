//! # Core Type Definitions
//!
//! Identifier and position types shared by every part of the island grid.
//!
//! ## Key Types
//!
//! - [`PlayerId`] - Unique identifier for a player
//! - [`IslandId`] - Arena handle for an island record held by the grid
//! - [`Location`] - A point in a named world, with facing
//!
//! Locations carry `f64` coordinates the way the hosting game runtime reports
//! them. Grid arithmetic always happens on the truncated block coordinates
//! returned by [`Location::block_x`] and friends.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a player.
///
/// This is a wrapper around UUID so player ids cannot be confused with any
/// other identifier in the system.
///
/// # Examples
///
/// ```rust
/// use skyblock_grid::PlayerId;
///
/// let player = PlayerId::new();
/// let parsed: PlayerId = player.to_string().parse().unwrap();
/// assert_eq!(player, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Creates a new random player ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::str::FromStr for PlayerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to an island record stored in the grid arena.
///
/// Handles are never reused, so a handle to a deleted island simply stops
/// resolving instead of pointing at a newer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IslandId(pub u64);

impl fmt::Display for IslandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "island#{}", self.0)
    }
}

// ============================================================================
// Positions
// ============================================================================

/// A position in a named world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
}

impl Location {
    /// Creates a location with zero yaw and pitch.
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Creates a location on exact block coordinates.
    pub fn block(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self::new(world, x as f64, y as f64, z as f64)
    }

    pub fn with_facing(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }

    pub fn block_x(&self) -> i32 {
        self.x.floor() as i32
    }

    pub fn block_y(&self) -> i32 {
        self.y.floor() as i32
    }

    pub fn block_z(&self) -> i32 {
        self.z.floor() as i32
    }

    /// Returns a copy offset by the given deltas.
    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            world: self.world.clone(),
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
            yaw: self.yaw,
            pitch: self.pitch,
        }
    }

    /// Returns the block-aligned copy of this location (facing preserved).
    pub fn to_block(&self) -> Self {
        Self {
            world: self.world.clone(),
            x: self.block_x() as f64,
            y: self.block_y() as f64,
            z: self.block_z() as f64,
            yaw: self.yaw,
            pitch: self.pitch,
        }
    }

    /// True when both locations refer to the same block in the same world.
    pub fn same_block(&self, other: &Location) -> bool {
        self.world == other.world
            && self.block_x() == other.block_x()
            && self.block_y() == other.block_y()
            && self.block_z() == other.block_z()
    }

    /// Encodes the location as `world:x:y:z:yawBits:pitchBits`.
    ///
    /// Coordinates are block coordinates; yaw and pitch are written as the
    /// signed 32-bit integer view of their IEEE-754 bit patterns.
    pub fn to_location_string(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}",
            self.world,
            self.block_x(),
            self.block_y(),
            self.block_z(),
            self.yaw.to_bits() as i32,
            self.pitch.to_bits() as i32
        )
    }

    /// Parses `world:x:y:z` or `world:x:y:z:yawBits:pitchBits`.
    ///
    /// # Returns
    ///
    /// `None` for blank input, a wrong number of parts, or any part that is
    /// not an integer.
    pub fn parse_location_string(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 4 && parts.len() != 6 {
            return None;
        }
        if parts[0].is_empty() {
            return None;
        }
        let x: i32 = parts[1].parse().ok()?;
        let y: i32 = parts[2].parse().ok()?;
        let z: i32 = parts[3].parse().ok()?;
        let mut location = Location::block(parts[0], x, y, z);
        if parts.len() == 6 {
            let yaw: i32 = parts[4].parse().ok()?;
            let pitch: i32 = parts[5].parse().ok()?;
            location.yaw = f32::from_bits(yaw as u32);
            location.pitch = f32::from_bits(pitch as u32);
        }
        Some(location)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}, {}, {})",
            self.world,
            self.block_x(),
            self.block_y(),
            self.block_z()
        )
    }
}

/// Returns the current Unix timestamp in seconds.
///
/// A clock set before the epoch yields `0` rather than panicking.
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
