//! Grid and gameplay settings.
//!
//! These are embedded in the server's TOML configuration under `[grid]` and
//! `[coop]`, so every field has a serde default.

use crate::coop::CleanupPolicy;
use crate::coords::GridLayout;
use crate::flags::FlagDefaults;
use serde::{Deserialize, Serialize};

fn default_world() -> String {
    "skyblock".to_string()
}

fn default_nether_world() -> Option<String> {
    Some("skyblock_nether".to_string())
}

fn default_island_distance() -> i32 {
    200
}

fn default_protection_range() -> i32 {
    100
}

fn default_island_height() -> i32 {
    120
}

fn default_clean_rate() -> usize {
    2
}

fn default_true() -> bool {
    true
}

/// Island world layout and defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    /// Name of the island world
    #[serde(default = "default_world")]
    pub world: String,
    /// Nether world that shares the island grid, if any
    #[serde(default = "default_nether_world")]
    pub nether_world: Option<String>,
    /// Spacing between island centers
    #[serde(default = "default_island_distance")]
    pub island_distance: i32,
    /// Protected width of a new island
    #[serde(default = "default_protection_range")]
    pub protection_range: i32,
    /// Y level of island centers
    #[serde(default = "default_island_height")]
    pub island_height: i32,
    #[serde(default)]
    pub x_offset: i32,
    #[serde(default)]
    pub z_offset: i32,
    /// Damage dealt by acid water; any positive value makes liquids unsafe
    #[serde(default)]
    pub acid_damage: f64,
    /// Chunks cleared per tick after an island is deleted
    #[serde(default = "default_clean_rate")]
    pub clean_rate: usize,
    /// Default flag values
    #[serde(default)]
    pub default_flags: FlagDefaults,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            world: default_world(),
            nether_world: default_nether_world(),
            island_distance: default_island_distance(),
            protection_range: default_protection_range(),
            island_height: default_island_height(),
            x_offset: 0,
            z_offset: 0,
            acid_damage: 0.0,
            clean_rate: default_clean_rate(),
            default_flags: FlagDefaults::default(),
        }
    }
}

impl GridSettings {
    pub fn layout(&self) -> GridLayout {
        GridLayout::new(
            self.island_distance,
            self.x_offset,
            self.z_offset,
            self.island_height,
        )
    }

    /// Checks the settings for values the grid cannot work with.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the settings are usable, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.world.trim().is_empty() {
            return Err("Island world name cannot be empty".to_string());
        }
        if self.nether_world.as_deref() == Some(self.world.as_str()) {
            return Err("Nether world must differ from the island world".to_string());
        }
        if self.island_distance <= 0 {
            return Err(format!(
                "Island distance must be positive, got {}",
                self.island_distance
            ));
        }
        if self.protection_range <= 0 || self.protection_range > self.island_distance {
            return Err(format!(
                "Protection range must be between 1 and the island distance {}, got {}",
                self.island_distance, self.protection_range
            ));
        }
        if !(0..=255).contains(&self.island_height) {
            return Err(format!(
                "Island height must be between 0 and 255, got {}",
                self.island_height
            ));
        }
        if self.acid_damage < 0.0 {
            return Err("Acid damage cannot be negative".to_string());
        }
        if self.clean_rate == 0 {
            return Err("Clean rate must be at least 1 chunk per tick".to_string());
        }
        Ok(())
    }
}

/// Coop behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoopSettings {
    /// Only team leaders may grant coop on a team island
    #[serde(default)]
    pub only_leader_can_coop: bool,
    /// Drop a player's coop grants when they log out
    #[serde(default = "default_true")]
    pub clear_on_logout: bool,
    /// Whether listeners may keep grants alive during cleanup cascades
    #[serde(default = "default_true")]
    pub cleanup_vetoable: bool,
}

impl Default for CoopSettings {
    fn default() -> Self {
        Self {
            only_leader_can_coop: false,
            clear_on_logout: true,
            cleanup_vetoable: true,
        }
    }
}

impl CoopSettings {
    pub fn cleanup_policy(&self) -> CleanupPolicy {
        if self.cleanup_vetoable {
            CleanupPolicy::Vetoable
        } else {
            CleanupPolicy::Forced
        }
    }
}
