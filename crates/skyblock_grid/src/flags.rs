//! Island permission flags.
//!
//! Every island carries one optional boolean per [`SettingsFlag`]. An unset
//! flag (`None`) resolves to the configured default through
//! [`FlagDefaults`], so a change to the global defaults reaches every island
//! that never pinned its own value.
//!
//! The persisted form is a bitstring (`'1'`/`'0'` per flag) read against a
//! companion list of flag names, the "settings key". Readers decode by the
//! stored key order, which keeps old files valid when flags are added.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Number of known flags.
pub const FLAG_COUNT: usize = 47;

/// Permission and behaviour toggles stored per island.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettingsFlag {
    AcidDamage,
    Anvil,
    ArmorStand,
    Beacon,
    Bed,
    BreakBlocks,
    Breeding,
    Brewing,
    Bucket,
    CollectLava,
    CollectWater,
    Chest,
    ChorusFruit,
    Crafting,
    CreeperPain,
    CropTrample,
    Door,
    Eggs,
    Enchanting,
    EnderPearl,
    EnterExitMessages,
    Fire,
    FireExtinguish,
    FireSpread,
    Furnace,
    Gate,
    HorseInventory,
    HorseRiding,
    HurtMobs,
    HurtMonsters,
    Leash,
    LeverButton,
    Milking,
    MobSpawn,
    MonsterSpawn,
    Music,
    NetherPvp,
    PlaceBlocks,
    Portal,
    PressurePlate,
    Pvp,
    Redstone,
    SpawnEggs,
    Shearing,
    VillagerTrading,
    VisitorItemDrop,
    VisitorItemPickup,
}

impl SettingsFlag {
    /// All flags in canonical order. Bitstrings are written in this order.
    pub const ALL: [SettingsFlag; FLAG_COUNT] = [
        SettingsFlag::AcidDamage,
        SettingsFlag::Anvil,
        SettingsFlag::ArmorStand,
        SettingsFlag::Beacon,
        SettingsFlag::Bed,
        SettingsFlag::BreakBlocks,
        SettingsFlag::Breeding,
        SettingsFlag::Brewing,
        SettingsFlag::Bucket,
        SettingsFlag::CollectLava,
        SettingsFlag::CollectWater,
        SettingsFlag::Chest,
        SettingsFlag::ChorusFruit,
        SettingsFlag::Crafting,
        SettingsFlag::CreeperPain,
        SettingsFlag::CropTrample,
        SettingsFlag::Door,
        SettingsFlag::Eggs,
        SettingsFlag::Enchanting,
        SettingsFlag::EnderPearl,
        SettingsFlag::EnterExitMessages,
        SettingsFlag::Fire,
        SettingsFlag::FireExtinguish,
        SettingsFlag::FireSpread,
        SettingsFlag::Furnace,
        SettingsFlag::Gate,
        SettingsFlag::HorseInventory,
        SettingsFlag::HorseRiding,
        SettingsFlag::HurtMobs,
        SettingsFlag::HurtMonsters,
        SettingsFlag::Leash,
        SettingsFlag::LeverButton,
        SettingsFlag::Milking,
        SettingsFlag::MobSpawn,
        SettingsFlag::MonsterSpawn,
        SettingsFlag::Music,
        SettingsFlag::NetherPvp,
        SettingsFlag::PlaceBlocks,
        SettingsFlag::Portal,
        SettingsFlag::PressurePlate,
        SettingsFlag::Pvp,
        SettingsFlag::Redstone,
        SettingsFlag::SpawnEggs,
        SettingsFlag::Shearing,
        SettingsFlag::VillagerTrading,
        SettingsFlag::VisitorItemDrop,
        SettingsFlag::VisitorItemPickup,
    ];

    /// Persisted name of the flag.
    pub fn name(self) -> &'static str {
        match self {
            SettingsFlag::AcidDamage => "ACID_DAMAGE",
            SettingsFlag::Anvil => "ANVIL",
            SettingsFlag::ArmorStand => "ARMOR_STAND",
            SettingsFlag::Beacon => "BEACON",
            SettingsFlag::Bed => "BED",
            SettingsFlag::BreakBlocks => "BREAK_BLOCKS",
            SettingsFlag::Breeding => "BREEDING",
            SettingsFlag::Brewing => "BREWING",
            SettingsFlag::Bucket => "BUCKET",
            SettingsFlag::CollectLava => "COLLECT_LAVA",
            SettingsFlag::CollectWater => "COLLECT_WATER",
            SettingsFlag::Chest => "CHEST",
            SettingsFlag::ChorusFruit => "CHORUS_FRUIT",
            SettingsFlag::Crafting => "CRAFTING",
            SettingsFlag::CreeperPain => "CREEPER_PAIN",
            SettingsFlag::CropTrample => "CROP_TRAMPLE",
            SettingsFlag::Door => "DOOR",
            SettingsFlag::Eggs => "EGGS",
            SettingsFlag::Enchanting => "ENCHANTING",
            SettingsFlag::EnderPearl => "ENDER_PEARL",
            SettingsFlag::EnterExitMessages => "ENTER_EXIT_MESSAGES",
            SettingsFlag::Fire => "FIRE",
            SettingsFlag::FireExtinguish => "FIRE_EXTINGUISH",
            SettingsFlag::FireSpread => "FIRE_SPREAD",
            SettingsFlag::Furnace => "FURNACE",
            SettingsFlag::Gate => "GATE",
            SettingsFlag::HorseInventory => "HORSE_INVENTORY",
            SettingsFlag::HorseRiding => "HORSE_RIDING",
            SettingsFlag::HurtMobs => "HURT_MOBS",
            SettingsFlag::HurtMonsters => "HURT_MONSTERS",
            SettingsFlag::Leash => "LEASH",
            SettingsFlag::LeverButton => "LEVER_BUTTON",
            SettingsFlag::Milking => "MILKING",
            SettingsFlag::MobSpawn => "MOB_SPAWN",
            SettingsFlag::MonsterSpawn => "MONSTER_SPAWN",
            SettingsFlag::Music => "MUSIC",
            SettingsFlag::NetherPvp => "NETHER_PVP",
            SettingsFlag::PlaceBlocks => "PLACE_BLOCKS",
            SettingsFlag::Portal => "PORTAL",
            SettingsFlag::PressurePlate => "PRESSURE_PLATE",
            SettingsFlag::Pvp => "PVP",
            SettingsFlag::Redstone => "REDSTONE",
            SettingsFlag::SpawnEggs => "SPAWN_EGGS",
            SettingsFlag::Shearing => "SHEARING",
            SettingsFlag::VillagerTrading => "VILLAGER_TRADING",
            SettingsFlag::VisitorItemDrop => "VISITOR_ITEM_DROP",
            SettingsFlag::VisitorItemPickup => "VISITOR_ITEM_PICKUP",
        }
    }

    /// Position of the flag in [`SettingsFlag::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Value used when neither the island nor the configuration sets the flag.
    ///
    /// Only natural mob and monster spawning are on by default.
    pub fn builtin_default(self) -> bool {
        matches!(self, SettingsFlag::MobSpawn | SettingsFlag::MonsterSpawn)
    }

    /// The persisted settings key: every flag name in canonical order.
    pub fn settings_key() -> Vec<String> {
        Self::ALL.iter().map(|f| f.name().to_string()).collect()
    }
}

impl fmt::Display for SettingsFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a name does not match any known flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFlag(pub String);

impl fmt::Display for UnknownFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown settings flag {}", self.0)
    }
}

impl std::error::Error for UnknownFlag {}

impl FromStr for SettingsFlag {
    type Err = UnknownFlag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingsFlag::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| UnknownFlag(s.to_string()))
    }
}

// ============================================================================
// Defaults
// ============================================================================

/// Configured default flag values for regular islands and for spawn.
///
/// Spawn falls back to the island defaults for any flag it does not set, and
/// both fall back to [`SettingsFlag::builtin_default`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagDefaults {
    #[serde(default)]
    pub island: BTreeMap<SettingsFlag, bool>,
    #[serde(default)]
    pub spawn: BTreeMap<SettingsFlag, bool>,
}

impl FlagDefaults {
    pub fn island_default(&self, flag: SettingsFlag) -> bool {
        self.island
            .get(&flag)
            .copied()
            .unwrap_or_else(|| flag.builtin_default())
    }

    pub fn spawn_default(&self, flag: SettingsFlag) -> bool {
        match self.spawn.get(&flag) {
            Some(value) => *value,
            None => self.island_default(flag),
        }
    }
}

// ============================================================================
// Per-island flag storage
// ============================================================================

/// Result of applying a persisted bitstring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitsOutcome {
    /// The bitstring matched the key and was applied.
    Applied,
    /// No bitstring was present; defaults stay in effect.
    Empty,
    /// Length differed from the key; defaults stay in effect.
    LengthMismatch { bits: usize, key: usize },
}

/// One optional value per flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IslandFlags {
    values: [Option<bool>; FLAG_COUNT],
}

impl Default for IslandFlags {
    fn default() -> Self {
        Self {
            values: [None; FLAG_COUNT],
        }
    }
}

impl IslandFlags {
    /// The explicitly pinned value, if any.
    pub fn get(&self, flag: SettingsFlag) -> Option<bool> {
        self.values[flag.index()]
    }

    pub fn set(&mut self, flag: SettingsFlag, value: Option<bool>) {
        self.values[flag.index()] = value;
    }

    /// Pinned value, or `default` when the flag is unset.
    pub fn effective(&self, flag: SettingsFlag, default: impl Fn(SettingsFlag) -> bool) -> bool {
        self.get(flag).unwrap_or_else(|| default(flag))
    }

    /// Unset every flag.
    pub fn clear(&mut self) {
        self.values = [None; FLAG_COUNT];
    }

    /// Number of flags pinned to an explicit value.
    pub fn pinned_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Encodes the effective value of every flag in canonical order.
    pub fn to_bitstring(&self, default: impl Fn(SettingsFlag) -> bool) -> String {
        SettingsFlag::ALL
            .iter()
            .map(|&flag| if self.effective(flag, &default) { '1' } else { '0' })
            .collect()
    }

    /// Applies a persisted bitstring read against `settings_key`.
    ///
    /// Any character other than `'0'` reads as true. Key entries naming an
    /// unknown flag are skipped. A length mismatch leaves the flags untouched.
    pub fn apply_bitstring(&mut self, bits: &str, settings_key: &[String]) -> BitsOutcome {
        if bits.is_empty() {
            return BitsOutcome::Empty;
        }
        let bit_count = bits.chars().count();
        if bit_count != settings_key.len() {
            return BitsOutcome::LengthMismatch {
                bits: bit_count,
                key: settings_key.len(),
            };
        }
        for (name, bit) in settings_key.iter().zip(bits.chars()) {
            if let Ok(flag) = name.parse::<SettingsFlag>() {
                self.set(flag, Some(bit != '0'));
            }
        }
        BitsOutcome::Applied
    }
}
