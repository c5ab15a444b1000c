//! # Skyblock Grid
//!
//! Island registry and gameplay rules for a skyblock world: a single void
//! world divided into a regular grid of square islands, each owned by a
//! player (or a team led by one), with per-island permission flags and
//! temporary "coop" access for visitors.
//!
//! ## Core Features
//!
//! - **Spatial Index**: `O(log n)` "which island is here" lookups over a
//!   two-level ordered map keyed by island corners
//! - **Ownership**: At most one island per player, with team members acting
//!   through their leader's island
//! - **Flags**: 47 permission flags with tri-state storage, so unset flags
//!   follow the configured defaults
//! - **Coop**: Temporary grants with listener veto before every change
//! - **Safety**: Safe teleport checks and outward scans for a place to land
//! - **Persistence**: Atomic JSON documents that keep the legacy island
//!   record line format
//!
//! ## Quick Start Example
//!
//! ```rust
//! use skyblock_grid::*;
//!
//! let mut sky = Skyblock::new(
//!     GridSettings::default(),
//!     CoopSettings::default(),
//!     Box::new(MemoryDirectory::new()),
//! )?;
//!
//! let owner = PlayerId::new();
//! sky.claim_island(owner, &Location::block("skyblock", 10, 120, -20))?;
//!
//! let here = Location::block("skyblock", 5, 64, 5);
//! assert_eq!(sky.island_at(&here).and_then(|island| island.owner()), Some(owner));
//! assert!(!sky.is_allowed(PlayerId::new(), &here, SettingsFlag::BreakBlocks));
//! assert!(sky.is_allowed(owner, &here, SettingsFlag::BreakBlocks));
//! # Ok::<(), SkyblockError>(())
//! ```
//!
//! ## Threading
//!
//! [`Skyblock`] is a plain single-writer value. Hosts keep it on their game
//! thread (or behind one lock) and persist through [`Skyblock::snapshot`],
//! which produces owned documents that can be written from any task.

pub mod cleanup;
pub mod config;
pub mod coop;
pub mod coords;
pub mod error;
pub mod events;
pub mod flags;
pub mod grid;
pub mod island;
pub mod ownership;
pub mod persistence;
pub mod safety;
pub mod service;
pub mod types;

pub use cleanup::{ChunkAction, ChunkJob, ChunkPos, ChunkRegenerator, CleanupQueue};
pub use config::{CoopSettings, GridSettings};
pub use coop::{CleanupPolicy, CleanupReport, CoopDocument, CoopRegistry, IslandCenter};
pub use coords::GridLayout;
pub use error::{CoopError, GridError, RecordError, SkyblockError, StorageError};
pub use events::{IslandEvent, IslandEvents, IslandListener, LeaveReason, Verdict};
pub use flags::{FlagDefaults, IslandFlags, SettingsFlag, FLAG_COUNT};
pub use grid::IslandGrid;
pub use island::{Island, IslandRole};
pub use ownership::{MemoryDirectory, PlayerDirectory, TeamLookup};
pub use persistence::{GridDocument, GridStorage, JsonGridStorage, LoadReport};
pub use safety::{big_scan, is_safe_location, BlockKind, BlockView};
pub use service::{PersistSnapshot, Skyblock};
pub use types::{current_timestamp, IslandId, Location, PlayerId};
