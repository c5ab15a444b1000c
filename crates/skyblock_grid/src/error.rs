//! Error types for the island grid

use crate::types::{IslandId, PlayerId};
use std::{io::Error as IoError, path::PathBuf};
use thiserror::Error;

/// Grid integrity and lookup errors
#[derive(Debug, Error)]
pub enum GridError {
    #[error(
        "Island at ({x}, {z}) overlaps island at ({existing_x}, {existing_z}) owned by {existing_owner}"
    )]
    Conflict {
        x: i32,
        z: i32,
        existing_x: i32,
        existing_z: i32,
        existing_owner: String,
    },

    #[error("Island {0} not found")]
    IslandNotFound(IslandId),

    #[error("Player {0} does not own an island")]
    NoIsland(PlayerId),

    #[error("Protection range {range} must be between 1 and the island distance {distance}")]
    InvalidProtectionRange { range: i32, distance: i32 },

    #[error("Spawn island cannot be owned by a player")]
    SpawnNotOwnable,

    #[error("Player {0} is a team member and cannot own a separate island")]
    TeamMemberCannotOwn(PlayerId),
}

/// Errors raised while decoding a persisted island record line
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("Record has {0} fields, expected at least 6")]
    TooFewFields(usize),

    #[error("Field {field} is not an integer: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Island distance {0} must be positive")]
    InvalidDistance(i32),
}

/// Persistence errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create directory {0}: {1}")]
    DirectoryCreate(PathBuf, IoError),

    #[error("Failed to read file {0}: {1}")]
    FileRead(PathBuf, IoError),

    #[error("Failed to create file {0}: {1}")]
    FileCreate(PathBuf, IoError),

    #[error("Failed to write to file {0}: {1}")]
    FileWrite(PathBuf, IoError),

    #[error("Failed to sync file {0}: {1}")]
    FileSync(PathBuf, IoError),

    #[error("Failed to rename file from {0} to {1}: {2}")]
    FileRename(PathBuf, PathBuf, IoError),

    #[error("Failed to serialize {0}: {1}")]
    Serialization(&'static str, serde_json::Error),

    #[error("Failed to deserialize file {0}: {1}")]
    Deserialization(PathBuf, serde_json::Error),
}

/// Coop grant and revocation errors
#[derive(Debug, Error, PartialEq)]
pub enum CoopError {
    #[error("Player {0} has no island to coop on")]
    NoIsland(PlayerId),

    #[error("Only the team leader can coop players")]
    NotLeader(PlayerId),

    #[error("Player {0} cannot coop themselves or a team member")]
    SameTeam(PlayerId),

    #[error("Player {grantee} is already coop on that island")]
    AlreadyCoop { grantee: PlayerId },

    #[error("Player {grantee} is not coop on that island")]
    NotCoop { grantee: PlayerId },

    #[error("Cancelled by listener {0}")]
    Vetoed(String),
}

/// Top-level error for the skyblock service
#[derive(Debug, Error)]
pub enum SkyblockError {
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Coop error: {0}")]
    Coop(#[from] CoopError),

    #[error("Invalid settings: {0}")]
    Settings(String),

    #[error("Cancelled by listener {0}")]
    Vetoed(String),

    #[error("Team leader {0} cannot leave a team that still has members")]
    LeaderCannotLeave(PlayerId),

    #[error("Player {0} is not in a team")]
    NotInTeam(PlayerId),
}

pub type GridResult<T> = std::result::Result<T, GridError>;
pub type StorageResult<T> = std::result::Result<T, StorageError>;
pub type Result<T> = std::result::Result<T, SkyblockError>;
