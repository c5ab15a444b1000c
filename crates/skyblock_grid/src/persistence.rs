//! Grid persistence.
//!
//! The grid is saved as one JSON document per island world. Each island is a
//! record line (see [`crate::island`]) plus the metadata the line format has
//! no room for. The `settings_key` list names the flag behind each bit of the
//! record bitstrings, in the order they were written.
//!
//! Coop grants live in a second document, see [`crate::coop`].
//!
//! [`JsonGridStorage`] writes to a temporary file, syncs it, then renames it
//! over the previous version so a crash never leaves a torn file behind.

use crate::config::GridSettings;
use crate::coop::CoopDocument;
use crate::error::StorageError;
use crate::flags::{FlagDefaults, SettingsFlag};
use crate::grid::IslandGrid;
use crate::island::Island;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::{fs as tokio_fs, io::AsyncWriteExt};
use tracing::{debug, error, info, instrument, warn};

/// Current document format version.
pub const GRID_DOCUMENT_VERSION: u32 = 1;

const GRID_FILE: &str = "islands.json";
const GRID_BACKUP_FILE: &str = "islands_backup.json";
const COOP_FILE: &str = "coops.json";

/// One regular island.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IslandEntry {
    pub record: String,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The spawn island. Spawn record lines carry no flags, so they sit beside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnEntry {
    pub record: String,
    #[serde(default)]
    pub settings: String,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
}

/// Persisted form of an [`IslandGrid`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridDocument {
    pub version: u32,
    pub world: String,
    pub settings_key: Vec<String>,
    #[serde(default)]
    pub spawn: Option<SpawnEntry>,
    #[serde(default)]
    pub islands: Vec<IslandEntry>,
}

/// Counts from restoring a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    /// Records that could not be parsed.
    pub skipped: usize,
    /// Records refused because they overlap an earlier one.
    pub conflicts: usize,
}

impl GridDocument {
    /// Captures the grid. Unset flags are written with the current defaults.
    pub fn from_grid(grid: &IslandGrid, defaults: &FlagDefaults) -> Self {
        let mut spawn = None;
        let mut islands = Vec::with_capacity(grid.len());
        for (_, island) in grid.islands() {
            if island.is_spawn() {
                spawn = Some(SpawnEntry {
                    record: island.to_record(defaults),
                    settings: island.flag_bits(defaults),
                    created_at: island.created_at(),
                    updated_at: island.updated_at(),
                });
            } else {
                islands.push(IslandEntry {
                    record: island.to_record(defaults),
                    created_at: island.created_at(),
                    updated_at: island.updated_at(),
                    name: island.name().map(str::to_string),
                });
            }
        }
        Self {
            version: GRID_DOCUMENT_VERSION,
            world: grid.world().to_string(),
            settings_key: SettingsFlag::settings_key(),
            spawn,
            islands,
        }
    }

    /// Rebuilds a grid. Bad records are skipped and the rest still load.
    pub fn restore(&self, settings: &GridSettings) -> (IslandGrid, LoadReport) {
        let mut grid = IslandGrid::new(settings);
        let mut report = LoadReport::default();

        if self.version > GRID_DOCUMENT_VERSION {
            warn!(
                "⚠️ Island document version {} is newer than {}, loading what can be read",
                self.version, GRID_DOCUMENT_VERSION
            );
        }

        if let Some(spawn) = &self.spawn {
            match Island::from_record(&settings.world, &spawn.record, &self.settings_key) {
                Ok(mut island) if island.is_spawn() => {
                    island.apply_flag_bits(&spawn.settings, &self.settings_key);
                    restore_timestamps(&mut island, spawn.created_at, spawn.updated_at);
                    register(&mut grid, island, &mut report);
                }
                Ok(_) => {
                    warn!("⚠️ Spawn entry is not a spawn record, ignoring it");
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!("⚠️ Could not read spawn record {:?}: {}", spawn.record, e);
                    report.skipped += 1;
                }
            }
        }

        for entry in &self.islands {
            match Island::from_record(&settings.world, &entry.record, &self.settings_key) {
                Ok(mut island) => {
                    restore_timestamps(&mut island, entry.created_at, entry.updated_at);
                    if entry.name.is_some() {
                        island.set_name(entry.name.clone());
                        restore_timestamps(&mut island, entry.created_at, entry.updated_at);
                    }
                    register(&mut grid, island, &mut report);
                }
                Err(e) => {
                    warn!("⚠️ Could not read island record {:?}: {}", entry.record, e);
                    report.skipped += 1;
                }
            }
        }

        info!(
            "📦 Loaded {} islands ({} skipped, {} conflicts)",
            report.loaded, report.skipped, report.conflicts
        );
        (grid, report)
    }
}

fn restore_timestamps(island: &mut Island, created_at: u64, updated_at: u64) {
    if created_at > 0 {
        island.set_timestamps(created_at, updated_at.max(created_at));
    }
}

fn register(grid: &mut IslandGrid, island: Island, report: &mut LoadReport) {
    match grid.insert_island(island) {
        Ok(_) => report.loaded += 1,
        Err(_) => report.conflicts += 1,
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Durable store for the grid and coop documents.
#[async_trait]
pub trait GridStorage: Send + Sync + std::fmt::Debug {
    /// Load the grid document, `None` when nothing has been saved yet
    async fn load_grid(&self) -> Result<Option<GridDocument>, StorageError>;

    /// Save the grid document
    async fn save_grid(&self, document: &GridDocument) -> Result<(), StorageError>;

    /// Move the current grid document aside so it is not overwritten
    async fn backup_grid(&self) -> Result<(), StorageError>;

    /// Load coop grants, empty when nothing has been saved yet
    async fn load_coops(&self) -> Result<CoopDocument, StorageError>;

    /// Save coop grants
    async fn save_coops(&self, document: &CoopDocument) -> Result<(), StorageError>;
}

/// JSON files in a data directory.
#[derive(Debug, Clone)]
pub struct JsonGridStorage {
    data_dir: PathBuf,
}

impl JsonGridStorage {
    /// Create storage rooted at `data_dir`, creating the directory if needed.
    pub fn new(data_dir: PathBuf) -> Self {
        if !data_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(&data_dir) {
                error!("Failed to create data directory {}: {}", data_dir.display(), e);
            }
        }
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn grid_path(&self) -> PathBuf {
        self.data_dir.join(GRID_FILE)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.data_dir.join(GRID_BACKUP_FILE)
    }

    pub fn coop_path(&self) -> PathBuf {
        self.data_dir.join(COOP_FILE)
    }

    async fn read_optional(&self, path: &Path) -> Result<Option<String>, StorageError> {
        match tokio_fs::read_to_string(path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::FileRead(path.to_path_buf(), e)),
        }
    }

    #[instrument(skip(self, contents))]
    async fn write_atomic(&self, path: &Path, contents: &str) -> Result<(), StorageError> {
        if !self.data_dir.exists() {
            tokio_fs::create_dir_all(&self.data_dir)
                .await
                .map_err(|e| StorageError::DirectoryCreate(self.data_dir.clone(), e))?;
        }
        let temp_path = path.with_extension("tmp");

        let mut file = tokio_fs::File::create(&temp_path)
            .await
            .map_err(|e| StorageError::FileCreate(temp_path.clone(), e))?;

        file.write_all(contents.as_bytes())
            .await
            .map_err(|e| StorageError::FileWrite(temp_path.clone(), e))?;

        file.sync_all()
            .await
            .map_err(|e| StorageError::FileSync(temp_path.clone(), e))?;

        // Atomic rename
        tokio_fs::rename(&temp_path, path)
            .await
            .map_err(|e| StorageError::FileRename(temp_path, path.to_path_buf(), e))?;

        Ok(())
    }
}

#[async_trait]
impl GridStorage for JsonGridStorage {
    #[instrument(skip(self))]
    async fn load_grid(&self) -> Result<Option<GridDocument>, StorageError> {
        let path = self.grid_path();
        let Some(contents) = self.read_optional(&path).await? else {
            debug!("No island document at {}", path.display());
            return Ok(None);
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StorageError::Deserialization(path, e))
    }

    #[instrument(skip(self, document))]
    async fn save_grid(&self, document: &GridDocument) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(document)
            .map_err(|e| StorageError::Serialization("island grid", e))?;
        self.write_atomic(&self.grid_path(), &json).await?;
        info!("💾 Saved {} islands", document.islands.len());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn backup_grid(&self) -> Result<(), StorageError> {
        let path = self.grid_path();
        let backup = self.backup_path();
        if !path.exists() {
            return Ok(());
        }
        tokio_fs::rename(&path, &backup)
            .await
            .map_err(|e| StorageError::FileRename(path, backup.clone(), e))?;
        warn!("📦 Island document moved to {}", backup.display());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_coops(&self) -> Result<CoopDocument, StorageError> {
        let path = self.coop_path();
        let Some(contents) = self.read_optional(&path).await? else {
            return Ok(CoopDocument::new());
        };
        serde_json::from_str(&contents).map_err(|e| StorageError::Deserialization(path, e))
    }

    #[instrument(skip(self, document))]
    async fn save_coops(&self, document: &CoopDocument) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(document)
            .map_err(|e| StorageError::Serialization("coop grants", e))?;
        self.write_atomic(&self.coop_path(), &json).await?;
        debug!("Saved coop grants for {} grantors", document.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Location, PlayerId};

    fn settings() -> GridSettings {
        GridSettings::default()
    }

    fn sample_grid() -> (IslandGrid, PlayerId) {
        let owner = PlayerId::new();
        let mut grid = IslandGrid::new(&settings());
        let id = grid.claim_island(0, 0, Some(owner)).unwrap();
        grid.island_mut(id)
            .unwrap()
            .set_flag(SettingsFlag::Pvp, true);
        grid.set_island_name(owner, Some("Home".to_string()));
        grid.claim_island(400, 0, None).unwrap();
        let spawn = grid.claim_island(-400, 0, None).unwrap();
        grid.set_spawn(spawn).unwrap();
        grid.set_spawn_point(Location::block("skyblock", -400, 121, 0));
        (grid, owner)
    }

    #[test]
    fn test_document_round_trip() {
        let defaults = FlagDefaults::default();
        let (grid, owner) = sample_grid();
        let document = GridDocument::from_grid(&grid, &defaults);

        assert_eq!(document.version, GRID_DOCUMENT_VERSION);
        assert_eq!(document.islands.len(), 2);
        assert!(document.spawn.is_some());
        assert_eq!(document.settings_key.len(), crate::flags::FLAG_COUNT);

        let (restored, report) = document.restore(&settings());
        assert_eq!(report, LoadReport { loaded: 3, skipped: 0, conflicts: 0 });
        assert_eq!(restored.island_count(), 1);
        assert_eq!(restored.island_name(owner), Some("Home"));

        let id = restored.island_owned_by(owner).unwrap();
        let island = restored.island(id).unwrap();
        assert!(island.flag(SettingsFlag::Pvp, &defaults));
        assert_eq!(
            restored.spawn_point(),
            Some(Location::block("skyblock", -400, 121, 0))
        );

        assert_eq!(GridDocument::from_grid(&restored, &defaults), document);
    }

    #[test]
    fn test_restore_skips_bad_and_conflicting_records() {
        let document = GridDocument {
            version: GRID_DOCUMENT_VERSION,
            world: "skyblock".to_string(),
            settings_key: SettingsFlag::settings_key(),
            spawn: None,
            islands: vec![
                IslandEntry {
                    record: "0:120:0:100:200:null:false:false".to_string(),
                    created_at: 0,
                    updated_at: 0,
                    name: None,
                },
                IslandEntry {
                    record: "broken".to_string(),
                    created_at: 0,
                    updated_at: 0,
                    name: None,
                },
                IslandEntry {
                    record: "50:120:0:100:200:null:false:false".to_string(),
                    created_at: 0,
                    updated_at: 0,
                    name: None,
                },
            ],
        };
        let (grid, report) = document.restore(&settings());
        assert_eq!(report, LoadReport { loaded: 1, skipped: 1, conflicts: 1 });
        assert_eq!(grid.len(), 1);
    }

    #[tokio::test]
    async fn test_json_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonGridStorage::new(dir.path().join("data"));
        assert!(storage.load_grid().await.unwrap().is_none());
        assert!(storage.load_coops().await.unwrap().is_empty());

        let (grid, _) = sample_grid();
        let document = GridDocument::from_grid(&grid, &FlagDefaults::default());
        storage.save_grid(&document).await.unwrap();
        assert!(!storage.grid_path().with_extension("tmp").exists());

        let loaded = storage.load_grid().await.unwrap().unwrap();
        assert_eq!(loaded, document);

        let mut coops = CoopDocument::new();
        coops.insert(
            PlayerId::new().to_string(),
            vec![format!("skyblock:0:120:0:0:0|{}", PlayerId::new())],
        );
        storage.save_coops(&coops).await.unwrap();
        assert_eq!(storage.load_coops().await.unwrap(), coops);
    }

    #[tokio::test]
    async fn test_backup_moves_document() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonGridStorage::new(dir.path().to_path_buf());
        storage.backup_grid().await.unwrap();

        let (grid, _) = sample_grid();
        storage
            .save_grid(&GridDocument::from_grid(&grid, &FlagDefaults::default()))
            .await
            .unwrap();
        storage.backup_grid().await.unwrap();
        assert!(!storage.grid_path().exists());
        assert!(storage.backup_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonGridStorage::new(dir.path().to_path_buf());
        tokio_fs::write(storage.grid_path(), "{ not json").await.unwrap();
        assert!(matches!(
            storage.load_grid().await,
            Err(StorageError::Deserialization(_, _))
        ));
    }
}
