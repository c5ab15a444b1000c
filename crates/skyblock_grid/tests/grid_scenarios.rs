//! End-to-end scenarios through the public API.

use skyblock_grid::*;
use std::sync::{Arc, Mutex};

fn settings() -> GridSettings {
    GridSettings {
        island_distance: 200,
        protection_range: 100,
        ..GridSettings::default()
    }
}

fn at(x: i32, z: i32) -> Location {
    Location::block("skyblock", x, 120, z)
}

fn skyblock() -> Skyblock {
    Skyblock::new(settings(), CoopSettings::default(), Box::new(MemoryDirectory::new()))
        .expect("default settings are valid")
}

/// Records every committed event kind.
#[derive(Default)]
struct Journal {
    committed: Mutex<Vec<&'static str>>,
}

impl IslandListener for Journal {
    fn name(&self) -> &str {
        "journal"
    }

    fn on_commit(&self, event: &IslandEvent) {
        self.committed.lock().unwrap().push(event.kind());
    }
}

/// Refuses every ownership change.
struct NoTransfers;

impl IslandListener for NoTransfers {
    fn name(&self) -> &str {
        "no_transfers"
    }

    fn on_propose(&self, event: &IslandEvent) -> Result<(), String> {
        match event {
            IslandEvent::OwnerChange { .. } => Err("transfers are frozen".to_string()),
            _ => Ok(()),
        }
    }
}

#[test]
fn test_claim_query_delete_reclaim() {
    let mut grid = IslandGrid::new(&settings());
    let first = PlayerId::new();
    let second = PlayerId::new();

    let id = grid.claim_island(100, 100, Some(first)).unwrap();
    assert_eq!(grid.island_id_at(&at(100, 100)), Some(id));
    assert!(grid.island_at(&at(250, 100)).is_none());

    let removed = grid.delete_island(&at(100, 100)).unwrap();
    assert_eq!(removed.center_x(), 100);
    assert!(!grid.has_island(first));

    let again = grid.claim_island(100, 100, Some(second)).unwrap();
    assert_eq!(grid.island(again).unwrap().owner(), Some(second));
    assert_eq!(grid.island_owned_by(second), Some(again));
}

#[test]
fn test_coop_is_revoked_when_island_is_deleted() {
    let mut sky = skyblock();
    let journal = Arc::new(Journal::default());
    sky.register_listener(journal.clone());

    let owner = PlayerId::new();
    let guest = PlayerId::new();
    sky.claim_island(owner, &at(0, 0)).unwrap();
    sky.add_coop(owner, guest).unwrap();
    assert_eq!(sky.coop_islands(guest).len(), 1);

    sky.delete_island(&at(0, 0)).unwrap();
    assert!(sky.coop_islands(guest).is_empty());
    assert!(sky.coops().is_empty());

    let committed = journal.committed.lock().unwrap().clone();
    assert_eq!(committed, vec!["coop_join", "coop_leave"]);
}

#[test]
fn test_transfer_releases_receivers_island() {
    let mut sky = skyblock();
    let a = PlayerId::new();
    let b = PlayerId::new();
    let island_a = sky.claim_island(a, &at(0, 0)).unwrap();
    let island_x = sky.claim_island(b, &at(400, 0)).unwrap();

    sky.transfer_island(a, b).unwrap();

    assert_eq!(sky.grid().island(island_x).unwrap().owner(), None);
    assert_eq!(sky.grid().island(island_a).unwrap().owner(), Some(b));
    assert_eq!(sky.grid().island_owned_by(b), Some(island_a));
    assert!(!sky.grid().has_island(a));
    assert_eq!(sky.directory().island_location(b), Some(at(0, 0)));
    assert_eq!(sky.directory().island_location(a), None);
}

#[test]
fn test_transfer_to_team_member_keeps_the_team_on_the_island() {
    let mut sky = skyblock();
    let a = PlayerId::new();
    let b = PlayerId::new();
    let c = PlayerId::new();
    let island = sky.claim_island(a, &at(0, 0)).unwrap();
    sky.join_team(b, a).unwrap();
    sky.join_team(c, a).unwrap();

    sky.transfer_island(a, b).unwrap();

    assert_eq!(sky.grid().island(island).unwrap().owner(), Some(b));
    for player in [a, b, c] {
        assert_eq!(sky.directory().team_leader(player), Some(b));
        assert_eq!(sky.island_of(player), Some(island));
        assert!(sky.location_is_on_island(player, &at(10, 10)));
    }
    assert_eq!(sky.directory().team_members(b).len(), 3);
    assert!(sky.directory().team_members(a).is_empty());
    assert_eq!(sky.directory().island_location(b), Some(at(0, 0)));
    assert_eq!(sky.directory().team_island_location(b), None);
    assert_eq!(sky.directory().island_location(a), None);
    assert_eq!(sky.directory().team_island_location(a), Some(at(0, 0)));
    assert_eq!(sky.directory().team_island_location(c), Some(at(0, 0)));
}

#[test]
fn test_transfer_to_member_of_another_team_is_refused() {
    let mut sky = skyblock();
    let a = PlayerId::new();
    let leader = PlayerId::new();
    let member = PlayerId::new();
    let island_a = sky.claim_island(a, &at(0, 0)).unwrap();
    let island_l = sky.claim_island(leader, &at(400, 0)).unwrap();
    sky.join_team(member, leader).unwrap();

    let result = sky.transfer_island(a, member);
    assert!(matches!(
        result,
        Err(SkyblockError::Grid(GridError::TeamMemberCannotOwn(p))) if p == member
    ));
    assert_eq!(sky.grid().island_owned_by(a), Some(island_a));
    assert_eq!(sky.island_of(member), Some(island_l));
    assert_eq!(sky.directory().team_leader(member), Some(leader));
}

#[test]
fn test_vetoed_transfer_changes_nothing() {
    let mut sky = skyblock();
    sky.register_listener(Arc::new(NoTransfers));
    let a = PlayerId::new();
    let b = PlayerId::new();
    let island_a = sky.claim_island(a, &at(0, 0)).unwrap();

    let result = sky.transfer_island(a, b);
    assert!(matches!(result, Err(SkyblockError::Vetoed(name)) if name == "no_transfers"));
    assert_eq!(sky.grid().island_owned_by(a), Some(island_a));
    assert!(!sky.grid().has_island(b));
}

#[test]
fn test_deleted_island_is_cleaned_over_several_ticks() {
    struct Count(usize);
    impl ChunkRegenerator for Count {
        fn apply(&mut self, _job: &ChunkJob) -> Result<(), String> {
            self.0 += 1;
            Ok(())
        }
    }

    let mut sky = skyblock();
    sky.claim_island(PlayerId::new(), &at(0, 0)).unwrap();
    sky.delete_island(&at(0, 0)).unwrap();

    let pending = sky.cleanup_pending();
    assert_eq!(pending, 14 * 14);

    let mut regenerator = Count(0);
    let mut ticks = 0;
    while sky.cleanup_pending() > 0 {
        assert_eq!(sky.tick(&mut regenerator), 2);
        ticks += 1;
    }
    assert_eq!(regenerator.0, pending);
    assert_eq!(ticks, pending / 2);
}

#[tokio::test]
async fn test_save_and_load_through_json_storage() {
    let dir = tempfile::tempdir().unwrap();
    let storage = JsonGridStorage::new(dir.path().to_path_buf());

    let owner = PlayerId::new();
    let guest = PlayerId::new();
    {
        let mut sky = skyblock();
        let id = sky.claim_island(owner, &at(200, 200)).unwrap();
        sky.island_mut(id).unwrap().set_flag(SettingsFlag::Chest, true);
        sky.add_coop(owner, guest).unwrap();
        sky.save(&storage).await.unwrap();
    }

    let (sky, report) = Skyblock::load(
        settings(),
        CoopSettings::default(),
        Box::new(MemoryDirectory::new()),
        &storage,
    )
    .await
    .unwrap();

    assert_eq!(report.loaded, 1);
    let island = sky.island_at(&at(210, 190)).unwrap();
    assert_eq!(island.owner(), Some(owner));
    assert!(island.flag(SettingsFlag::Chest, &sky.settings().default_flags));
    assert!(sky.is_allowed(guest, &at(200, 200), SettingsFlag::BreakBlocks));
}

#[tokio::test]
async fn test_load_from_other_world_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let storage = JsonGridStorage::new(dir.path().to_path_buf());

    let mut sky = skyblock();
    sky.claim_island(PlayerId::new(), &at(0, 0)).unwrap();
    sky.save(&storage).await.unwrap();

    let other = GridSettings {
        world: "other_world".to_string(),
        nether_world: None,
        ..settings()
    };
    let (sky, report) = Skyblock::load(
        other,
        CoopSettings::default(),
        Box::new(MemoryDirectory::new()),
        &storage,
    )
    .await
    .unwrap();

    assert_eq!(report, LoadReport::default());
    assert!(sky.grid().is_empty());
    assert!(storage.backup_path().exists());
    assert!(!storage.grid_path().exists());
}
