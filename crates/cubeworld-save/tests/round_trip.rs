//! Save/load through real files.

use std::fs;

use cubeworld_save::{
    FORMAT_VERSION, PlayerState, SaveError, SaveFormat, export_snapshot, load_from_path,
    save_to_path,
};
use cubeworld_terrain::{GenerationParams, HeightmapPopulator, SyncPipeline};
use cubeworld_voxel::{
    BlockCatalog, BlockId, ChunkCoord, ChunkManager, ChunkManagerConfig, EventBus, GrowthState,
    GrowthTimer, MeshHandle, PlantStructure, WorldEvent, WorldPos,
};

fn config() -> ChunkManagerConfig {
    ChunkManagerConfig {
        render_radius: 1,
        cache_radius: 2,
        world_radius: None,
        seed: 2024,
    }
}

fn no_teardown() -> impl FnMut(ChunkCoord, MeshHandle) {
    |_, _| {}
}

#[test]
fn test_full_round_trip_preserves_world() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("saves").join("world.json");

    let params = GenerationParams::default();
    let mut pipeline = SyncPipeline::new(HeightmapPopulator::new(params.clone()), BlockCatalog::standard());
    let mut renderer = no_teardown();
    let mut mgr = ChunkManager::new(config());
    let mut growth = GrowthState::new();

    mgr.update_visible_chunks(0.0, 0.0, &mut pipeline, &mut renderer, &mut growth, None);
    assert!(mgr.set_block(3, 110, 3, BlockId(5), true));
    let far_plant = WorldPos::new(4, 90, 4);
    growth.plant_structures.insert(
        far_plant,
        PlantStructure {
            species: "oak".to_string(),
            stage: 3,
            blocks: vec![far_plant],
        },
    );

    // Leave so chunk (0, 0) and its plant end up in the ledger.
    mgr.update_visible_chunks(2000.0, 0.0, &mut pipeline, &mut renderer, &mut growth, None);
    assert!(mgr.set_block(2001, 111, 2, BlockId::WOOD, true));
    let live_timer = WorldPos::new(2003, 90, 5);
    growth.growth_timers.insert(
        live_timer,
        GrowthTimer {
            species: "oak".to_string(),
            ticks_remaining: 17,
        },
    );

    let player = PlayerState {
        position: [2000.0, 80.0, 0.0],
        ..Default::default()
    };
    let file = export_snapshot(&mgr, &growth, &params, &player);
    save_to_path(&path, &file).unwrap();

    let mut loaded = ChunkManager::new(ChunkManagerConfig::default());
    let mut loaded_growth = GrowthState::new();
    let mut events = EventBus::new();
    let reset = events.subscribe();
    let report = load_from_path(&path, &mut loaded, &mut loaded_growth, &mut events).unwrap();

    assert_eq!(report.format, SaveFormat::Tagged(FORMAT_VERSION));
    assert_eq!(report.player, player);
    assert_eq!(report.generation, Some(params.clone()));
    assert_eq!(reset.try_recv(), Ok(WorldEvent::Reset { seed: 2024 }));
    assert_eq!(loaded.config(), mgr.config());

    assert_eq!(loaded.get_block(2001, 111, 2), BlockId::WOOD);
    assert_eq!(loaded.get_block(2001, 0, 2), BlockId::BEDROCK);
    assert_eq!(loaded_growth.growth_timers.get(&live_timer).map(|t| t.ticks_remaining), Some(17));
    assert!(!loaded_growth.plant_structures.contains_key(&far_plant));
    assert!(loaded.ledger().contains(ChunkCoord::new(0, 0)));

    // Returning home regenerates the chunk and restores both edit and plant.
    let mut pipeline = SyncPipeline::new(HeightmapPopulator::new(params), BlockCatalog::standard());
    loaded.update_visible_chunks(0.0, 0.0, &mut pipeline, &mut renderer, &mut loaded_growth, None);
    assert_eq!(loaded.get_block(3, 110, 3), BlockId(5));
    assert!(loaded_growth.plant_structures.contains_key(&far_plant));
}

#[test]
fn test_legacy_world_file_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("old.json");
    fs::write(&path, r#"{"-1":{"16":{"20":3,"21":7}},"5":{"5":{"0":8}}}"#).unwrap();

    let mut mgr = ChunkManager::new(config());
    let mut growth = GrowthState::new();
    let mut events = EventBus::new();
    let report = load_from_path(&path, &mut mgr, &mut growth, &mut events).unwrap();

    assert_eq!(report.format, SaveFormat::LegacyWorld);
    assert_eq!(report.summary.chunks_loaded, 2);
    assert_eq!(mgr.get_block(-1, 20, 16), BlockId::GRASS);
    assert_eq!(mgr.get_block(-1, 21, 16), BlockId::LEAVES);
    assert_eq!(mgr.get_block(5, 0, 5), BlockId::BEDROCK);
    assert!(mgr.chunk(ChunkCoord::new(-1, 1)).unwrap().is_generated());
    // Legacy files carry no config; the current settings are kept.
    assert_eq!(mgr.config(), &config());
    assert_eq!(report.generation, None);
}

#[test]
fn test_legacy_blocks_survive_eviction() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("old.json");
    fs::write(&path, r#"{"160":{"0":{"120":6}}}"#).unwrap();

    let mut mgr = ChunkManager::new(config());
    let mut growth = GrowthState::new();
    load_from_path(&path, &mut mgr, &mut growth, &mut EventBus::new()).unwrap();
    assert_eq!(mgr.get_block(160, 120, 0), BlockId::WOOD);

    let mut pipeline = SyncPipeline::new(HeightmapPopulator::default(), BlockCatalog::standard());
    let mut renderer = no_teardown();
    mgr.update_visible_chunks(0.0, 0.0, &mut pipeline, &mut renderer, &mut growth, None);
    assert!(!mgr.is_resident(ChunkCoord::new(10, 0)));
    assert!(mgr.ledger().contains(ChunkCoord::new(10, 0)));

    mgr.update_visible_chunks(160.0, 0.0, &mut pipeline, &mut renderer, &mut growth, None);
    assert!(mgr.chunk(ChunkCoord::new(10, 0)).unwrap().is_generated());
    assert_eq!(mgr.get_block(160, 120, 0), BlockId::WOOD);
}

#[test]
fn test_untagged_payload_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v1.json");
    fs::write(
        &path,
        r#"{
            "config": { "seed": 77, "version": "0.0.9", "seaLevel": 40 },
            "state": { "position": [1.0, 2.0, 3.0], "onGround": true },
            "world": { "0": { "0": { "1": 1 } } },
            "storedChunks": { "3,3": { "5": 6 } }
        }"#,
    )
    .unwrap();

    let mut mgr = ChunkManager::new(config());
    let mut growth = GrowthState::new();
    let report = load_from_path(&path, &mut mgr, &mut growth, &mut EventBus::new()).unwrap();
    assert_eq!(report.format, SaveFormat::Untagged);
    assert_eq!(report.generation.map(|g| g.sea_level), Some(40));
    assert_eq!(report.player.position, [1.0, 2.0, 3.0]);
    assert!(report.player.on_ground);
    assert_eq!(mgr.config().seed, 77);
    assert!(mgr.ledger().contains(ChunkCoord::new(3, 3)));
}

#[test]
fn test_unrelated_json_is_rejected_without_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, r#"{"theme":"dark","volume":0.4}"#).unwrap();

    let mut mgr = ChunkManager::new(config());
    mgr.set_block(0, 10, 0, BlockId::STONE, true);
    let mut growth = GrowthState::new();
    let mut events = EventBus::new();
    let reset = events.subscribe();

    let result = load_from_path(&path, &mut mgr, &mut growth, &mut events);
    assert!(matches!(result, Err(SaveError::UnrecognizedShape)));
    assert_eq!(mgr.get_block(0, 10, 0), BlockId::STONE);
    assert!(reset.try_recv().is_err());
}

#[test]
fn test_future_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.json");
    fs::write(&path, r#"{"formatVersion":9,"world":{}}"#).unwrap();
    let result = load_from_path(
        &path,
        &mut ChunkManager::default(),
        &mut GrowthState::new(),
        &mut EventBus::new(),
    );
    assert!(matches!(result, Err(SaveError::UnsupportedVersion(9))));
}

#[test]
fn test_out_of_range_parameters_are_clamped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wild.json");
    fs::write(
        &path,
        r#"{"formatVersion":2,"config":{"seed":1,"octaves":90,"amplitude":-4.0,"renderRadius":4000},"world":{}}"#,
    )
    .unwrap();

    let mut mgr = ChunkManager::default();
    let report =
        load_from_path(&path, &mut mgr, &mut GrowthState::new(), &mut EventBus::new()).unwrap();
    let generation = report.generation.unwrap();
    assert!(generation.is_within_bounds());
    assert_eq!(generation.octaves, 8);
    assert_eq!(generation.amplitude, 0.0);
    assert_eq!(mgr.config().render_radius, cubeworld_voxel::MAX_RADIUS);
}

#[test]
fn test_missing_file_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_from_path(
        &dir.path().join("absent.json"),
        &mut ChunkManager::default(),
        &mut GrowthState::new(),
        &mut EventBus::new(),
    );
    assert!(matches!(result, Err(SaveError::Read { .. })));
}
