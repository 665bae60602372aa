//! Headless cubeworld driver.
//!
//! Loads (or creates) a world, walks the player away from a fresh edit until
//! its chunk is evicted, walks back, checks that the edit and the sapling next
//! to it were restored, and writes the world to the configured save file.

mod session;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use cubeworld_config::{CliArgs, Config, default_config_dir};
use cubeworld_save::{PlayerState, SaveError, export_snapshot, load_from_path, save_to_path};
use cubeworld_terrain::{
    AsyncPipeline, GenerationParams, HeightmapPopulator, PipelineError, SyncPipeline,
    default_worker_count,
};
use cubeworld_voxel::{
    BlockCatalog, BlockId, CHUNK_SIZE_X, ChunkManager, EventBus, GenerationPipeline, GrowthState,
    GrowthTimer, MAX_Y, PlantStructure, WorldPos,
};
use tracing::{error, info, warn};

use session::Session;

/// Upper bound on ticks spent waiting for a render zone to generate.
const SETTLE_TICKS: u32 = 2_000;
/// Blocks moved per tick while walking.
const WALK_STEP: f64 = 4.0;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("no buildable surface at ({x}, {z})")]
    NoSurface { x: i32, z: i32 },
    #[error("edit at {0} was lost across eviction")]
    EditLost(WorldPos),
}

fn build_pipeline(
    config: &Config,
    generation: GenerationParams,
) -> Result<Box<dyn GenerationPipeline>, PipelineError> {
    let populator = HeightmapPopulator::new(generation);
    let catalog = BlockCatalog::standard();
    if !config.pipeline.threaded {
        info!("generating chunks inline");
        return Ok(Box::new(SyncPipeline::new(populator, catalog)));
    }
    let workers = match config.pipeline.worker_threads {
        0 => default_worker_count(),
        n => n,
    };
    let pipeline = AsyncPipeline::new(
        populator,
        catalog,
        workers,
        config.pipeline.max_queued,
        config.pipeline.result_capacity,
    )?;
    info!(workers, "generating chunks on worker threads");
    Ok(Box::new(pipeline))
}

/// Places a wood block on the surface near the player, with a sapling on
/// top. Returns both positions.
fn place_marker(session: &mut Session) -> Result<(WorldPos, WorldPos), DemoError> {
    let x = session.position[0].floor() as i32 + 3;
    let z = session.position[2].floor() as i32 + 3;
    let y = session
        .surface_y(x, z)
        .map(|top| top + 1)
        .filter(|&y| y + 1 < MAX_Y)
        .ok_or(DemoError::NoSurface { x, z })?;

    let marker = WorldPos::new(x, y, z);
    if !session.manager.set_block(x, y, z, BlockId::WOOD, true) {
        return Err(DemoError::NoSurface { x, z });
    }

    let sapling = WorldPos::new(x, y + 1, z);
    session.growth.plant_structures.insert(
        sapling,
        PlantStructure {
            species: "oak".to_string(),
            stage: 0,
            blocks: vec![sapling],
        },
    );
    session.growth.growth_timers.insert(
        sapling,
        GrowthTimer {
            species: "oak".to_string(),
            ticks_remaining: 600,
        },
    );
    info!(%marker, %sapling, "placed marker");
    Ok((marker, sapling))
}

fn run(config: &Config, config_dir: &Path) -> Result<(), DemoError> {
    let save_path = config.save_path(config_dir);
    let mut manager = ChunkManager::new(config.manager_config());
    let mut growth = GrowthState::new();
    let mut events = EventBus::new();
    let world_events = events.subscribe();

    let (generation, player) = if config.save.load_on_start && save_path.exists() {
        let report = load_from_path(&save_path, &mut manager, &mut growth, &mut events)?;
        info!(
            format = ?report.format,
            chunks = report.summary.chunks_loaded,
            stored = report.summary.chunks_stored,
            "resuming saved world"
        );
        let generation = report
            .generation
            .unwrap_or_else(|| config.generation_params());
        (generation, report.player)
    } else {
        (config.generation_params(), PlayerState::default())
    };
    for event in world_events.try_iter() {
        info!(?event, "world event");
    }

    let pipeline = build_pipeline(config, generation.clone())?;
    let mut session = Session::new(manager, growth, pipeline, player.position);

    let ticks = session.settle(SETTLE_TICKS);
    info!(ticks, resident = session.manager.loaded_count(), "spawn area ready");

    let (marker, sapling) = place_marker(&mut session)?;
    let home = session.position;
    let away = f64::from(session.manager.config().cache_radius + 2) * CHUNK_SIZE_X as f64;

    session.walk_to(home[0] + away, home[2], WALK_STEP);
    session.settle(SETTLE_TICKS);
    info!(
        parked = session.manager.ledger().contains(marker.chunk()),
        stored_deltas = session.manager.ledger().delta_count(),
        stored_plants = session.manager.ledger().plant_count(),
        "walked away"
    );

    session.walk_to(home[0], home[2], WALK_STEP);
    let ticks = session.settle(SETTLE_TICKS);
    // Plant state comes back one tick after the chunk is generated.
    session.tick();
    info!(ticks, "returned home");

    if session.manager.get_block(marker.x, marker.y, marker.z) != BlockId::WOOD {
        return Err(DemoError::EditLost(marker));
    }
    if session.growth.plant_structures.contains_key(&sapling) {
        info!(%marker, "edit and sapling survived eviction");
    } else {
        warn!(%sapling, "sapling was not restored");
    }
    info!(
        built = session.meshes.built,
        released = session.meshes.released,
        live = session.meshes.live_count(),
        "mesh activity"
    );

    let player = PlayerState {
        position: session.position,
        ..player
    };
    let file = export_snapshot(&session.manager, &session.growth, &generation, &player);
    save_to_path(&save_path, &file)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = match args.config.clone() {
        Some(dir) => dir,
        None => match default_config_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
    };

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    cubeworld_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    match run(&config, &config_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

// ---- Tests ----
