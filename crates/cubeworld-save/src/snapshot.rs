//! Conversion between the live world and a [`SaveFile`].

use cubeworld_terrain::GenerationParams;
use cubeworld_voxel::{
    Chunk, ChunkCoord, ChunkManager, ChunkManagerConfig, GrowthState, LocalPos,
    ModificationLedger, StoredChunk, WorldPos,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::payload::{FORMAT_VERSION, PlayerState, SaveConfig, SaveFile, SaveState};

/// Counters from [`import_snapshot`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Chunks installed as resident from `world`.
    pub chunks_loaded: usize,
    /// Chunk keys placed into the ledger.
    pub chunks_stored: usize,
    /// `world` entries outside the vertical range.
    pub blocks_skipped: usize,
}

/// Manager settings described by a save, falling back to `base` where absent.
///
/// Radii are clamped to the manager's limits.
pub fn manager_config(
    config: Option<&SaveConfig>,
    base: &ChunkManagerConfig,
) -> ChunkManagerConfig {
    let Some(config) = config else {
        return base.clone().clamped();
    };
    ChunkManagerConfig {
        render_radius: config.render_radius.unwrap_or(base.render_radius),
        cache_radius: config.cache_radius.unwrap_or(base.cache_radius),
        world_radius: config.world_radius.or(base.world_radius),
        seed: config.seed,
    }
    .clamped()
}

/// Captures the whole world into a payload.
///
/// Only generated resident chunks contribute to `world`; every modification
/// ledger (resident, parked or evicted) goes to `storedChunks` so player edits
/// outlive the save even for chunks that will be regenerated.
pub fn export_snapshot(
    manager: &ChunkManager,
    growth: &GrowthState,
    generation: &GenerationParams,
    player: &PlayerState,
) -> SaveFile {
    let mut file = SaveFile {
        format_version: Some(FORMAT_VERSION),
        config: Some(SaveConfig {
            seed: manager.config().seed,
            generation: generation.clone(),
            render_radius: Some(manager.config().render_radius),
            cache_radius: Some(manager.config().cache_radius),
            world_radius: manager.config().world_radius,
            ..Default::default()
        }),
        state: SaveState {
            player: player.clone(),
            growth: growth.clone(),
        },
        ..Default::default()
    };

    for (_, chunk) in manager.iter_chunks().filter(|(_, c)| c.is_generated()) {
        for (index, block) in chunk.non_air_blocks() {
            let Some(local) = LocalPos::from_index(index) else {
                continue;
            };
            let pos = chunk.coord().world_pos(local);
            file.world
                .entry(pos.x)
                .or_default()
                .entry(pos.z)
                .or_default()
                .insert(pos.y, block);
        }
    }

    for (coord, stored) in manager.persistent_state() {
        if !stored.deltas.is_empty() {
            file.stored_chunks.insert(coord, stored.deltas);
        }
        if !stored.plants.is_empty() {
            file.stored_plant_states.insert(coord, stored.plants);
        }
    }

    tracing::debug!(
        blocks = file.block_count(),
        stored_chunks = file.stored_chunks.len(),
        stored_plants = file.stored_plant_states.len(),
        "world snapshot exported"
    );
    file
}

/// Replaces the live world with the contents of `file`.
///
/// `world` blocks become resident, generated chunks; their `storedChunks`
/// entries become those chunks' modification ledgers. Files that carry no
/// `storedChunks` and no version tag have every `world` block recorded as an
/// edit instead, so nothing is lost when those chunks are evicted and
/// regenerated. Everything else goes to the ledger, except plant state for
/// resident chunks, which is merged into the live growth collections directly.
pub fn import_snapshot(
    file: SaveFile,
    manager: &mut ChunkManager,
    growth: &mut GrowthState,
) -> ImportSummary {
    let mut summary = ImportSummary::default();
    let config = manager_config(file.config.as_ref(), manager.config());
    let blocks_are_edits = file.world_blocks_are_edits();
    manager.reset(config);
    *growth = file.state.growth;

    let mut chunks: FxHashMap<ChunkCoord, Chunk> = FxHashMap::default();
    for (x, column) in file.world {
        for (z, ys) in column {
            for (y, block) in ys {
                if block.is_air() {
                    continue;
                }
                let Some((coord, local)) = WorldPos::new(x, y, z).to_chunk_local() else {
                    summary.blocks_skipped += 1;
                    continue;
                };
                chunks
                    .entry(coord)
                    .or_insert_with(|| Chunk::new(coord))
                    .set_block(local.x, local.y, local.z, block);
            }
        }
    }
    if summary.blocks_skipped > 0 {
        tracing::warn!(
            skipped = summary.blocks_skipped,
            "ignoring saved blocks outside the vertical range"
        );
    }

    let mut stored_chunks = file.stored_chunks;
    for (coord, mut chunk) in chunks {
        if blocks_are_edits {
            let edits: ModificationLedger = chunk.non_air_blocks().collect();
            chunk.apply_modifications(edits);
        } else if let Some(deltas) = stored_chunks.remove(&coord) {
            chunk.apply_modifications(deltas);
        }
        manager.insert_loaded_chunk(chunk);
        summary.chunks_loaded += 1;
    }

    let mut stored_keys = FxHashSet::default();
    for (coord, deltas) in stored_chunks {
        let captured = StoredChunk {
            deltas,
            ..Default::default()
        };
        if !captured.is_empty() && manager.store_evicted(coord, captured) {
            stored_keys.insert(coord);
        }
    }
    for (coord, plants) in file.stored_plant_states {
        if manager.is_resident(coord) {
            growth.restore(plants);
            continue;
        }
        let captured = StoredChunk {
            plants,
            ..Default::default()
        };
        if !captured.is_empty() && manager.store_evicted(coord, captured) {
            stored_keys.insert(coord);
        }
    }
    summary.chunks_stored = stored_keys.len();

    tracing::debug!(
        loaded = summary.chunks_loaded,
        stored = summary.chunks_stored,
        "world snapshot imported"
    );
    summary
}
