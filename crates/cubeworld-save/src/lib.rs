//! JSON save files for the chunked world: payload types, format detection,
//! snapshot export/import and file I/O.

mod error;
mod format;
mod payload;
mod snapshot;

use std::path::Path;

use cubeworld_terrain::GenerationParams;
use cubeworld_voxel::{ChunkManager, EventBus, GrowthState, WorldEvent};

pub use error::SaveError;
pub use format::{SaveFormat, detect_format, looks_like_world, parse_save};
pub use payload::{
    FORMAT_VERSION, InventorySlot, PlayerState, SaveConfig, SaveFile, SaveState, WorldBlocks,
};
pub use snapshot::{ImportSummary, export_snapshot, import_snapshot, manager_config};

/// What a successful load produced besides the world itself.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadReport {
    pub format: SaveFormat,
    pub summary: ImportSummary,
    /// Generation parameters after clamping; rebuild the populator from these.
    /// `None` when the file has no config section and the current parameters
    /// still apply.
    pub generation: Option<GenerationParams>,
    pub player: PlayerState,
}

/// Writes `file` as compact JSON, creating parent directories as needed.
pub fn save_to_path(path: &Path, file: &SaveFile) -> Result<(), SaveError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| SaveError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string(file)?;
    std::fs::write(path, json).map_err(|source| SaveError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), blocks = file.block_count(), "world saved");
    Ok(())
}

/// Reads and parses a save file of any supported format.
pub fn read_save(path: &Path) -> Result<(SaveFile, SaveFormat), SaveError> {
    let text = std::fs::read_to_string(path).map_err(|source| SaveError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_save(&text)
}

/// Loads `path` into `manager` and `growth`, then broadcasts
/// [`WorldEvent::Reset`].
///
/// On error nothing in memory is touched.
pub fn load_from_path(
    path: &Path,
    manager: &mut ChunkManager,
    growth: &mut GrowthState,
    events: &mut EventBus,
) -> Result<LoadReport, SaveError> {
    let (file, format) = read_save(path)?;
    let generation = file.config.as_ref().map(|c| c.generation.clamped());
    let player = file.state.player.clone();
    let summary = import_snapshot(file, manager, growth);
    let seed = manager.config().seed;

    tracing::info!(
        path = %path.display(),
        ?format,
        seed,
        chunks = summary.chunks_loaded,
        "world loaded"
    );
    events.dispatch(WorldEvent::Reset { seed });

    Ok(LoadReport {
        format,
        summary,
        generation,
        player,
    })
}
