//! Serialized shape of a save file.
//!
//! ```text
//! {
//!   "formatVersion": 2,
//!   "config": { "seed", "version", ...generation params, radii },
//!   "state": { "position", "velocity", "onGround", "inventory",
//!              "selectedBlock", "plantStructures", "growthTimers" },
//!   "world": { "<x>": { "<z>": { "<y>": blockId } } },
//!   "storedChunks": { "<cx,cz>": { "<localIndex>": blockId } },
//!   "storedPlantStates": { "<cx,cz>": { "structures", "timers" } }
//! }
//! ```
//!
//! Air is never written to `world`.

use std::collections::BTreeMap;

use cubeworld_terrain::GenerationParams;
use cubeworld_voxel::{BlockId, ChunkCoord, GrowthState, ModificationLedger, StoredPlantState};
use serde::{Deserialize, Serialize};

/// Schema version written by this build.
pub const FORMAT_VERSION: u64 = 2;

/// Non-air blocks by world x, then z, then y.
pub type WorldBlocks = BTreeMap<i32, BTreeMap<i32, BTreeMap<i32, BlockId>>>;

/// Complete save payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFile {
    /// Absent in files written before the tag existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_version: Option<u64>,
    /// Absent in legacy world-only files; the running settings then stay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SaveConfig>,
    #[serde(default)]
    pub state: SaveState,
    #[serde(default)]
    pub world: WorldBlocks,
    #[serde(default)]
    pub stored_chunks: BTreeMap<ChunkCoord, ModificationLedger>,
    #[serde(default)]
    pub stored_plant_states: BTreeMap<ChunkCoord, StoredPlantState>,
}

impl SaveFile {
    /// Number of non-air blocks in `world`.
    pub fn block_count(&self) -> usize {
        self.world
            .values()
            .flat_map(|column| column.values())
            .map(|ys| ys.len())
            .sum()
    }

    /// Whether every block in `world` counts as a player edit.
    ///
    /// Files with neither a version tag nor `storedChunks` never separated
    /// edits from generated terrain, so their blocks must survive eviction
    /// the same way edits do.
    pub fn world_blocks_are_edits(&self) -> bool {
        self.format_version.is_none() && self.stored_chunks.is_empty()
    }
}

/// World parameters needed to regenerate identical terrain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SaveConfig {
    pub seed: u64,
    /// Version of the program that wrote the file.
    pub version: String,
    #[serde(flatten)]
    pub generation: GenerationParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_radius: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_radius: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world_radius: Option<u32>,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            version: env!("CARGO_PKG_VERSION").to_string(),
            generation: GenerationParams::default(),
            render_radius: None,
            cache_radius: None,
            world_radius: None,
        }
    }
}

/// One inventory slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySlot {
    pub block: BlockId,
    pub count: u32,
}

/// Player state owned by the simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerState {
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub on_ground: bool,
    pub inventory: Vec<InventorySlot>,
    pub selected_block: BlockId,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            position: [0.0, 80.0, 0.0],
            velocity: [0.0; 3],
            on_ground: false,
            inventory: Vec::new(),
            selected_block: BlockId::STONE,
        }
    }
}

/// The `state` section: player fields and live growth side by side.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    #[serde(flatten)]
    pub player: PlayerState,
    #[serde(flatten)]
    pub growth: GrowthState,
}
