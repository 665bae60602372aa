//! Live plant-growth collections and per-chunk extraction/restoration.
//!
//! The growth simulation owns the values; this layer only moves entries in
//! and out by world key when chunks are evicted or reloaded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::coords::{ChunkCoord, WorldPos};

/// A plant placed in the world, keyed by its root position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantStructure {
    pub species: String,
    /// Current growth stage, starting at 0 for a sapling.
    pub stage: u8,
    /// Positions occupied by the plant's blocks.
    #[serde(default)]
    pub blocks: Vec<WorldPos>,
}

/// Countdown until a plant advances to its next stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthTimer {
    pub species: String,
    pub ticks_remaining: u32,
}

/// Growth entries captured from one chunk footprint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPlantState {
    #[serde(default)]
    pub structures: BTreeMap<WorldPos, PlantStructure>,
    #[serde(default)]
    pub timers: BTreeMap<WorldPos, GrowthTimer>,
}

impl StoredPlantState {
    pub fn is_empty(&self) -> bool {
        self.structures.is_empty() && self.timers.is_empty()
    }

    /// Folds `other` into `self`; entries in `other` win on key collisions.
    pub fn merge(&mut self, other: StoredPlantState) {
        self.structures.extend(other.structures);
        self.timers.extend(other.timers);
    }
}

/// The live collections simulated by the growth system.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthState {
    #[serde(default)]
    pub plant_structures: BTreeMap<WorldPos, PlantStructure>,
    #[serde(default)]
    pub growth_timers: BTreeMap<WorldPos, GrowthTimer>,
}

impl GrowthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.plant_structures.is_empty() && self.growth_timers.is_empty()
    }

    /// Removes and returns every entry whose key lies in `coord`'s footprint.
    pub fn extract_chunk(&mut self, coord: ChunkCoord) -> StoredPlantState {
        let inside = |pos: &WorldPos| coord.contains_column(pos.x, pos.z);

        let structure_keys: Vec<WorldPos> =
            self.plant_structures.keys().copied().filter(inside).collect();
        let timer_keys: Vec<WorldPos> = self.growth_timers.keys().copied().filter(inside).collect();

        let mut stored = StoredPlantState::default();
        for key in structure_keys {
            if let Some(value) = self.plant_structures.remove(&key) {
                stored.structures.insert(key, value);
            }
        }
        for key in timer_keys {
            if let Some(value) = self.growth_timers.remove(&key) {
                stored.timers.insert(key, value);
            }
        }
        stored
    }

    /// Re-inserts captured entries and returns the affected keys in order.
    pub fn restore(&mut self, stored: StoredPlantState) -> Vec<WorldPos> {
        let mut keys: Vec<WorldPos> = stored
            .structures
            .keys()
            .chain(stored.timers.keys())
            .copied()
            .collect();
        keys.sort();
        keys.dedup();

        self.plant_structures.extend(stored.structures);
        self.growth_timers.extend(stored.timers);
        keys
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
