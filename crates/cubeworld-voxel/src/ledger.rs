//! Write-back ledger for evicted chunks.
//!
//! Holds the player modification ledgers and plant/growth state of chunks
//! that are no longer resident. Entries are written only during eviction and
//! drained when the chunk is re-created.

use rustc_hash::FxHashMap;

use crate::chunk::ModificationLedger;
use crate::coords::ChunkCoord;
use crate::growth::StoredPlantState;

/// Everything captured from one evicted chunk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoredChunk {
    pub deltas: ModificationLedger,
    pub plants: StoredPlantState,
}

impl StoredChunk {
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty() && self.plants.is_empty()
    }

    /// Folds `newer` into `self`; `newer` wins on the same index or key.
    pub fn merge(&mut self, newer: StoredChunk) {
        self.deltas.extend(newer.deltas);
        self.plants.merge(newer.plants);
    }
}

/// The two keyed stores for evicted chunks.
#[derive(Debug, Default)]
pub struct PersistenceLedger {
    stored_deltas: FxHashMap<ChunkCoord, ModificationLedger>,
    stored_plants: FxHashMap<ChunkCoord, StoredPlantState>,
}

impl PersistenceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records captured state for `coord`. Empty parts create no entry.
    pub fn store(&mut self, coord: ChunkCoord, captured: StoredChunk) {
        if !captured.deltas.is_empty() {
            self.stored_deltas
                .entry(coord)
                .or_default()
                .extend(captured.deltas);
        }
        if !captured.plants.is_empty() {
            self.stored_plants
                .entry(coord)
                .or_default()
                .merge(captured.plants);
        }
    }

    /// Removes and returns everything stored for `coord`.
    pub fn take(&mut self, coord: ChunkCoord) -> Option<StoredChunk> {
        let deltas = self.stored_deltas.remove(&coord);
        let plants = self.stored_plants.remove(&coord);
        if deltas.is_none() && plants.is_none() {
            return None;
        }
        Some(StoredChunk {
            deltas: deltas.unwrap_or_default(),
            plants: plants.unwrap_or_default(),
        })
    }

    /// Whether either store has an entry for `coord`.
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.stored_deltas.contains_key(&coord) || self.stored_plants.contains_key(&coord)
    }

    pub fn deltas(&self, coord: ChunkCoord) -> Option<&ModificationLedger> {
        self.stored_deltas.get(&coord)
    }

    pub fn plants(&self, coord: ChunkCoord) -> Option<&StoredPlantState> {
        self.stored_plants.get(&coord)
    }

    pub fn iter_deltas(&self) -> impl Iterator<Item = (&ChunkCoord, &ModificationLedger)> {
        self.stored_deltas.iter()
    }

    pub fn iter_plants(&self) -> impl Iterator<Item = (&ChunkCoord, &StoredPlantState)> {
        self.stored_plants.iter()
    }

    /// Number of chunk keys with stored deltas.
    pub fn delta_count(&self) -> usize {
        self.stored_deltas.len()
    }

    /// Number of chunk keys with stored plant state.
    pub fn plant_count(&self) -> usize {
        self.stored_plants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stored_deltas.is_empty() && self.stored_plants.is_empty()
    }

    pub fn clear(&mut self) {
        self.stored_deltas.clear();
        self.stored_plants.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
