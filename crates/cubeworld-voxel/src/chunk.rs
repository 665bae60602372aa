//! Fixed-size chunk column with bounds-checked access, dirty tracking, and a
//! player modification ledger.
//!
//! Out-of-bounds reads return air and out-of-bounds writes are rejected with a
//! warning log; neither panics.

use std::collections::BTreeMap;

use crate::block::BlockId;
use crate::coords::{CHUNK_VOLUME, ChunkCoord, LocalPos};

/// Player edits keyed by flat local index. Ordered so saves are stable.
pub type ModificationLedger = BTreeMap<usize, BlockId>;

/// Opaque renderer-owned mesh identifier observed by the manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Errors raised when installing bulk chunk data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    /// A populated block array did not have exactly one entry per voxel.
    #[error("block array has {actual} entries, expected {expected}")]
    WrongLength {
        /// Required length ([`CHUNK_VOLUME`]).
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },
}

/// One resident chunk column.
#[derive(Clone, Debug)]
pub struct Chunk {
    coord: ChunkCoord,
    /// Flat voxel storage indexed by [`LocalPos::index`].
    blocks: Box<[BlockId]>,
    /// Final values of player-caused writes only.
    modifications: ModificationLedger,
    /// Mesh needs rebuilding.
    dirty: bool,
    /// Procedural population has been applied.
    generated: bool,
    mesh: Option<MeshHandle>,
}

impl Chunk {
    /// Creates an ungenerated, all-air chunk.
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            blocks: vec![BlockId::AIR; CHUNK_VOLUME].into_boxed_slice(),
            modifications: ModificationLedger::new(),
            dirty: false,
            generated: false,
            mesh: None,
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Returns the block at `(lx, ly, lz)`, or air when out of bounds.
    pub fn get_block(&self, lx: usize, ly: usize, lz: usize) -> BlockId {
        match LocalPos::new(lx, ly, lz).index() {
            Some(index) => self.blocks[index],
            None => {
                tracing::warn!("Chunk::get_block out of bounds: ({}, {}, {})", lx, ly, lz);
                BlockId::AIR
            }
        }
    }

    /// Writes a block. Returns `false` without touching anything when out of bounds.
    pub fn set_block(&mut self, lx: usize, ly: usize, lz: usize, block: BlockId) -> bool {
        let Some(index) = LocalPos::new(lx, ly, lz).index() else {
            tracing::warn!("Chunk::set_block out of bounds: ({}, {}, {})", lx, ly, lz);
            return false;
        };
        self.blocks[index] = block;
        self.dirty = true;
        true
    }

    /// Records a player-caused write in the modification ledger.
    ///
    /// Called alongside [`Chunk::set_block`]; a later record for the same
    /// index replaces the earlier one.
    pub fn mark_modified(&mut self, lx: usize, ly: usize, lz: usize, block: BlockId) -> bool {
        let Some(index) = LocalPos::new(lx, ly, lz).index() else {
            return false;
        };
        self.modifications.insert(index, block);
        true
    }

    pub fn modifications(&self) -> &ModificationLedger {
        &self.modifications
    }

    /// Moves the ledger out, leaving it empty.
    pub fn take_modifications(&mut self) -> ModificationLedger {
        std::mem::take(&mut self.modifications)
    }

    /// Replays every entry onto the block array and replaces the ledger.
    ///
    /// Indices outside the chunk are dropped with a warning.
    pub fn apply_modifications(&mut self, ledger: ModificationLedger) {
        let mut accepted = ModificationLedger::new();
        for (index, block) in ledger {
            if index < CHUNK_VOLUME {
                self.blocks[index] = block;
                accepted.insert(index, block);
            } else {
                tracing::warn!(chunk = %self.coord, index, "dropping out-of-range modification");
            }
        }
        self.modifications = accepted;
        self.dirty = true;
    }

    /// Re-applies the current ledger on top of the block array.
    pub(crate) fn replay_modifications(&mut self) {
        for (&index, &block) in &self.modifications {
            self.blocks[index] = block;
        }
    }

    /// Installs procedurally generated content and marks the chunk generated.
    pub fn fill_generated(&mut self, blocks: Vec<BlockId>) -> Result<(), ChunkError> {
        if blocks.len() != CHUNK_VOLUME {
            return Err(ChunkError::WrongLength {
                expected: CHUNK_VOLUME,
                actual: blocks.len(),
            });
        }
        self.blocks = blocks.into_boxed_slice();
        self.generated = true;
        self.dirty = true;
        Ok(())
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }

    /// Marks content as authoritative without running the pipeline (save loading).
    pub fn mark_generated(&mut self) {
        self.generated = true;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Called by the mesher once geometry matches the block data.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn mesh(&self) -> Option<MeshHandle> {
        self.mesh
    }

    pub fn set_mesh(&mut self, mesh: Option<MeshHandle>) {
        self.mesh = mesh;
    }

    pub fn take_mesh(&mut self) -> Option<MeshHandle> {
        self.mesh.take()
    }

    /// Flat block storage in [`LocalPos::index`] order.
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    /// Iterates `(flat index, block)` for every non-air voxel.
    pub fn non_air_blocks(&self) -> impl Iterator<Item = (usize, BlockId)> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, block)| !block.is_air())
            .map(|(index, &block)| (index, block))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
