//! Block identifiers and the block catalog.
//!
//! The catalog is built once at startup. Air is always ID 0 so that a freshly
//! allocated chunk represents empty space.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Compact identifier stored in every voxel cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u16);

impl BlockId {
    pub const AIR: BlockId = BlockId(0);
    pub const STONE: BlockId = BlockId(1);
    pub const DIRT: BlockId = BlockId(2);
    pub const GRASS: BlockId = BlockId(3);
    pub const SAND: BlockId = BlockId(4);
    pub const WATER: BlockId = BlockId(5);
    pub const WOOD: BlockId = BlockId(6);
    pub const LEAVES: BlockId = BlockId(7);
    /// Reported for every position below the world floor.
    pub const BEDROCK: BlockId = BlockId(8);

    pub fn is_air(self) -> bool {
        self == Self::AIR
    }
}

/// Descriptor for a block type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDef {
    /// Human-readable name (e.g. "stone", "water").
    pub name: String,
    /// Whether entities collide with this block.
    pub solid: bool,
    /// Whether neighbouring faces stay visible through this block.
    pub transparent: bool,
}

impl BlockDef {
    fn new(name: &str, solid: bool, transparent: bool) -> Self {
        Self {
            name: name.to_string(),
            solid,
            transparent,
        }
    }
}

/// Errors that can occur during block registration.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A block with the same name has already been registered.
    #[error("duplicate block name: {0}")]
    DuplicateName(String),
    /// Every representable ID has been consumed.
    #[error("block catalog is full (max 65536 types)")]
    CatalogFull,
}

/// Maps [`BlockId`] to [`BlockDef`] with reverse lookup by name.
#[derive(Clone, Debug)]
pub struct BlockCatalog {
    /// Dense array where `index == BlockId.0`.
    defs: Vec<BlockDef>,
    name_to_id: FxHashMap<String, BlockId>,
}

impl BlockCatalog {
    /// Creates a catalog containing only air.
    pub fn new() -> Self {
        let mut name_to_id = FxHashMap::default();
        name_to_id.insert("air".to_string(), BlockId::AIR);
        Self {
            defs: vec![BlockDef::new("air", false, true)],
            name_to_id,
        }
    }

    /// The catalog whose IDs match the associated constants on [`BlockId`].
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        let builtin = [
            BlockDef::new("stone", true, false),
            BlockDef::new("dirt", true, false),
            BlockDef::new("grass", true, false),
            BlockDef::new("sand", true, false),
            BlockDef::new("water", false, true),
            BlockDef::new("wood", true, false),
            BlockDef::new("leaves", true, true),
            BlockDef::new("bedrock", true, false),
        ];
        for def in builtin {
            // Names above are distinct and far below the capacity limit.
            let _ = catalog.register(def);
        }
        catalog
    }

    /// Registers a new block type and returns its sequential ID.
    pub fn register(&mut self, def: BlockDef) -> Result<BlockId, CatalogError> {
        if self.name_to_id.contains_key(&def.name) {
            return Err(CatalogError::DuplicateName(def.name));
        }
        if self.defs.len() > u16::MAX as usize {
            return Err(CatalogError::CatalogFull);
        }
        let id = BlockId(self.defs.len() as u16);
        self.name_to_id.insert(def.name.clone(), id);
        self.defs.push(def);
        Ok(id)
    }

    /// Returns the definition for `id`, or `None` for unknown IDs.
    pub fn get(&self, id: BlockId) -> Option<&BlockDef> {
        self.defs.get(id.0 as usize)
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<BlockId> {
        self.name_to_id.get(name).copied()
    }

    /// Number of registered types, including air.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// `true` if only air is registered.
    pub fn is_empty(&self) -> bool {
        self.defs.len() <= 1
    }

    /// Unknown IDs are treated as non-solid.
    pub fn is_solid(&self, id: BlockId) -> bool {
        self.get(id).is_some_and(|def| def.solid)
    }
}

impl Default for BlockCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
