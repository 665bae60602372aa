//! Sparse-collection adapter over [`ChunkManager`].
//!
//! Older consumers (the voxel ray marcher, simple physics probes) address
//! voxels by `"x,y,z"` string keys as if the world were one flat map of
//! non-air blocks. Implementing [`SparseVoxelMap`] keeps that coupling
//! explicit instead of leaking it into the manager's own API.

use crate::block::BlockId;
use crate::coords::WorldPos;
use crate::manager::ChunkManager;

/// Key/value view of the world where only non-air blocks are present.
///
/// Keys that do not parse as `"x,y,z"` behave as absent.
pub trait SparseVoxelMap {
    /// `true` when the block at `key` is not air.
    fn has(&self, key: &str) -> bool;

    /// The block at `key`, or `None` for air and invalid keys.
    fn get(&self, key: &str) -> Option<BlockId>;

    /// Writes `block` at `key` as a player edit.
    fn set(&mut self, key: &str, block: BlockId) -> bool;

    /// Replaces the block at `key` with air as a player edit.
    ///
    /// Returns `true` only when a non-air block was removed; deleting air
    /// records nothing.
    fn delete(&mut self, key: &str) -> bool;

    /// Visits every stored (non-air) block.
    fn for_each(&self, f: &mut dyn FnMut(&str, BlockId));

    /// Every stored block, ordered by position.
    fn entries(&self) -> Vec<(String, BlockId)>;
}

fn parse_key(key: &str) -> Option<WorldPos> {
    match key.parse::<WorldPos>() {
        Ok(pos) => Some(pos),
        Err(err) => {
            tracing::trace!(key, %err, "ignoring malformed voxel key");
            None
        }
    }
}

impl SparseVoxelMap for ChunkManager {
    fn has(&self, key: &str) -> bool {
        parse_key(key).is_some_and(|p| self.has_block(p.x, p.y, p.z))
    }

    fn get(&self, key: &str) -> Option<BlockId> {
        let p = parse_key(key)?;
        let block = self.get_block(p.x, p.y, p.z);
        (!block.is_air()).then_some(block)
    }

    fn set(&mut self, key: &str, block: BlockId) -> bool {
        parse_key(key).is_some_and(|p| self.set_block(p.x, p.y, p.z, block, true))
    }

    fn delete(&mut self, key: &str) -> bool {
        parse_key(key)
            .is_some_and(|p| self.has_block(p.x, p.y, p.z) && self.delete_block(p.x, p.y, p.z))
    }

    fn for_each(&self, f: &mut dyn FnMut(&str, BlockId)) {
        self.for_each_block(|pos, block| f(&pos.to_string(), block));
    }

    fn entries(&self) -> Vec<(String, BlockId)> {
        let mut blocks = Vec::new();
        self.for_each_block(|pos, block| blocks.push((pos, block)));
        blocks.sort_by_key(|&(pos, _)| pos);
        blocks
            .into_iter()
            .map(|(pos, block)| (pos.to_string(), block))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::ChunkCoord;
    use crate::manager::ChunkManagerConfig;

    fn map() -> ChunkManager {
        ChunkManager::new(ChunkManagerConfig::default())
    }

    #[test]
    fn test_set_get_has_delete() {
        let mut world = map();
        assert!(!world.has("3,10,-4"));
        assert!(world.set("3,10,-4", BlockId::DIRT));
        assert!(world.has("3,10,-4"));
        assert_eq!(world.get("3,10,-4"), Some(BlockId::DIRT));
        assert_eq!(world.get_block(3, 10, -4), BlockId::DIRT);

        assert!(world.delete("3,10,-4"));
        assert!(!world.has("3,10,-4"));
        assert_eq!(world.get("3,10,-4"), None);
    }

    #[test]
    fn test_delete_of_air_reports_nothing_removed() {
        let mut world = map();
        assert!(!world.delete("7,40,7"));
        assert!(world.chunk(ChunkCoord::new(0, 0)).is_none());

        world.set("7,40,7", BlockId::SAND);
        assert!(world.delete("7,40,7"));
        assert!(!world.delete("7,40,7"));
        // Bedrock below the world cannot be removed.
        assert!(!world.delete("7,-3,7"));
    }

    #[test]
    fn test_set_is_recorded_as_player_edit() {
        let mut world = map();
        world.set("1,2,3", BlockId::WOOD);
        let chunk = world.chunk(ChunkCoord::new(0, 0)).unwrap();
        assert_eq!(chunk.modifications().len(), 1);
    }

    #[test]
    fn test_malformed_keys_are_absent() {
        let mut world = map();
        for key in ["", "1,2", "1,2,3,4", "a,b,c", "1.5,2,3"] {
            assert!(!world.has(key), "{key}");
            assert_eq!(world.get(key), None);
            assert!(!world.set(key, BlockId::STONE));
            assert!(!world.delete(key));
        }
        assert_eq!(world.loaded_count(), 0);
    }

    #[test]
    fn test_vertical_bounds_through_keys() {
        let mut world = map();
        assert_eq!(world.get("0,-1,0"), Some(BlockId::BEDROCK));
        assert!(world.has("5,-20,5"));
        assert_eq!(world.get("0,128,0"), None);
        assert!(!world.set("0,128,0", BlockId::STONE));
    }

    #[test]
    fn test_entries_and_for_each() {
        let mut world = map();
        world.set("20,5,0", BlockId::SAND);
        world.set("-1,5,0", BlockId::STONE);
        world.set("0,5,0", BlockId::STONE);
        world.delete("0,5,0");

        assert_eq!(
            world.entries(),
            vec![
                ("-1,5,0".to_string(), BlockId::STONE),
                ("20,5,0".to_string(), BlockId::SAND),
            ]
        );

        let mut visited = Vec::new();
        world.for_each(&mut |key, block| visited.push((key.to_string(), block)));
        visited.sort();
        assert_eq!(visited.len(), 2);
        assert!(visited.contains(&("20,5,0".to_string(), BlockId::SAND)));
    }
}
