//! Reference terrain populator: fBm heightmap columns with a thin soil layer,
//! sea-level water, beaches and scattered trees.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use cubeworld_voxel::{
    BlockCatalog, BlockId, CHUNK_HEIGHT, CHUNK_SIZE_X, CHUNK_SIZE_Z, ChunkCoord, LocalPos,
    TerrainPopulator,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::heightmap::{HeightmapParams, HeightmapSampler};
use crate::params::GenerationParams;

/// Soil depth under the surface block.
const SOIL_DEPTH: i32 = 3;
/// Trees keep this many columns away from chunk edges so canopies stay inside.
const TREE_MARGIN: usize = 2;

/// Derives a per-chunk seed from the world seed and chunk coordinate.
pub fn derive_chunk_seed(world_seed: u64, coord: ChunkCoord) -> u64 {
    let mut hasher = DefaultHasher::new();
    world_seed.hash(&mut hasher);
    coord.x.hash(&mut hasher);
    coord.z.hash(&mut hasher);
    hasher.finish()
}

/// Deterministic RNG for decorations inside one chunk.
pub fn chunk_rng(world_seed: u64, coord: ChunkCoord) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(derive_chunk_seed(world_seed, coord))
}

/// Block ids resolved from the catalog by name, falling back to the built-ins.
struct Palette {
    bedrock: BlockId,
    stone: BlockId,
    dirt: BlockId,
    grass: BlockId,
    sand: BlockId,
    water: BlockId,
    wood: BlockId,
    leaves: BlockId,
}

impl Palette {
    fn resolve(catalog: &BlockCatalog) -> Self {
        let pick = |name: &str, fallback: BlockId| catalog.lookup_by_name(name).unwrap_or(fallback);
        Self {
            bedrock: pick("bedrock", BlockId::BEDROCK),
            stone: pick("stone", BlockId::STONE),
            dirt: pick("dirt", BlockId::DIRT),
            grass: pick("grass", BlockId::GRASS),
            sand: pick("sand", BlockId::SAND),
            water: pick("water", BlockId::WATER),
            wood: pick("wood", BlockId::WOOD),
            leaves: pick("leaves", BlockId::LEAVES),
        }
    }
}

fn put(blocks: &mut [BlockId], x: usize, y: i32, z: usize, block: BlockId) {
    if y < 0 {
        return;
    }
    if let Some(index) = LocalPos::new(x, y as usize, z).index() {
        blocks[index] = block;
    }
}

/// Heightmap terrain driven by [`GenerationParams`].
#[derive(Clone, Debug, Default)]
pub struct HeightmapPopulator {
    params: GenerationParams,
}

impl HeightmapPopulator {
    /// Builds a populator; parameters are clamped into their safe ranges.
    pub fn new(params: GenerationParams) -> Self {
        Self {
            params: params.clamped(),
        }
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Surface height (first air block above ground) for every column of `coord`.
    pub fn surface_heights(&self, coord: ChunkCoord, seed: u64) -> [[i32; CHUNK_SIZE_X]; CHUNK_SIZE_Z] {
        let sampler = HeightmapSampler::new(HeightmapParams {
            seed,
            octaves: self.params.octaves,
            amplitude: self.params.amplitude,
            base_frequency: self.params.base_frequency,
            ..Default::default()
        });
        let (ox, oz) = coord.origin();
        let top = CHUNK_HEIGHT as i32 - 1;

        let mut heights = [[0; CHUNK_SIZE_X]; CHUNK_SIZE_Z];
        for (lz, row) in heights.iter_mut().enumerate() {
            for (lx, height) in row.iter_mut().enumerate() {
                let wx = ox as f64 + lx as f64;
                let wz = oz as f64 + lz as f64;
                let offset = sampler.sample(wx, wz).round() as i32;
                *height = (self.params.base_height + offset).clamp(1, top);
            }
        }
        heights
    }

    fn plant_tree(blocks: &mut [BlockId], palette: &Palette, x: usize, base: i32, z: usize, trunk: i32) {
        let crown = base + trunk;
        for dy in -2..=1 {
            let radius: i32 = if dy < 0 { 2 } else { 1 };
            for dz in -radius..=radius {
                for dx in -radius..=radius {
                    if radius == 2 && dx.abs() == 2 && dz.abs() == 2 {
                        continue;
                    }
                    let lx = (x as i32 + dx) as usize;
                    let lz = (z as i32 + dz) as usize;
                    put(blocks, lx, crown + dy, lz, palette.leaves);
                }
            }
        }
        for y in base..crown {
            put(blocks, x, y, z, palette.wood);
        }
    }
}

impl TerrainPopulator for HeightmapPopulator {
    fn populate(&self, coord: ChunkCoord, seed: u64, catalog: &BlockCatalog, blocks: &mut [BlockId]) {
        let palette = Palette::resolve(catalog);
        let heights = self.surface_heights(coord, seed);
        let sea_level = self.params.sea_level;

        for (lz, row) in heights.iter().enumerate() {
            for (lx, &surface) in row.iter().enumerate() {
                put(blocks, lx, 0, lz, palette.bedrock);
                let beach = surface <= sea_level + 1;
                for y in 1..surface {
                    let block = if y < surface - 1 - SOIL_DEPTH {
                        palette.stone
                    } else if y < surface - 1 {
                        if beach { palette.sand } else { palette.dirt }
                    } else if beach {
                        palette.sand
                    } else {
                        palette.grass
                    };
                    put(blocks, lx, y, lz, block);
                }
                for y in surface..sea_level {
                    put(blocks, lx, y, lz, palette.water);
                }
            }
        }

        if self.params.tree_chance <= 0.0 {
            return;
        }
        let mut rng = chunk_rng(seed, coord);
        for lz in TREE_MARGIN..CHUNK_SIZE_Z - TREE_MARGIN {
            for lx in TREE_MARGIN..CHUNK_SIZE_X - TREE_MARGIN {
                let roll: f64 = rng.random();
                let trunk: i32 = rng.random_range(4..=6);
                let surface = heights[lz][lx];
                if roll >= self.params.tree_chance || surface <= sea_level + 1 {
                    continue;
                }
                if surface + trunk + 2 >= CHUNK_HEIGHT as i32 {
                    continue;
                }
                Self::plant_tree(blocks, &palette, lx, surface, lz, trunk);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubeworld_voxel::CHUNK_VOLUME;

    fn populate(populator: &HeightmapPopulator, coord: ChunkCoord, seed: u64) -> Vec<BlockId> {
        let mut blocks = vec![BlockId::AIR; CHUNK_VOLUME];
        populator.populate(coord, seed, &BlockCatalog::standard(), &mut blocks);
        blocks
    }

    fn at(blocks: &[BlockId], x: usize, y: usize, z: usize) -> BlockId {
        blocks[LocalPos::new(x, y, z).index().unwrap()]
    }

    #[test]
    fn test_bedrock_floor_everywhere() {
        let blocks = populate(&HeightmapPopulator::default(), ChunkCoord::new(-3, 8), 5);
        for z in 0..CHUNK_SIZE_Z {
            for x in 0..CHUNK_SIZE_X {
                assert_eq!(at(&blocks, x, 0, z), BlockId::BEDROCK);
            }
        }
    }

    #[test]
    fn test_deterministic_for_seed_and_coord() {
        let populator = HeightmapPopulator::default();
        let a = populate(&populator, ChunkCoord::new(2, -1), 77);
        let b = populate(&populator, ChunkCoord::new(2, -1), 77);
        assert_eq!(a, b);
    }

    #[test]
    fn test_surface_columns_are_capped() {
        let populator = HeightmapPopulator::new(GenerationParams {
            tree_chance: 0.0,
            ..Default::default()
        });
        let coord = ChunkCoord::new(0, 0);
        let heights = populator.surface_heights(coord, 3);
        let blocks = populate(&populator, coord, 3);
        for (z, row) in heights.iter().enumerate() {
            for (x, &surface) in row.iter().enumerate() {
                let surface = surface as usize;
                assert!(!at(&blocks, x, surface - 1, z).is_air());
                let above = at(&blocks, x, surface, z);
                assert!(above.is_air() || above == BlockId::WATER);
            }
        }
    }

    #[test]
    fn test_flat_world_below_sea_is_flooded() {
        let populator = HeightmapPopulator::new(GenerationParams {
            sea_level: 20,
            base_height: 10,
            amplitude: 0.0,
            tree_chance: 0.0,
            ..Default::default()
        });
        let blocks = populate(&populator, ChunkCoord::new(1, 1), 0);
        assert_eq!(at(&blocks, 4, 9, 4), BlockId::SAND);
        assert_eq!(at(&blocks, 4, 10, 4), BlockId::WATER);
        assert_eq!(at(&blocks, 4, 19, 4), BlockId::WATER);
        assert_eq!(at(&blocks, 4, 20, 4), BlockId::AIR);
        assert_eq!(at(&blocks, 4, 2, 4), BlockId::STONE);
    }

    #[test]
    fn test_flat_world_above_sea_has_grass_and_dirt() {
        let populator = HeightmapPopulator::new(GenerationParams {
            sea_level: 5,
            base_height: 30,
            amplitude: 0.0,
            tree_chance: 0.0,
            ..Default::default()
        });
        let blocks = populate(&populator, ChunkCoord::new(0, 0), 0);
        assert_eq!(at(&blocks, 0, 29, 0), BlockId::GRASS);
        assert_eq!(at(&blocks, 0, 28, 0), BlockId::DIRT);
        assert_eq!(at(&blocks, 0, 26, 0), BlockId::DIRT);
        assert_eq!(at(&blocks, 0, 25, 0), BlockId::STONE);
        assert_eq!(at(&blocks, 0, 30, 0), BlockId::AIR);
    }

    #[test]
    fn test_trees_grow_on_grass_only() {
        let populator = HeightmapPopulator::new(GenerationParams {
            sea_level: 5,
            base_height: 30,
            amplitude: 0.0,
            tree_chance: 0.2,
            ..Default::default()
        });
        let blocks = populate(&populator, ChunkCoord::new(0, 0), 11);
        let wood: Vec<usize> = (0..CHUNK_VOLUME)
            .filter(|&i| blocks[i] == BlockId::WOOD)
            .collect();
        assert!(!wood.is_empty());
        for index in wood {
            let pos = LocalPos::from_index(index).unwrap();
            assert!(pos.y >= 30);
            assert!((TREE_MARGIN..CHUNK_SIZE_X - TREE_MARGIN).contains(&pos.x));
        }
    }

    #[test]
    fn test_catalog_names_override_ids() {
        let mut catalog = BlockCatalog::new();
        catalog
            .register(cubeworld_voxel::BlockDef {
                name: "marble".to_string(),
                solid: true,
                transparent: false,
            })
            .unwrap();
        let rock = catalog
            .register(cubeworld_voxel::BlockDef {
                name: "stone".to_string(),
                solid: true,
                transparent: false,
            })
            .unwrap();
        let populator = HeightmapPopulator::new(GenerationParams {
            base_height: 30,
            amplitude: 0.0,
            tree_chance: 0.0,
            ..Default::default()
        });
        let mut blocks = vec![BlockId::AIR; CHUNK_VOLUME];
        populator.populate(ChunkCoord::new(0, 0), 0, &catalog, &mut blocks);
        assert_eq!(rock, BlockId(2));
        assert_eq!(at(&blocks, 0, 2, 0), rock);
        // Unregistered names fall back to the built-in ids.
        assert_eq!(at(&blocks, 0, 0, 0), BlockId::BEDROCK);
    }

    #[test]
    fn test_chunk_seeds_differ_by_coord() {
        assert_ne!(
            derive_chunk_seed(1, ChunkCoord::new(0, 1)),
            derive_chunk_seed(1, ChunkCoord::new(1, 0))
        );
        assert_eq!(
            derive_chunk_seed(9, ChunkCoord::new(-4, 2)),
            derive_chunk_seed(9, ChunkCoord::new(-4, 2))
        );
    }
}
