//! Chunked voxel world storage: coordinates, chunk columns, the write-back
//! ledger for evicted chunks, and the working-set manager.

pub mod block;
pub mod chunk;
pub mod coords;
pub mod events;
pub mod generation;
pub mod growth;
pub mod legacy;
pub mod ledger;
pub mod manager;

pub use block::{BlockCatalog, BlockDef, BlockId, CatalogError};
pub use chunk::{Chunk, ChunkError, MeshHandle, ModificationLedger};
pub use coords::{
    CHUNK_HEIGHT, CHUNK_SIZE_X, CHUNK_SIZE_Z, CHUNK_VOLUME, ChunkCoord, ChunkLocal, KeyParseError,
    LocalPos, MAX_Y, MIN_Y, WorldPos, world_to_chunk,
};
pub use events::{EventBus, WorldEvent};
pub use generation::{
    GenerationPipeline, GenerationRequest, GenerationResponse, GenerationTicket, TerrainPopulator,
    run_populator,
};
pub use growth::{GrowthState, GrowthTimer, PlantStructure, StoredPlantState};
pub use legacy::SparseVoxelMap;
pub use ledger::{PersistenceLedger, StoredChunk};
pub use manager::{
    ChunkManager, ChunkManagerConfig, MAX_RADIUS, MAX_WORLD_RADIUS, MeshTeardown, TickStats,
};
