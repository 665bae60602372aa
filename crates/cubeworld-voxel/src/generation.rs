//! Request/response boundary to the terrain populator.
//!
//! The manager never calls a populator directly. It submits a
//! [`GenerationRequest`] carrying the chunk's [`GenerationTicket`] and later
//! drains [`GenerationResponse`]s, which it accepts only if the same chunk
//! instance is still resident. Pipelines may answer in the same tick
//! (synchronous) or many ticks later (worker threads).

use std::time::Instant;

use crate::block::{BlockCatalog, BlockId};
use crate::coords::{CHUNK_VOLUME, ChunkCoord};

/// Identifies one chunk instance's generation request.
///
/// A re-created chunk at the same coordinate receives a new ticket, so a late
/// response addressed to the old instance can be told apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenerationTicket(pub u64);

/// Ask the pipeline to populate one chunk column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationRequest {
    pub coord: ChunkCoord,
    pub ticket: GenerationTicket,
    /// World seed for deterministic output.
    pub seed: u64,
    /// Lower values should be generated first (chunk distance to the player).
    pub priority: u32,
}

/// A populated block array for a previously submitted request.
#[derive(Clone, Debug)]
pub struct GenerationResponse {
    pub coord: ChunkCoord,
    pub ticket: GenerationTicket,
    /// Exactly [`CHUNK_VOLUME`] blocks in local index order.
    pub blocks: Vec<BlockId>,
    /// Populator wall time in microseconds (for profiling).
    pub generation_time_us: u64,
}

/// The opaque populate-this-chunk contract implemented by terrain generators.
pub trait TerrainPopulator: Send + Sync {
    /// Fills `blocks` (length [`CHUNK_VOLUME`], initially air) for `coord`.
    fn populate(&self, coord: ChunkCoord, seed: u64, catalog: &BlockCatalog, blocks: &mut [BlockId]);
}

/// Delivery mechanism between the manager and a [`TerrainPopulator`].
pub trait GenerationPipeline {
    /// Queues a request without blocking.
    ///
    /// Returns the request back when the pipeline cannot accept it right now;
    /// the manager will resubmit on a later tick.
    fn submit(&mut self, request: GenerationRequest) -> Result<(), GenerationRequest>;

    /// Returns every response that has completed since the last call.
    fn drain(&mut self) -> Vec<GenerationResponse>;

    /// Best-effort cancellation of an outstanding request.
    ///
    /// Responses may still arrive afterwards; the manager discards them.
    fn cancel(&mut self, coord: ChunkCoord, ticket: GenerationTicket);
}

/// Runs `populator` for `request` and packages the result.
pub fn run_populator(
    populator: &dyn TerrainPopulator,
    catalog: &BlockCatalog,
    request: &GenerationRequest,
) -> GenerationResponse {
    let start = Instant::now();
    let mut blocks = vec![BlockId::AIR; CHUNK_VOLUME];
    populator.populate(request.coord, request.seed, catalog, &mut blocks);
    GenerationResponse {
        coord: request.coord,
        ticket: request.ticket,
        blocks,
        generation_time_us: start.elapsed().as_micros() as u64,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::LocalPos;

    struct FloorPopulator;

    impl TerrainPopulator for FloorPopulator {
        fn populate(&self, _: ChunkCoord, seed: u64, _: &BlockCatalog, blocks: &mut [BlockId]) {
            let layer = (seed % 4) as usize + 1;
            for y in 0..layer {
                for z in 0..16 {
                    for x in 0..16 {
                        if let Some(index) = LocalPos::new(x, y, z).index() {
                            blocks[index] = BlockId::STONE;
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_run_populator_packages_response() {
        let request = GenerationRequest {
            coord: ChunkCoord::new(3, -4),
            ticket: GenerationTicket(11),
            seed: 2,
            priority: 0,
        };
        let response = run_populator(&FloorPopulator, &BlockCatalog::standard(), &request);
        assert_eq!(response.coord, request.coord);
        assert_eq!(response.ticket, request.ticket);
        assert_eq!(response.blocks.len(), CHUNK_VOLUME);
        assert_eq!(response.blocks[0], BlockId::STONE);
        let above = LocalPos::new(0, 3, 0).index().unwrap();
        assert_eq!(response.blocks[above], BlockId::AIR);
    }
}
