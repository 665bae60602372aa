//! Central owner of resident chunks and the working-set tick.
//!
//! [`ChunkManager::update_visible_chunks`] is called once per simulation tick
//! with the player's position. Around the player's chunk it keeps three
//! square bands:
//!
//! - **render zone** (`distance <= render_radius`): chunks are created and
//!   generation is requested; they form the visible set.
//! - **cache zone** (`render_radius < distance <= cache_radius`): resident
//!   chunks are kept as they are, visible only if they already carry a mesh.
//! - **evicted zone** (everything else): player edits and plant state are
//!   captured into the [`PersistenceLedger`], the mesh is torn down, and the
//!   chunk is dropped.
//!
//! Distances are Chebyshev distances in chunks.

use rustc_hash::FxHashMap;

use crate::block::BlockId;
use crate::chunk::{Chunk, MeshHandle, ModificationLedger};
use crate::coords::{
    CHUNK_SIZE_X, CHUNK_SIZE_Z, ChunkCoord, LocalPos, MAX_Y, MIN_Y, WorldPos, world_to_chunk,
};
use crate::generation::{GenerationPipeline, GenerationRequest, GenerationResponse, GenerationTicket};
use crate::growth::{GrowthState, StoredPlantState};
use crate::ledger::{PersistenceLedger, StoredChunk};

/// Largest render or cache radius the manager accepts.
pub const MAX_RADIUS: u32 = 32;
/// Largest world radius the manager accepts.
pub const MAX_WORLD_RADIUS: u32 = 1 << 16;

fn clamp_radius(name: &str, value: u32, max: u32) -> u32 {
    if value > max {
        tracing::warn!(param = name, value, clamped = max, "radius out of range");
        max
    } else {
        value
    }
}

/// Working-set radii, world bounds and seed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkManagerConfig {
    /// Chunks within this distance are loaded and visible.
    pub render_radius: u32,
    /// Chunks within this distance stay resident once loaded.
    /// Values below `render_radius` leave the cache zone empty.
    pub cache_radius: u32,
    /// When set, chunks farther than this from the world origin are never loaded.
    pub world_radius: Option<u32>,
    /// World seed passed with every generation request.
    pub seed: u64,
}

impl Default for ChunkManagerConfig {
    fn default() -> Self {
        Self {
            render_radius: 4,
            cache_radius: 6,
            world_radius: None,
            seed: 0,
        }
    }
}

impl ChunkManagerConfig {
    /// Copy with radii limited to [`MAX_RADIUS`] and [`MAX_WORLD_RADIUS`].
    pub fn clamped(self) -> Self {
        Self {
            render_radius: clamp_radius("render_radius", self.render_radius, MAX_RADIUS),
            cache_radius: clamp_radius("cache_radius", self.cache_radius, MAX_RADIUS),
            world_radius: self
                .world_radius
                .map(|r| clamp_radius("world_radius", r, MAX_WORLD_RADIUS)),
            seed: self.seed,
        }
    }
}

/// Renderer collaborator that releases GPU meshes of evicted chunks.
pub trait MeshTeardown {
    fn delete_chunk_mesh(&mut self, coord: ChunkCoord, mesh: MeshHandle);
}

impl<F: FnMut(ChunkCoord, MeshHandle)> MeshTeardown for F {
    fn delete_chunk_mesh(&mut self, coord: ChunkCoord, mesh: MeshHandle) {
        self(coord, mesh)
    }
}

/// Counters from the most recent tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Chunks created this tick.
    pub created: u32,
    /// Chunks evicted this tick.
    pub evicted: u32,
    /// Generation requests accepted by the pipeline.
    pub requested: u32,
    /// Requests the pipeline refused; retried next tick.
    pub deferred: u32,
    /// Generation responses applied.
    pub generated: u32,
    /// Responses dropped because their chunk was evicted or replaced.
    pub discarded: u32,
    /// Chunks whose plant state was merged back into the live collections.
    pub plants_restored: u32,
    /// Size of the returned visible set.
    pub visible: u32,
}

/// A resident chunk plus its generation bookkeeping.
#[derive(Debug)]
struct ResidentChunk {
    chunk: Chunk,
    ticket: GenerationTicket,
    /// A request for `ticket` is outstanding.
    requested: bool,
    /// Ledger deltas taken at creation, replayed once generated.
    pending_deltas: Option<ModificationLedger>,
    /// Ledger plant state taken at creation, restored on the first tick after generation.
    pending_plants: Option<StoredPlantState>,
}

impl ResidentChunk {
    fn new(chunk: Chunk, ticket: GenerationTicket, stored: Option<StoredChunk>) -> Self {
        let (pending_deltas, pending_plants) = match stored {
            Some(stored) => (
                (!stored.deltas.is_empty()).then_some(stored.deltas),
                (!stored.plants.is_empty()).then_some(stored.plants),
            ),
            None => (None, None),
        };
        Self {
            chunk,
            ticket,
            requested: false,
            pending_deltas,
            pending_plants,
        }
    }

    /// Replays stored deltas under any edits made since the chunk was created.
    fn restore_pending_deltas(&mut self) {
        debug_assert!(self.chunk.is_generated());
        let Some(mut deltas) = self.pending_deltas.take() else {
            return;
        };
        deltas.extend(self.chunk.take_modifications());
        self.chunk.apply_modifications(deltas);
    }
}

/// Owns every resident chunk and the ledger of evicted ones.
#[derive(Debug)]
pub struct ChunkManager {
    config: ChunkManagerConfig,
    chunks: FxHashMap<ChunkCoord, ResidentChunk>,
    ledger: PersistenceLedger,
    next_ticket: u64,
    last_tick: TickStats,
}

impl ChunkManager {
    /// Radii beyond [`MAX_RADIUS`] or [`MAX_WORLD_RADIUS`] are clamped.
    pub fn new(config: ChunkManagerConfig) -> Self {
        Self {
            config: config.clamped(),
            chunks: FxHashMap::default(),
            ledger: PersistenceLedger::new(),
            next_ticket: 0,
            last_tick: TickStats::default(),
        }
    }

    pub fn config(&self) -> &ChunkManagerConfig {
        &self.config
    }

    /// Changes the render and cache radii; takes effect on the next tick.
    pub fn set_radii(&mut self, render_radius: u32, cache_radius: u32) {
        self.config.render_radius = clamp_radius("render_radius", render_radius, MAX_RADIUS);
        self.config.cache_radius = clamp_radius("cache_radius", cache_radius, MAX_RADIUS);
    }

    /// Changes the world bound; chunks outside it are evicted on the next tick.
    pub fn set_world_radius(&mut self, world_radius: Option<u32>) {
        self.config.world_radius =
            world_radius.map(|r| clamp_radius("world_radius", r, MAX_WORLD_RADIUS));
    }

    /// Drops every resident chunk and ledger entry and adopts `config`.
    ///
    /// No teardown is requested; callers replacing the world discard the
    /// renderer's meshes themselves.
    pub fn reset(&mut self, config: ChunkManagerConfig) {
        self.chunks.clear();
        self.ledger.clear();
        self.config = config.clamped();
        self.last_tick = TickStats::default();
    }

    /// Whether `coord` is inside the configured world bound.
    pub fn in_world(&self, coord: ChunkCoord) -> bool {
        match self.config.world_radius {
            Some(radius) => coord.chebyshev_distance(ChunkCoord::default()) <= radius,
            None => true,
        }
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord).map(|r| &r.chunk)
    }

    /// Mutable access for the mesher (mesh handles, dirty flags).
    pub fn chunk_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord).map(|r| &mut r.chunk)
    }

    pub fn is_resident(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// Whether a generation request for the resident chunk at `coord` is outstanding.
    pub fn is_generation_pending(&self, coord: ChunkCoord) -> bool {
        self.chunks.get(&coord).is_some_and(|r| r.requested)
    }

    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn iter_chunks(&self) -> impl Iterator<Item = (&ChunkCoord, &Chunk)> {
        self.chunks.iter().map(|(coord, r)| (coord, &r.chunk))
    }

    /// Ledger of evicted chunks.
    pub fn ledger(&self) -> &PersistenceLedger {
        &self.ledger
    }

    pub fn last_tick(&self) -> TickStats {
        self.last_tick
    }

    /// Everything that must outlive the resident block data, keyed by chunk.
    ///
    /// Combines the ledger with each resident chunk's modification ledger and
    /// any restoration still parked waiting for generation. Keys with nothing
    /// to keep are omitted.
    pub fn persistent_state(&self) -> FxHashMap<ChunkCoord, StoredChunk> {
        let mut state: FxHashMap<ChunkCoord, StoredChunk> = FxHashMap::default();
        for (&coord, deltas) in self.ledger.iter_deltas() {
            state.entry(coord).or_default().deltas = deltas.clone();
        }
        for (&coord, plants) in self.ledger.iter_plants() {
            state.entry(coord).or_default().plants = plants.clone();
        }
        for (&coord, resident) in &self.chunks {
            let mut captured = StoredChunk {
                deltas: resident.pending_deltas.clone().unwrap_or_default(),
                plants: resident.pending_plants.clone().unwrap_or_default(),
            };
            captured
                .deltas
                .extend(resident.chunk.modifications().iter().map(|(&i, &b)| (i, b)));
            if !captured.is_empty() {
                state.insert(coord, captured);
            }
        }
        state
    }

    /// Installs an already populated chunk (e.g. from a save file).
    ///
    /// Any ledger entry for the coordinate is drained into it so the key never
    /// lives in both places.
    pub fn insert_loaded_chunk(&mut self, mut chunk: Chunk) {
        chunk.mark_generated();
        let coord = chunk.coord();
        let ticket = self.issue_ticket();
        let stored = self.ledger.take(coord);
        let mut resident = ResidentChunk::new(chunk, ticket, stored);
        resident.restore_pending_deltas();
        self.chunks.insert(coord, resident);
    }

    /// Adds captured state for a non-resident chunk (e.g. from a save file).
    ///
    /// Returns `false` without storing anything if the chunk is resident.
    pub fn store_evicted(&mut self, coord: ChunkCoord, captured: StoredChunk) -> bool {
        if self.chunks.contains_key(&coord) {
            return false;
        }
        self.ledger.store(coord, captured);
        true
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Runs one working-set update and returns the visible chunk coordinates.
    ///
    /// Order: accept finished generation, evict out-of-range chunks, create and
    /// request the render zone, accept anything a synchronous pipeline just
    /// produced, restore plant state of generated chunks, collect the visible
    /// set. Safe to call every tick regardless of how long generation takes.
    pub fn update_visible_chunks(
        &mut self,
        player_x: f64,
        player_z: f64,
        pipeline: &mut dyn GenerationPipeline,
        renderer: &mut dyn MeshTeardown,
        growth: &mut GrowthState,
        mut on_plants_restored: Option<&mut dyn FnMut(&[WorldPos])>,
    ) -> Vec<ChunkCoord> {
        let mut stats = TickStats::default();
        let center = world_to_chunk(player_x.floor() as i32, player_z.floor() as i32).chunk;
        let render = self.config.render_radius;
        let keep = render.max(self.config.cache_radius);

        self.accept_responses(pipeline.drain(), &mut stats);

        let mut out_of_range: Vec<ChunkCoord> = self
            .chunks
            .keys()
            .filter(|&&coord| coord.chebyshev_distance(center) > keep || !self.in_world(coord))
            .copied()
            .collect();
        out_of_range.sort();
        for coord in out_of_range {
            self.evict(coord, pipeline, renderer, growth);
            stats.evicted += 1;
        }

        let r = render as i32;
        let mut visible = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
        for dz in -r..=r {
            for dx in -r..=r {
                let coord = center.offset(dx, dz);
                if !self.in_world(coord) {
                    continue;
                }
                if !self.chunks.contains_key(&coord) {
                    stats.created += 1;
                }
                self.ensure_resident(coord);
                visible.push(coord);
            }
        }

        let mut to_request: Vec<(u32, ChunkCoord)> = visible
            .iter()
            .filter(|coord| {
                self.chunks
                    .get(coord)
                    .is_some_and(|r| !r.requested && !r.chunk.is_generated())
            })
            .map(|&coord| (coord.chebyshev_distance(center), coord))
            .collect();
        to_request.sort();
        for (priority, coord) in to_request {
            self.request_generation(coord, priority, pipeline, &mut stats);
        }

        self.accept_responses(pipeline.drain(), &mut stats);

        let mut restorable: Vec<ChunkCoord> = self
            .chunks
            .iter()
            .filter(|(_, r)| r.chunk.is_generated() && r.pending_plants.is_some())
            .map(|(&coord, _)| coord)
            .collect();
        restorable.sort();
        for coord in restorable {
            let Some(plants) = self
                .chunks
                .get_mut(&coord)
                .and_then(|r| r.pending_plants.take())
            else {
                continue;
            };
            let keys = growth.restore(plants);
            stats.plants_restored += 1;
            if let Some(callback) = on_plants_restored.as_deref_mut() {
                callback(&keys);
            }
        }

        let mut cached: Vec<ChunkCoord> = self
            .chunks
            .iter()
            .filter(|(coord, r)| {
                let distance = coord.chebyshev_distance(center);
                distance > render && distance <= keep && r.chunk.mesh().is_some()
            })
            .map(|(&coord, _)| coord)
            .collect();
        cached.sort();
        visible.extend(cached);

        stats.visible = visible.len() as u32;
        tracing::debug!(
            center = %center,
            resident = self.chunks.len(),
            created = stats.created,
            evicted = stats.evicted,
            requested = stats.requested,
            generated = stats.generated,
            discarded = stats.discarded,
            visible = stats.visible,
            "chunk tick"
        );
        self.last_tick = stats;
        visible
    }

    fn issue_ticket(&mut self) -> GenerationTicket {
        self.next_ticket += 1;
        GenerationTicket(self.next_ticket)
    }

    /// Returns the resident chunk at `coord`, creating it if missing.
    fn ensure_resident(&mut self, coord: ChunkCoord) -> &mut ResidentChunk {
        let Self {
            chunks,
            ledger,
            next_ticket,
            ..
        } = self;
        chunks.entry(coord).or_insert_with(|| {
            *next_ticket += 1;
            ResidentChunk::new(
                Chunk::new(coord),
                GenerationTicket(*next_ticket),
                ledger.take(coord),
            )
        })
    }

    fn request_generation(
        &mut self,
        coord: ChunkCoord,
        priority: u32,
        pipeline: &mut dyn GenerationPipeline,
        stats: &mut TickStats,
    ) {
        let seed = self.config.seed;
        let Some(resident) = self.chunks.get_mut(&coord) else {
            return;
        };
        let request = GenerationRequest {
            coord,
            ticket: resident.ticket,
            seed,
            priority,
        };
        match pipeline.submit(request) {
            Ok(()) => {
                resident.requested = true;
                stats.requested += 1;
            }
            Err(_) => {
                stats.deferred += 1;
                tracing::trace!(chunk = %coord, "generation pipeline full, retrying next tick");
            }
        }
    }

    fn accept_responses(&mut self, responses: Vec<GenerationResponse>, stats: &mut TickStats) {
        for response in responses {
            let coord = response.coord;
            let Some(resident) = self.chunks.get_mut(&coord) else {
                tracing::debug!(chunk = %coord, "discarding generation for evicted chunk");
                stats.discarded += 1;
                continue;
            };
            if resident.ticket != response.ticket || resident.chunk.is_generated() {
                tracing::debug!(
                    chunk = %coord,
                    ticket = response.ticket.0,
                    current = resident.ticket.0,
                    "discarding stale generation"
                );
                stats.discarded += 1;
                continue;
            }
            resident.requested = false;
            if let Err(err) = resident.chunk.fill_generated(response.blocks) {
                tracing::warn!(chunk = %coord, %err, "rejecting malformed generation output");
                continue;
            }
            resident.chunk.replay_modifications();
            resident.restore_pending_deltas();
            stats.generated += 1;

            for (dx, dz) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                if let Some(neighbor) = self.chunks.get_mut(&coord.offset(dx, dz)) {
                    neighbor.chunk.mark_dirty();
                }
            }
        }
    }

    /// Capture, tear down and drop one resident chunk.
    fn evict(
        &mut self,
        coord: ChunkCoord,
        pipeline: &mut dyn GenerationPipeline,
        renderer: &mut dyn MeshTeardown,
        growth: &mut GrowthState,
    ) {
        let Some(mut resident) = self.chunks.remove(&coord) else {
            return;
        };

        let mut captured = StoredChunk {
            deltas: resident.pending_deltas.take().unwrap_or_default(),
            plants: resident.pending_plants.take().unwrap_or_default(),
        };
        captured.merge(StoredChunk {
            deltas: resident.chunk.take_modifications(),
            plants: growth.extract_chunk(coord),
        });
        self.ledger.store(coord, captured);

        if resident.requested {
            pipeline.cancel(coord, resident.ticket);
        }
        if let Some(mesh) = resident.chunk.take_mesh() {
            renderer.delete_chunk_mesh(coord, mesh);
        }
        tracing::trace!(chunk = %coord, "evicted");
    }

    // -----------------------------------------------------------------------
    // Block API
    // -----------------------------------------------------------------------

    /// Reads a block in world space.
    ///
    /// Below [`MIN_Y`] is always bedrock, at or above [`MAX_Y`] always air,
    /// and non-resident chunks read as air.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> BlockId {
        if y < MIN_Y {
            return BlockId::BEDROCK;
        }
        let Some((coord, local)) = WorldPos::new(x, y, z).to_chunk_local() else {
            return BlockId::AIR;
        };
        self.chunks
            .get(&coord)
            .map_or(BlockId::AIR, |r| r.chunk.get_block(local.x, local.y, local.z))
    }

    /// Writes a block in world space, creating its chunk if needed.
    ///
    /// Returns `false` for positions outside the vertical range or the world
    /// bound. Only writes with `is_player_edit` survive eviction.
    pub fn set_block(&mut self, x: i32, y: i32, z: i32, block: BlockId, is_player_edit: bool) -> bool {
        let Some((coord, local)) = WorldPos::new(x, y, z).to_chunk_local() else {
            return false;
        };
        if !self.in_world(coord) {
            return false;
        }
        let chunk = &mut self.ensure_resident(coord).chunk;
        if !chunk.set_block(local.x, local.y, local.z, block) {
            return false;
        }
        if is_player_edit {
            chunk.mark_modified(local.x, local.y, local.z, block);
        }
        self.mark_seam_neighbors_dirty(coord, local);
        true
    }

    /// `true` if the block at the position is not air.
    pub fn has_block(&self, x: i32, y: i32, z: i32) -> bool {
        !self.get_block(x, y, z).is_air()
    }

    /// Player removal of a block; equivalent to writing air as a player edit.
    pub fn delete_block(&mut self, x: i32, y: i32, z: i32) -> bool {
        self.set_block(x, y, z, BlockId::AIR, true)
    }

    /// Calls `f` for every non-air block of every resident chunk.
    pub fn for_each_block(&self, mut f: impl FnMut(WorldPos, BlockId)) {
        for (&coord, resident) in &self.chunks {
            for (index, block) in resident.chunk.non_air_blocks() {
                if let Some(local) = LocalPos::from_index(index) {
                    f(coord.world_pos(local), block);
                }
            }
        }
    }

    fn mark_seam_neighbors_dirty(&mut self, coord: ChunkCoord, local: LocalPos) {
        let mut neighbors = Vec::with_capacity(2);
        if local.x == 0 {
            neighbors.push(coord.offset(-1, 0));
        } else if local.x == CHUNK_SIZE_X - 1 {
            neighbors.push(coord.offset(1, 0));
        }
        if local.z == 0 {
            neighbors.push(coord.offset(0, -1));
        } else if local.z == CHUNK_SIZE_Z - 1 {
            neighbors.push(coord.offset(0, 1));
        }
        for neighbor in neighbors {
            if let Some(resident) = self.chunks.get_mut(&neighbor) {
                resident.chunk.mark_dirty();
            }
        }
    }
}

impl Default for ChunkManager {
    fn default() -> Self {
        Self::new(ChunkManagerConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
