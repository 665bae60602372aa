//! Headless stand-in for the game loop.

use std::time::Duration;

use cubeworld_voxel::{
    ChunkCoord, ChunkManager, GenerationPipeline, GrowthState, MAX_Y, MIN_Y, MeshHandle,
    MeshTeardown, WorldPos, world_to_chunk,
};
use rustc_hash::FxHashSet;

/// Pause between ticks while waiting on worker threads.
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Fake renderer: hands out mesh handles for dirty visible chunks.
#[derive(Debug, Default)]
pub struct MeshRegistry {
    next: u64,
    live: FxHashSet<MeshHandle>,
    pub built: u64,
    pub released: u64,
}

impl MeshRegistry {
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// (Re)builds the mesh of every visible, generated, dirty chunk.
    pub fn remesh(&mut self, manager: &mut ChunkManager, visible: &[ChunkCoord]) -> usize {
        let mut rebuilt = 0;
        for &coord in visible {
            let Some(chunk) = manager.chunk_mut(coord) else {
                continue;
            };
            if !chunk.is_generated() || !chunk.is_dirty() {
                continue;
            }
            if let Some(old) = chunk.take_mesh() {
                self.release(old);
            }
            self.next += 1;
            let mesh = MeshHandle(self.next);
            self.live.insert(mesh);
            chunk.set_mesh(Some(mesh));
            chunk.clear_dirty();
            self.built += 1;
            rebuilt += 1;
        }
        rebuilt
    }

    fn release(&mut self, mesh: MeshHandle) {
        if self.live.remove(&mesh) {
            self.released += 1;
        } else {
            tracing::warn!(?mesh, "release of unknown mesh");
        }
    }
}

impl MeshTeardown for MeshRegistry {
    fn delete_chunk_mesh(&mut self, coord: ChunkCoord, mesh: MeshHandle) {
        tracing::trace!(%coord, ?mesh, "mesh released");
        self.release(mesh);
    }
}

/// World, growth, pipeline and renderer driven from one player position.
pub struct Session {
    pub manager: ChunkManager,
    pub growth: GrowthState,
    pub meshes: MeshRegistry,
    pipeline: Box<dyn GenerationPipeline>,
    /// Player position; only x and z drive loading.
    pub position: [f64; 3],
}

impl Session {
    pub fn new(
        manager: ChunkManager,
        growth: GrowthState,
        pipeline: Box<dyn GenerationPipeline>,
        position: [f64; 3],
    ) -> Self {
        Self {
            manager,
            growth,
            meshes: MeshRegistry::default(),
            pipeline,
            position,
        }
    }

    /// One frame: working-set update followed by meshing.
    pub fn tick(&mut self) -> Vec<ChunkCoord> {
        let mut restored: Vec<WorldPos> = Vec::new();
        let mut on_restored = |keys: &[WorldPos]| restored.extend_from_slice(keys);
        let visible = self.manager.update_visible_chunks(
            self.position[0],
            self.position[2],
            self.pipeline.as_mut(),
            &mut self.meshes,
            &mut self.growth,
            Some(&mut on_restored),
        );
        for key in &restored {
            tracing::info!(%key, "plant state restored");
        }
        self.meshes.remesh(&mut self.manager, &visible);
        visible
    }

    pub fn player_chunk(&self) -> ChunkCoord {
        world_to_chunk(self.position[0].floor() as i32, self.position[2].floor() as i32).chunk
    }

    /// Whether every in-world chunk of the render zone is generated.
    pub fn render_zone_ready(&self) -> bool {
        let center = self.player_chunk();
        let radius = self.manager.config().render_radius as i32;
        (-radius..=radius).all(|dx| {
            (-radius..=radius).all(|dz| {
                let coord = center.offset(dx, dz);
                !self.manager.in_world(coord)
                    || self.manager.chunk(coord).is_some_and(|c| c.is_generated())
            })
        })
    }

    /// Ticks until the render zone is generated; returns the ticks spent.
    pub fn settle(&mut self, max_ticks: u32) -> u32 {
        for tick in 1..=max_ticks {
            self.tick();
            if self.render_zone_ready() {
                return tick;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        tracing::warn!(max_ticks, chunk = %self.player_chunk(), "render zone still generating");
        max_ticks
    }

    /// Moves in a straight line in steps of at most `step` blocks, ticking
    /// after each step.
    pub fn walk_to(&mut self, x: f64, z: f64, step: f64) -> u32 {
        let dx = x - self.position[0];
        let dz = z - self.position[2];
        let steps = (dx.abs().max(dz.abs()) / step.max(1.0)).ceil().max(1.0) as u32;
        let start = self.position;
        for i in 1..=steps {
            let t = f64::from(i) / f64::from(steps);
            self.position[0] = start[0] + dx * t;
            self.position[2] = start[2] + dz * t;
            self.tick();
        }
        steps
    }

    /// Height of the topmost non-air block in column (x, z).
    pub fn surface_y(&self, x: i32, z: i32) -> Option<i32> {
        (MIN_Y..MAX_Y)
            .rev()
            .find(|&y| !self.manager.get_block(x, y, z).is_air())
    }
}

// ---- Tests ----
