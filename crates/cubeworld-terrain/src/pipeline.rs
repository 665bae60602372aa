//! Generation pipelines delivering [`TerrainPopulator`] output to the manager.
//!
//! [`SyncPipeline`] populates inside `submit` so the chunk is ready on the
//! next `drain` of the same tick. [`AsyncPipeline`] offloads population to a
//! worker pool fed by bounded channels and supports best-effort cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use cubeworld_voxel::{
    BlockCatalog, ChunkCoord, GenerationPipeline, GenerationRequest, GenerationResponse,
    GenerationTicket, TerrainPopulator, run_populator,
};
use dashmap::DashMap;
use thiserror::Error;

/// Errors raised while building a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A worker thread could not be started.
    #[error("failed to spawn generation worker: {0}")]
    Spawn(#[from] std::io::Error),
    /// At least one worker is required.
    #[error("generation pipeline needs at least one worker thread")]
    NoWorkers,
}

// ---------------------------------------------------------------------------
// Synchronous
// ---------------------------------------------------------------------------

/// Runs the populator on the calling thread.
pub struct SyncPipeline<P> {
    populator: P,
    catalog: BlockCatalog,
    ready: Vec<GenerationResponse>,
}

impl<P: TerrainPopulator> SyncPipeline<P> {
    pub fn new(populator: P, catalog: BlockCatalog) -> Self {
        Self {
            populator,
            catalog,
            ready: Vec::new(),
        }
    }
}

impl<P: TerrainPopulator> GenerationPipeline for SyncPipeline<P> {
    fn submit(&mut self, request: GenerationRequest) -> Result<(), GenerationRequest> {
        let response = run_populator(&self.populator, &self.catalog, &request);
        self.ready.push(response);
        Ok(())
    }

    fn drain(&mut self) -> Vec<GenerationResponse> {
        std::mem::take(&mut self.ready)
    }

    fn cancel(&mut self, coord: ChunkCoord, ticket: GenerationTicket) {
        self.ready.retain(|r| r.coord != coord || r.ticket != ticket);
    }
}

// ---------------------------------------------------------------------------
// Worker pool
// ---------------------------------------------------------------------------

type TaskKey = (ChunkCoord, GenerationTicket);

/// A queued request and its cancellation flag.
struct QueuedTask {
    request: GenerationRequest,
    cancelled: Arc<AtomicBool>,
}

/// Worker count sized from the CPU count, leaving headroom for the main thread.
pub fn default_worker_count() -> usize {
    let cpus = num_cpus::get().max(2);
    (cpus - 2).max(1)
}

/// Populates chunks on background threads.
///
/// Completed chunks are collected with [`GenerationPipeline::drain`] once per
/// tick on the main thread. Workers exit once the pipeline is dropped.
pub struct AsyncPipeline {
    task_sender: Sender<QueuedTask>,
    result_receiver: Receiver<GenerationResponse>,
    /// Cancellation flag per outstanding request.
    active_tasks: Arc<DashMap<TaskKey, Arc<AtomicBool>>>,
    /// Requests queued or executing.
    in_flight: Arc<AtomicU64>,
    worker_count: usize,
}

impl AsyncPipeline {
    /// Starts `thread_count` workers sharing `populator`.
    ///
    /// - `max_queued`: submissions beyond this many queued tasks are rejected.
    /// - `result_capacity`: completed chunks buffered before workers block.
    pub fn new<P>(
        populator: P,
        catalog: BlockCatalog,
        thread_count: usize,
        max_queued: usize,
        result_capacity: usize,
    ) -> Result<Self, PipelineError>
    where
        P: TerrainPopulator + 'static,
    {
        if thread_count == 0 {
            return Err(PipelineError::NoWorkers);
        }
        let (task_sender, task_receiver) = bounded::<QueuedTask>(max_queued.max(1));
        let (result_sender, result_receiver) = bounded::<GenerationResponse>(result_capacity.max(1));
        let populator: Arc<dyn TerrainPopulator> = Arc::new(populator);
        let catalog = Arc::new(catalog);
        let in_flight = Arc::new(AtomicU64::new(0));

        for index in 0..thread_count {
            let receiver = task_receiver.clone();
            let sender = result_sender.clone();
            let populator = Arc::clone(&populator);
            let catalog = Arc::clone(&catalog);
            let in_flight = Arc::clone(&in_flight);

            std::thread::Builder::new()
                .name(format!("chunk-gen-{index}"))
                .spawn(move || {
                    while let Ok(task) = receiver.recv() {
                        if task.cancelled.load(Ordering::Relaxed) {
                            in_flight.fetch_sub(1, Ordering::Relaxed);
                            continue;
                        }

                        let response = run_populator(populator.as_ref(), &catalog, &task.request);

                        let delivered = task.cancelled.load(Ordering::Relaxed)
                            || sender.send(response).is_ok();
                        in_flight.fetch_sub(1, Ordering::Relaxed);
                        if !delivered {
                            break;
                        }
                    }
                })?;
        }

        tracing::debug!(workers = thread_count, max_queued, "generation pipeline started");
        Ok(Self {
            task_sender,
            result_receiver,
            active_tasks: Arc::new(DashMap::new()),
            in_flight,
            worker_count: thread_count,
        })
    }

    /// Pool of [`default_worker_count`] threads with default queue sizes.
    pub fn with_defaults<P>(populator: P, catalog: BlockCatalog) -> Result<Self, PipelineError>
    where
        P: TerrainPopulator + 'static,
    {
        Self::new(populator, catalog, default_worker_count(), 128, 256)
    }

    /// Requests queued or executing.
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Whether a request for this chunk instance is outstanding.
    pub fn is_pending(&self, coord: ChunkCoord, ticket: GenerationTicket) -> bool {
        self.active_tasks.contains_key(&(coord, ticket))
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }
}

impl GenerationPipeline for AsyncPipeline {
    fn submit(&mut self, request: GenerationRequest) -> Result<(), GenerationRequest> {
        let key = (request.coord, request.ticket);
        let cancelled = Arc::new(AtomicBool::new(false));
        self.active_tasks.insert(key, Arc::clone(&cancelled));
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        self.task_sender
            .try_send(QueuedTask { request, cancelled })
            .map_err(|e| {
                self.in_flight.fetch_sub(1, Ordering::Relaxed);
                self.active_tasks.remove(&key);
                e.into_inner().request
            })
    }

    fn drain(&mut self) -> Vec<GenerationResponse> {
        let mut results = Vec::new();
        while let Ok(response) = self.result_receiver.try_recv() {
            self.active_tasks.remove(&(response.coord, response.ticket));
            results.push(response);
        }
        results
    }

    fn cancel(&mut self, coord: ChunkCoord, ticket: GenerationTicket) {
        if let Some((_, cancelled)) = self.active_tasks.remove(&(coord, ticket)) {
            cancelled.store(true, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use cubeworld_voxel::{BlockId, CHUNK_VOLUME};

    use crate::populator::HeightmapPopulator;

    fn request(x: i32, z: i32, ticket: u64) -> GenerationRequest {
        GenerationRequest {
            coord: ChunkCoord::new(x, z),
            ticket: GenerationTicket(ticket),
            seed: 42,
            priority: 0,
        }
    }

    fn drain_until(pipeline: &mut AsyncPipeline, expected: usize) -> Vec<GenerationResponse> {
        let mut results = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(30);
        while results.len() < expected && Instant::now() < deadline {
            results.extend(pipeline.drain());
            if results.len() < expected {
                std::thread::sleep(Duration::from_millis(5));
            }
        }
        results
    }

    #[test]
    fn test_sync_pipeline_answers_on_next_drain() {
        let mut pipeline = SyncPipeline::new(HeightmapPopulator::default(), BlockCatalog::standard());
        assert!(pipeline.submit(request(0, 0, 1)).is_ok());
        assert!(pipeline.submit(request(1, 0, 2)).is_ok());
        let results = pipeline.drain();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.blocks.len() == CHUNK_VOLUME));
        assert!(pipeline.drain().is_empty());
    }

    #[test]
    fn test_sync_pipeline_cancel_drops_undrained() {
        let mut pipeline = SyncPipeline::new(HeightmapPopulator::default(), BlockCatalog::standard());
        pipeline.submit(request(0, 0, 1)).unwrap();
        pipeline.submit(request(0, 0, 2)).unwrap();
        pipeline.cancel(ChunkCoord::new(0, 0), GenerationTicket(1));
        let results = pipeline.drain();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].ticket, GenerationTicket(2));
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        let result = AsyncPipeline::new(HeightmapPopulator::default(), BlockCatalog::standard(), 0, 8, 8);
        assert!(matches!(result, Err(PipelineError::NoWorkers)));
    }

    #[test]
    fn test_default_pool_has_workers() {
        let pipeline =
            AsyncPipeline::with_defaults(HeightmapPopulator::default(), BlockCatalog::standard())
                .unwrap();
        assert_eq!(pipeline.worker_count(), default_worker_count());
        assert!(pipeline.worker_count() >= 1);
    }

    #[test]
    fn test_concurrent_generation_delivers_everything() {
        let mut pipeline =
            AsyncPipeline::new(HeightmapPopulator::default(), BlockCatalog::standard(), 4, 64, 64)
                .unwrap();
        let mut submitted = 0;
        for x in 0..6 {
            for z in 0..6 {
                if pipeline.submit(request(x, z, (x * 6 + z) as u64)).is_ok() {
                    submitted += 1;
                }
            }
        }
        assert_eq!(submitted, 36);

        let results = drain_until(&mut pipeline, submitted);
        assert_eq!(results.len(), submitted);
        for response in &results {
            assert_eq!(response.blocks.len(), CHUNK_VOLUME);
            assert_eq!(response.blocks[0], BlockId::BEDROCK);
            assert!(!pipeline.is_pending(response.coord, response.ticket));
        }
    }

    #[test]
    fn test_async_matches_sync_output() {
        let mut sync = SyncPipeline::new(HeightmapPopulator::default(), BlockCatalog::standard());
        let mut pool =
            AsyncPipeline::new(HeightmapPopulator::default(), BlockCatalog::standard(), 2, 8, 8)
                .unwrap();
        sync.submit(request(-3, 5, 1)).unwrap();
        pool.submit(request(-3, 5, 1)).unwrap();
        let expected = sync.drain().remove(0);
        let actual = drain_until(&mut pool, 1).remove(0);
        assert_eq!(expected.blocks, actual.blocks);
    }

    #[test]
    fn test_full_queue_returns_request() {
        let mut pipeline =
            AsyncPipeline::new(HeightmapPopulator::default(), BlockCatalog::standard(), 1, 1, 1)
                .unwrap();
        let mut rejected = None;
        for i in 0..64 {
            if let Err(returned) = pipeline.submit(request(i, 0, i as u64)) {
                rejected = Some(returned);
                break;
            }
        }
        let rejected = rejected.expect("a bounded queue must eventually refuse");
        assert!(!pipeline.is_pending(rejected.coord, rejected.ticket));
    }

    #[test]
    fn test_cancel_clears_pending() {
        let mut pipeline =
            AsyncPipeline::new(HeightmapPopulator::default(), BlockCatalog::standard(), 1, 16, 16)
                .unwrap();
        pipeline.submit(request(50, 50, 1)).unwrap();
        pipeline.cancel(ChunkCoord::new(50, 50), GenerationTicket(1));
        assert!(!pipeline.is_pending(ChunkCoord::new(50, 50), GenerationTicket(1)));

        let deadline = Instant::now() + Duration::from_secs(10);
        while pipeline.in_flight_count() > 0 && Instant::now() < deadline {
            let _ = pipeline.drain();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(pipeline.in_flight_count(), 0);
    }
}
