//! Procedural terrain for the chunk manager: fBm heightmap population and the
//! synchronous and threaded generation pipelines.

mod heightmap;
mod params;
mod pipeline;
mod populator;

pub use heightmap::{HeightmapParams, HeightmapSampler};
pub use params::GenerationParams;
pub use pipeline::{AsyncPipeline, PipelineError, SyncPipeline, default_worker_count};
pub use populator::{HeightmapPopulator, chunk_rng, derive_chunk_seed};
