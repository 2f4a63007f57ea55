//! Layered terrain generation.
//!
//! A [`TerrainGenerator`] is an ordered list of layer functions. Every layer
//! mutates the same [`ChunkScratch`] in place and runs strictly after the one
//! before it; the finished scratch is committed to chunk storage in one go.
//! [`GenerationPool`] runs generators off the tick thread.

pub mod layers;
pub mod noise;
pub mod pool;
pub mod scratch;
pub mod tree;

use std::sync::Arc;

use crate::content::CoreBlocks;
use crate::context::{ContextError, EngineContext};
use crate::registry::{GeneratorKind, TerrainParams, WorldTemplate};
use crate::world::block::StateId;
use crate::world::position::{ChunkDims, ChunkPos};

pub use self::noise::{FbmNoise, NoiseSource};
pub use pool::GenerationPool;
pub use scratch::ChunkScratch;
pub use tree::{chunk_rng, find_surface_y, place_tree};

/// Everything a layer may read. Shared read-only by all workers.
pub struct GenContext {
    pub seed: u64,
    pub dims: ChunkDims,
    pub terrain: TerrainParams,
    pub blocks: CoreBlocks,
    pub noise: Arc<dyn NoiseSource>,
    pub engine: Arc<EngineContext>,
}

impl GenContext {
    /// Context for a world built from `template` with `seed`, using fBm noise.
    pub fn new(
        engine: Arc<EngineContext>,
        template: &WorldTemplate,
        seed: u64,
    ) -> Result<Self, ContextError> {
        let terrain = template.terrain.clone();
        let noise = Arc::new(FbmNoise::new(seed, terrain.octaves, terrain.frequency));
        Ok(Self {
            seed,
            dims: template.chunk_dims,
            blocks: CoreBlocks::resolve(&engine)?,
            terrain,
            noise,
            engine,
        })
    }

    pub fn with_noise(mut self, noise: Arc<dyn NoiseSource>) -> Self {
        self.noise = noise;
        self
    }

    #[inline]
    pub fn is_solid(&self, id: StateId) -> bool {
        self.engine.palette().is_solid(id)
    }
}

/// A generation layer: mutate the scratch for chunk `pos` in place.
pub type LayerFn = fn(&mut ChunkScratch, ChunkPos, &GenContext);

/// An ordered chain of layers.
pub struct TerrainGenerator {
    layers: Vec<(&'static str, LayerFn)>,
}

impl TerrainGenerator {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Base density, water, surface, features.
    pub fn layered() -> Self {
        Self::new()
            .with_layer("base_density", layers::base_density)
            .with_layer("water", layers::water)
            .with_layer("surface", layers::surface)
            .with_layer("features", layers::features)
    }

    /// A flat platform at chunk (0, 0), air everywhere else.
    pub fn spawn_platform() -> Self {
        Self::new().with_layer("spawn_platform", layers::spawn_platform)
    }

    pub fn for_kind(kind: GeneratorKind) -> Self {
        match kind {
            GeneratorKind::Layered => Self::layered(),
            GeneratorKind::SpawnPlatform => Self::spawn_platform(),
        }
    }

    pub fn with_layer(mut self, name: &'static str, layer: LayerFn) -> Self {
        self.layers.push((name, layer));
        self
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.layers.iter().map(|(name, _)| *name)
    }

    /// Run every layer in order on a fresh all-air scratch.
    pub fn generate(&self, pos: ChunkPos, ctx: &GenContext) -> ChunkScratch {
        let mut scratch = ChunkScratch::new(ctx.dims);
        for (_, layer) in &self.layers {
            layer(&mut scratch, pos, ctx);
        }
        scratch
    }
}

impl Default for TerrainGenerator {
    fn default() -> Self {
        Self::new()
    }
}
