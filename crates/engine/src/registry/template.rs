use serde::{Deserialize, Serialize};

use super::name::RegName;
use crate::world::position::ChunkDims;

/// Which terrain pipeline a world built from this template runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneratorKind {
    /// Base density -> water -> surface -> features.
    Layered,
    /// A small flat platform at chunk (0, 0), air everywhere else.
    SpawnPlatform,
}

/// Tunables consumed by the terrain layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainParams {
    /// Water fills air below this y.
    pub sea_level: i32,
    /// Height around which the density field crosses zero.
    pub sea_floor: f64,
    /// Noise amplitude in blocks.
    pub amplitude: f64,
    /// Horizontal/vertical noise frequency.
    pub frequency: f64,
    pub octaves: u32,
    /// A tree is attempted where a uniform draw exceeds this.
    pub tree_threshold: f64,
    pub trunk_min: u32,
    pub trunk_max: u32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            sea_level: 48,
            sea_floor: 56.0,
            amplitude: 24.0,
            frequency: 0.02,
            octaves: 4,
            tree_threshold: 0.95,
            trunk_min: 4,
            trunk_max: 6,
        }
    }
}

/// Immutable recipe for creating a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldTemplate {
    pub name: RegName,
    pub ticks_per_second: u32,
    pub chunk_dims: ChunkDims,
    pub generator: GeneratorKind,
    pub terrain: TerrainParams,
}

impl WorldTemplate {
    pub fn new(name: RegName, generator: GeneratorKind) -> Self {
        Self {
            name,
            ticks_per_second: 20,
            chunk_dims: ChunkDims::default(),
            generator,
            terrain: TerrainParams::default(),
        }
    }

    pub fn tick_seconds(&self) -> f64 {
        1.0 / f64::from(self.ticks_per_second.max(1))
    }
}
