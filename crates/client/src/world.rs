//! Client-side mirror of the chunks the server has streamed to us.

use std::collections::HashMap;

use dashmap::DashMap;
use voxelcraft_engine::protocol::ChunkPayload;
use voxelcraft_engine::storage::PalettedStorage;
use voxelcraft_engine::world::position::{BlockPos, ChunkDims, ChunkPos};
use voxelcraft_engine::world::BlockSource;
use voxelcraft_engine::{EngineContext, StateId};

/// Solidity of every server state id, resolved against local content by
/// descriptor so the two palettes do not have to agree on ids.
#[derive(Debug, Clone)]
pub struct ClientPalette {
    descriptors: Vec<String>,
    solid: Vec<bool>,
}

impl ClientPalette {
    pub fn new(descriptors: Vec<String>, ctx: &EngineContext) -> Self {
        let local = ctx.palette();
        let by_descriptor: HashMap<String, StateId> = local
            .descriptors()
            .into_iter()
            .enumerate()
            .map(|(i, d)| (d, StateId(i as u32)))
            .collect();

        let mut unknown = 0;
        let solid = descriptors
            .iter()
            .map(|d| match by_descriptor.get(d) {
                Some(&id) => local.is_solid(id),
                None => {
                    unknown += 1;
                    false
                }
            })
            .collect();
        if unknown > 0 {
            tracing::warn!(
                "{} of {} server block states are unknown locally and will be treated as air",
                unknown,
                descriptors.len()
            );
        }
        Self { descriptors, solid }
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptor(&self, id: StateId) -> Option<&str> {
        self.descriptors.get(id.0 as usize).map(String::as_str)
    }

    /// Unknown ids are not solid.
    pub fn is_solid(&self, id: StateId) -> bool {
        self.solid.get(id.0 as usize).copied().unwrap_or(false)
    }
}

pub struct ClientWorld {
    dims: ChunkDims,
    palette: ClientPalette,
    chunks: DashMap<ChunkPos, PalettedStorage>,
}

impl ClientWorld {
    pub fn new(dims: ChunkDims, palette: ClientPalette) -> Self {
        Self {
            dims,
            palette,
            chunks: DashMap::new(),
        }
    }

    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    pub fn palette(&self) -> &ClientPalette {
        &self.palette
    }

    /// Store a streamed chunk, replacing any previous copy. False if the
    /// payload does not decode or has the wrong dimensions.
    pub fn load_chunk(&self, pos: ChunkPos, payload: ChunkPayload) -> bool {
        if payload.dims != self.dims {
            tracing::warn!("Chunk {:?} arrived with dims {:?}, expected {:?}", pos, payload.dims, self.dims);
            return false;
        }
        match payload.into_storage() {
            Some(storage) => {
                self.chunks.insert(pos, storage);
                true
            }
            None => {
                tracing::warn!("Dropping malformed chunk {:?}", pos);
                false
            }
        }
    }

    pub fn unload_chunk(&self, pos: ChunkPos) -> bool {
        self.chunks.remove(&pos).is_some()
    }

    /// Apply a single block change. Ignored if the chunk is not held.
    pub fn set_block(&self, pos: BlockPos, state: StateId) -> bool {
        let Some(local) = pos.local(self.dims) else {
            return false;
        };
        match self.chunks.get_mut(&pos.chunk(self.dims)) {
            Some(mut chunk) => {
                chunk.set(local.x, local.y, local.z, state);
                true
            }
            None => false,
        }
    }

    pub fn has_chunk(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn loaded_chunks(&self) -> Vec<ChunkPos> {
        self.chunks.iter().map(|c| *c.key()).collect()
    }
}

impl BlockSource for ClientWorld {
    fn block(&self, pos: BlockPos) -> StateId {
        let Some(local) = pos.local(self.dims) else {
            return StateId::AIR;
        };
        self.chunks
            .get(&pos.chunk(self.dims))
            .map_or(StateId::AIR, |c| c.get(local.x, local.y, local.z))
    }

    fn is_solid(&self, pos: BlockPos) -> bool {
        self.palette.is_solid(self.block(pos))
    }
}
