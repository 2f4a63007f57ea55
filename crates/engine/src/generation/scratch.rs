use crate::storage::PalettedStorage;
use crate::world::block::StateId;
use crate::world::position::ChunkDims;

/// Dense global-id buffer the generation layers write into. Committed to
/// packed storage once, after the last layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkScratch {
    dims: ChunkDims,
    blocks: Vec<StateId>,
}

impl ChunkScratch {
    pub fn new(dims: ChunkDims) -> Self {
        Self {
            dims,
            blocks: vec![StateId::AIR; dims.volume()],
        }
    }

    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    /// Block at local coordinates; anything outside the chunk is air.
    pub fn get(&self, x: i32, y: i32, z: i32) -> StateId {
        if !self.dims.contains(x, y, z) {
            return StateId::AIR;
        }
        self.blocks[self.dims.index(x as u32, y as u32, z as u32)]
    }

    /// Writes outside the chunk are dropped.
    pub fn set(&mut self, x: i32, y: i32, z: i32, id: StateId) {
        if self.dims.contains(x, y, z) {
            let i = self.dims.index(x as u32, y as u32, z as u32);
            self.blocks[i] = id;
        }
    }

    pub fn blocks(&self) -> &[StateId] {
        &self.blocks
    }

    pub fn into_storage(self) -> PalettedStorage {
        PalettedStorage::from_dense(self.dims, &self.blocks)
    }
}
