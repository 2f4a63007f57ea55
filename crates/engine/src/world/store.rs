//! The persistence seam. The engine only needs load-or-absent reads and
//! writes of chunk storage and entity snapshots; when to flush is up to the
//! world's dirty tracking.

use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;
use uuid::Uuid;

use super::position::{ChunkDims, ChunkPos};
use crate::entity::EntitySnapshot;
use crate::storage::PalettedStorage;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt record for {what}: {reason}")]
    Corrupt { what: String, reason: String },
    #[error("could not encode {what}: {reason}")]
    Encode { what: String, reason: String },
}

pub trait ChunkStore: Send + Sync {
    /// `Ok(None)` when the chunk was never saved.
    fn load_chunk(&self, pos: ChunkPos, dims: ChunkDims) -> Result<Option<PalettedStorage>, StoreError>;

    fn save_chunk(&self, pos: ChunkPos, storage: &PalettedStorage) -> Result<(), StoreError>;

    fn load_entity(&self, id: Uuid) -> Result<Option<EntitySnapshot>, StoreError>;

    fn save_entity(&self, snapshot: &EntitySnapshot) -> Result<(), StoreError>;

    /// Push buffered writes to durable storage.
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Keeps everything in memory. Used by tests and throwaway worlds.
#[derive(Default)]
pub struct MemoryStore {
    chunks: Mutex<HashMap<i64, PalettedStorage>>,
    entities: Mutex<HashMap<Uuid, EntitySnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.lock().len()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.lock().len()
    }
}

impl ChunkStore for MemoryStore {
    fn load_chunk(&self, pos: ChunkPos, dims: ChunkDims) -> Result<Option<PalettedStorage>, StoreError> {
        match self.chunks.lock().get(&pos.key()) {
            Some(storage) if storage.dims() != dims => Err(StoreError::Corrupt {
                what: format!("chunk {pos:?}"),
                reason: format!("saved with {:?}, world uses {:?}", storage.dims(), dims),
            }),
            other => Ok(other.cloned()),
        }
    }

    fn save_chunk(&self, pos: ChunkPos, storage: &PalettedStorage) -> Result<(), StoreError> {
        self.chunks.lock().insert(pos.key(), storage.clone());
        Ok(())
    }

    fn load_entity(&self, id: Uuid) -> Result<Option<EntitySnapshot>, StoreError> {
        Ok(self.entities.lock().get(&id).cloned())
    }

    fn save_entity(&self, snapshot: &EntitySnapshot) -> Result<(), StoreError> {
        self.entities.lock().insert(snapshot.id, snapshot.clone());
        Ok(())
    }
}
