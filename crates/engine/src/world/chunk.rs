use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use super::block::StateId;
use super::position::{BlockPos, ChunkDims, ChunkPos, LocalPos};
use crate::storage::{PalettedStorage, StorageSnapshot};

/// Lifecycle of a loaded chunk.
///
/// `New -> Generating | DataLoaded -> Ready -> Invalid`. Nothing outside the
/// generator may treat a chunk as holding terrain before `Ready`, and an
/// `Invalid` chunk has already been flushed and dropped from its world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ChunkState {
    New = 0,
    Generating = 1,
    DataLoaded = 2,
    Ready = 3,
    Invalid = 4,
}

impl ChunkState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::New,
            1 => Self::Generating,
            2 => Self::DataLoaded,
            3 => Self::Ready,
            _ => Self::Invalid,
        }
    }
}

/// A column of blocks owned by one world.
///
/// Block storage sits behind a per-chunk `RwLock`: the tick thread writes,
/// generation workers commit, and mesh or network readers take a
/// [`StorageSnapshot`] and read it without any lock.
pub struct Chunk {
    pos: ChunkPos,
    dims: ChunkDims,
    state: AtomicU8,
    storage: RwLock<PalettedStorage>,
    dirty: AtomicBool,
    entities_dirty: AtomicBool,
    entities: Mutex<HashSet<Uuid>>,
}

impl Chunk {
    pub fn new(pos: ChunkPos, dims: ChunkDims) -> Self {
        Self {
            pos,
            dims,
            state: AtomicU8::new(ChunkState::New as u8),
            storage: RwLock::new(PalettedStorage::new(dims)),
            dirty: AtomicBool::new(false),
            entities_dirty: AtomicBool::new(false),
            entities: Mutex::new(HashSet::new()),
        }
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    pub fn state(&self) -> ChunkState {
        ChunkState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: ChunkState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Atomically move `from -> to`. False if the chunk was not in `from`.
    pub fn transition(&self, from: ChunkState, to: ChunkState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ChunkState::Ready
    }

    /// Install generated storage and flip to `Ready`. Does nothing unless the
    /// chunk is still `Generating`, so a chunk unloaded mid-generation stays
    /// `Invalid` and the result is discarded.
    pub fn commit(&self, storage: PalettedStorage) -> bool {
        let mut guard = self.storage.write();
        if self.state() != ChunkState::Generating {
            return false;
        }
        *guard = storage;
        self.set_state(ChunkState::Ready);
        true
    }

    /// Install storage read back from the chunk store: `DataLoaded`, then `Ready`.
    pub fn load(&self, storage: PalettedStorage) {
        let mut guard = self.storage.write();
        *guard = storage;
        self.set_state(ChunkState::DataLoaded);
        self.set_state(ChunkState::Ready);
    }

    /// Raw block read. Out-of-column positions read as air.
    pub fn get_block(&self, local: LocalPos) -> StateId {
        self.storage.read().get(local.x, local.y, local.z)
    }

    /// Write a block and mark the chunk dirty.
    pub fn set_block(&self, local: LocalPos, id: StateId) -> bool {
        let written = self.storage.write().set(local.x, local.y, local.z, id);
        if written {
            self.dirty.store(true, Ordering::Release);
        }
        written
    }

    /// Deep copy of the packed storage, taken under the read lock.
    pub fn create_snapshot(&self) -> StorageSnapshot {
        self.storage.read().snapshot()
    }

    /// Clone of the storage for persistence.
    pub fn storage(&self) -> PalettedStorage {
        self.storage.read().clone()
    }

    pub fn compact(&self) {
        self.storage.write().compact();
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Read and clear the dirty flag.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    pub fn is_entities_dirty(&self) -> bool {
        self.entities_dirty.load(Ordering::Acquire)
    }

    pub fn mark_entities_dirty(&self) {
        self.entities_dirty.store(true, Ordering::Release);
    }

    pub fn take_entities_dirty(&self) -> bool {
        self.entities_dirty.swap(false, Ordering::AcqRel)
    }

    pub fn track_entity(&self, id: Uuid) {
        if self.entities.lock().insert(id) {
            self.mark_entities_dirty();
        }
    }

    pub fn untrack_entity(&self, id: Uuid) -> bool {
        let removed = self.entities.lock().remove(&id);
        if removed {
            self.mark_entities_dirty();
        }
        removed
    }

    pub fn tracked_entities(&self) -> Vec<Uuid> {
        self.entities.lock().iter().copied().collect()
    }

    /// World-space block bounds: `(min, max)` with `max` exclusive.
    pub fn bounding_box(&self) -> (BlockPos, BlockPos) {
        let min = self.pos.block_origin(self.dims, 0);
        let w = self.dims.width as i32;
        (min, min.offset(w, self.dims.height as i32, w))
    }
}
