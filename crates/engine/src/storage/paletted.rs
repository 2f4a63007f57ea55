use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::bit_packed::BitPackedArray;
use crate::world::block::StateId;
use crate::world::position::ChunkDims;

/// Block storage for one chunk: a local palette of global state ids plus a
/// bit-packed array of local indices.
///
/// Local id 0 is always air. Local ids past the end of the palette read as
/// air instead of panicking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PalettedStorage {
    dims: ChunkDims,
    palette: Vec<StateId>,
    data: BitPackedArray,
}

impl PalettedStorage {
    /// All-air storage. Uses no packed words until something else is set.
    pub fn new(dims: ChunkDims) -> Self {
        Self {
            dims,
            palette: vec![StateId::AIR],
            data: BitPackedArray::new(0, dims.volume()),
        }
    }

    /// Build from a dense YZX-ordered array in one pass, sizing the packed
    /// array once for the final palette.
    pub fn from_dense(dims: ChunkDims, blocks: &[StateId]) -> Self {
        debug_assert_eq!(blocks.len(), dims.volume());
        let mut palette = vec![StateId::AIR];
        let mut local = Vec::with_capacity(blocks.len());
        for &id in blocks {
            let index = match palette.iter().position(|&p| p == id) {
                Some(i) => i,
                None => {
                    palette.push(id);
                    palette.len() - 1
                }
            };
            local.push(index as u32);
        }

        let mut data = BitPackedArray::new(BitPackedArray::bits_for(palette.len()), dims.volume());
        for (i, index) in local.into_iter().enumerate() {
            data.set(i, index);
        }
        Self { dims, palette, data }
    }

    /// Rebuild from persisted parts. `None` if the parts are inconsistent.
    pub fn from_parts(dims: ChunkDims, palette: Vec<StateId>, data: BitPackedArray) -> Option<Self> {
        if palette.first() != Some(&StateId::AIR)
            || data.len() != dims.volume()
            || data.bits() < BitPackedArray::bits_for(palette.len())
        {
            return None;
        }
        Some(Self { dims, palette, data })
    }

    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    /// Global id at local coordinates. Out-of-range coordinates read as air.
    pub fn get(&self, x: u32, y: u32, z: u32) -> StateId {
        if x >= self.dims.width || z >= self.dims.width || y >= self.dims.height {
            return StateId::AIR;
        }
        self.get_index(self.dims.index(x, y, z))
    }

    #[inline]
    pub fn get_index(&self, index: usize) -> StateId {
        let local = self.data.get(index) as usize;
        self.palette.get(local).copied().unwrap_or(StateId::AIR)
    }

    /// Store a global id. Appends to the local palette and widens the packed
    /// array when the palette outgrows the current width. Returns `false` for
    /// out-of-range coordinates.
    pub fn set(&mut self, x: u32, y: u32, z: u32, id: StateId) -> bool {
        if x >= self.dims.width || z >= self.dims.width || y >= self.dims.height {
            return false;
        }
        let local = self.local_id_or_insert(id);
        self.data.set(self.dims.index(x, y, z), local);
        true
    }

    fn local_id_or_insert(&mut self, id: StateId) -> u32 {
        if let Some(i) = self.palette.iter().position(|&p| p == id) {
            return i as u32;
        }
        let bits = BitPackedArray::bits_for(self.palette.len() + 1);
        if bits > self.data.bits() {
            self.data = self.data.resized(bits);
        }
        self.palette.push(id);
        (self.palette.len() - 1) as u32
    }

    /// Drop palette entries no block references any more and shrink the
    /// packed width to match. Air stays at local id 0.
    pub fn compact(&mut self) {
        let mut used = vec![false; self.palette.len()];
        used[0] = true;
        for i in 0..self.data.len() {
            if let Some(slot) = used.get_mut(self.data.get(i) as usize) {
                *slot = true;
            }
        }
        if used.iter().all(|&u| u) {
            return;
        }

        let mut remap = vec![0u32; self.palette.len()];
        let mut palette = Vec::with_capacity(used.len());
        for (old, &in_use) in used.iter().enumerate() {
            if in_use {
                remap[old] = palette.len() as u32;
                palette.push(self.palette[old]);
            }
        }

        let mut data = BitPackedArray::new(BitPackedArray::bits_for(palette.len()), self.data.len());
        for i in 0..self.data.len() {
            let old = self.data.get(i) as usize;
            data.set(i, remap.get(old).copied().unwrap_or(0));
        }

        tracing::trace!(
            "Compacted chunk palette {} -> {} entries",
            self.palette.len(),
            palette.len()
        );
        self.palette = palette;
        self.data = data;
    }

    /// Deep copy for lock-free readers.
    pub fn snapshot(&self) -> StorageSnapshot {
        StorageSnapshot {
            inner: Arc::new(self.clone()),
        }
    }

    /// Expand to one global id per block, YZX order.
    pub fn to_dense(&self) -> Vec<StateId> {
        (0..self.dims.volume()).map(|i| self.get_index(i)).collect()
    }

    pub fn palette(&self) -> &[StateId] {
        &self.palette
    }

    pub fn palette_len(&self) -> usize {
        self.palette.len()
    }

    pub fn bits(&self) -> u8 {
        self.data.bits()
    }

    pub fn packed(&self) -> &BitPackedArray {
        &self.data
    }

    /// True when every block is air.
    pub fn is_empty(&self) -> bool {
        (0..self.data.len()).all(|i| self.get_index(i).is_air())
    }
}

/// Immutable copy of a chunk's storage, readable from any thread without
/// locking. Cloning shares the copy.
#[derive(Clone, Debug)]
pub struct StorageSnapshot {
    inner: Arc<PalettedStorage>,
}

impl StorageSnapshot {
    #[inline]
    pub fn get(&self, index: usize) -> StateId {
        self.inner.get_index(index)
    }

    pub fn get_xyz(&self, x: u32, y: u32, z: u32) -> StateId {
        self.inner.get(x, y, z)
    }

    pub fn dims(&self) -> ChunkDims {
        self.inner.dims
    }

    pub fn palette(&self) -> &[StateId] {
        self.inner.palette()
    }

    pub fn to_dense(&self) -> Vec<StateId> {
        self.inner.to_dense()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> ChunkDims {
        ChunkDims::new(4, 8)
    }

    #[test]
    fn new_storage_is_air_with_zero_width() {
        let storage = PalettedStorage::new(dims());
        assert_eq!(storage.bits(), 0);
        assert_eq!(storage.palette(), &[StateId::AIR]);
        assert_eq!(storage.get(1, 2, 3), StateId::AIR);
        assert!(storage.is_empty());
    }

    #[test]
    fn out_of_range_reads_air_and_rejects_writes() {
        let mut storage = PalettedStorage::new(dims());
        assert!(!storage.set(4, 0, 0, StateId(3)));
        assert!(!storage.set(0, 8, 0, StateId(3)));
        assert_eq!(storage.get(0, 99, 0), StateId::AIR);
    }

    #[test]
    fn width_grows_with_palette() {
        let mut storage = PalettedStorage::new(dims());
        storage.set(0, 0, 0, StateId(10));
        assert_eq!(storage.bits(), 1);
        storage.set(1, 0, 0, StateId(11));
        assert_eq!(storage.bits(), 2);
        storage.set(2, 0, 0, StateId(12));
        storage.set(3, 0, 0, StateId(13));
        assert_eq!(storage.bits(), 3);
        assert_eq!(storage.get(0, 0, 0), StateId(10));
        assert_eq!(storage.get(3, 0, 0), StateId(13));
    }

    #[test]
    fn compact_drops_unused_entries() {
        let mut storage = PalettedStorage::new(dims());
        for (i, id) in [5, 6, 7, 8].into_iter().enumerate() {
            storage.set(i as u32, 0, 0, StateId(id));
        }
        for x in 0..3 {
            storage.set(x, 0, 0, StateId::AIR);
        }
        storage.compact();
        assert_eq!(storage.palette(), &[StateId::AIR, StateId(8)]);
        assert_eq!(storage.bits(), 1);
        assert_eq!(storage.get(3, 0, 0), StateId(8));
        assert_eq!(storage.get(0, 0, 0), StateId::AIR);
    }

    #[test]
    fn dense_roundtrip() {
        let d = dims();
        let dense: Vec<StateId> = (0..d.volume()).map(|i| StateId((i % 3) as u32)).collect();
        let storage = PalettedStorage::from_dense(d, &dense);
        assert_eq!(storage.to_dense(), dense);
        assert_eq!(storage.palette_len(), 3);
    }

    #[test]
    fn from_parts_rejects_inconsistent_data() {
        let d = dims();
        let ok = PalettedStorage::from_dense(d, &vec![StateId(2); d.volume()]);
        let rebuilt = PalettedStorage::from_parts(d, ok.palette().to_vec(), ok.packed().clone());
        assert_eq!(rebuilt.as_ref(), Some(&ok));
        assert!(PalettedStorage::from_parts(d, vec![StateId(2)], ok.packed().clone()).is_none());
        assert!(PalettedStorage::from_parts(
            d,
            vec![StateId::AIR, StateId(1), StateId(2)],
            BitPackedArray::new(1, d.volume())
        )
        .is_none());
    }
}
