use serde::{Deserialize, Serialize};

/// Size of every chunk in a world: `width` x `height` x `width` blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkDims {
    pub width: u32,
    pub height: u32,
}

impl ChunkDims {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn volume(&self) -> usize {
        (self.width as usize) * (self.width as usize) * (self.height as usize)
    }

    /// Flat index in YZX order (x fastest) for cache-friendly vertical scans.
    #[inline]
    pub const fn index(&self, x: u32, y: u32, z: u32) -> usize {
        ((y as usize) * (self.width as usize) + (z as usize)) * (self.width as usize) + (x as usize)
    }

    /// Inverse of [`index`](Self::index).
    pub const fn coords(&self, index: usize) -> LocalPos {
        let w = self.width as usize;
        LocalPos {
            x: (index % w) as u32,
            z: ((index / w) % w) as u32,
            y: (index / (w * w)) as u32,
        }
    }

    pub const fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && z >= 0
            && y >= 0
            && (x as u32) < self.width
            && (z as u32) < self.width
            && (y as u32) < self.height
    }
}

impl Default for ChunkDims {
    fn default() -> Self {
        Self::new(16, 128)
    }
}

/// Absolute block position in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The block containing a world-space point.
    pub fn containing(x: f64, y: f64, z: f64) -> Self {
        Self::new(x.floor() as i32, y.floor() as i32, z.floor() as i32)
    }

    /// The chunk column this block belongs to.
    pub const fn chunk(&self, dims: ChunkDims) -> ChunkPos {
        let w = dims.width as i32;
        ChunkPos {
            x: self.x.div_euclid(w),
            z: self.z.div_euclid(w),
        }
    }

    /// Position within the chunk, or `None` when `y` is outside the column.
    pub const fn local(&self, dims: ChunkDims) -> Option<LocalPos> {
        if self.y < 0 || self.y as u32 >= dims.height {
            return None;
        }
        let w = dims.width as i32;
        Some(LocalPos {
            x: self.x.rem_euclid(w) as u32,
            y: self.y as u32,
            z: self.z.rem_euclid(w) as u32,
        })
    }

    pub const fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// The six cardinal neighbors.
    pub const fn neighbors(&self) -> [BlockPos; 6] {
        [
            self.offset(1, 0, 0),
            self.offset(-1, 0, 0),
            self.offset(0, 1, 0),
            self.offset(0, -1, 0),
            self.offset(0, 0, 1),
            self.offset(0, 0, -1),
        ]
    }
}

/// Chunk column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Packed 64-bit key: `(x << 32) | (z & 0xFFFFFFFF)`. Shared with save
    /// files, so the layout must not change.
    pub const fn key(&self) -> i64 {
        ((self.x as i64) << 32) | ((self.z as i64) & 0xFFFF_FFFF)
    }

    pub const fn from_key(key: i64) -> Self {
        Self {
            x: (key >> 32) as i32,
            z: key as i32,
        }
    }

    pub const fn block_origin(&self, dims: ChunkDims, y: i32) -> BlockPos {
        let w = dims.width as i32;
        BlockPos::new(self.x * w, y, self.z * w)
    }

    /// Chebyshev distance in chunks.
    pub fn distance(&self, other: ChunkPos) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }
}

/// Block position local to a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalPos {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl LocalPos {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_bit_exact() {
        assert_eq!(ChunkPos::new(1, 2).key(), (1i64 << 32) | 2);
        assert_eq!(ChunkPos::new(0, -1).key(), 0xFFFF_FFFF);
        assert_eq!(ChunkPos::new(-1, 0).key(), -1i64 << 32);
        for pos in [
            ChunkPos::new(0, 0),
            ChunkPos::new(-7, 13),
            ChunkPos::new(i32::MIN, i32::MAX),
            ChunkPos::new(i32::MAX, i32::MIN),
        ] {
            assert_eq!(ChunkPos::from_key(pos.key()), pos);
        }
    }

    #[test]
    fn negative_blocks_map_to_negative_chunks() {
        let dims = ChunkDims::default();
        let pos = BlockPos::new(-1, 10, -17);
        assert_eq!(pos.chunk(dims), ChunkPos::new(-1, -2));
        assert_eq!(pos.local(dims), Some(LocalPos::new(15, 10, 15)));
    }

    #[test]
    fn out_of_column_y_has_no_local_position() {
        let dims = ChunkDims::default();
        assert_eq!(BlockPos::new(0, -1, 0).local(dims), None);
        assert_eq!(BlockPos::new(0, 128, 0).local(dims), None);
    }

    #[test]
    fn index_and_coords_are_inverse() {
        let dims = ChunkDims::new(4, 8);
        for i in 0..dims.volume() {
            let p = dims.coords(i);
            assert_eq!(dims.index(p.x, p.y, p.z), i);
        }
    }
}
