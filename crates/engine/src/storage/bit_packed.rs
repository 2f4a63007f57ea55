//! Fixed-width unsigned integers packed into `u64` words.
//!
//! Entries never straddle a word boundary: a word holds `64 / bits` entries
//! and the leftover high bits stay zero. That costs a little space at odd
//! widths but keeps `get`/`set` to one word access.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitPackedArray {
    data: Vec<u64>,
    bits: u8,
    len: usize,
}

impl BitPackedArray {
    pub const MAX_BITS: u8 = 32;

    /// `len` zeroed entries of `bits` bits each. Width 0 stores nothing and
    /// reads every entry as 0.
    pub fn new(bits: u8, len: usize) -> Self {
        assert!(bits <= Self::MAX_BITS, "bit width {bits} exceeds 32");
        let data = if bits == 0 {
            Vec::new()
        } else {
            vec![0; len.div_ceil(Self::per_word(bits))]
        };
        Self { data, bits, len }
    }

    /// Minimum width able to hold every value in `0..count`.
    pub fn bits_for(count: usize) -> u8 {
        if count <= 1 {
            0
        } else {
            (usize::BITS - (count - 1).leading_zeros()) as u8
        }
    }

    #[inline]
    const fn per_word(bits: u8) -> usize {
        64 / bits as usize
    }

    #[inline]
    fn mask(&self) -> u64 {
        (1u64 << self.bits) - 1
    }

    #[inline]
    fn locate(&self, index: usize) -> (usize, u32) {
        let per_word = Self::per_word(self.bits);
        (index / per_word, ((index % per_word) * self.bits as usize) as u32)
    }

    /// Value at `index`; indices past the end read as 0.
    #[inline]
    pub fn get(&self, index: usize) -> u32 {
        if self.bits == 0 || index >= self.len {
            return 0;
        }
        let (word, shift) = self.locate(index);
        ((self.data[word] >> shift) & self.mask()) as u32
    }

    /// Store `value` at `index`. Values wider than the current width are
    /// truncated; callers grow the array first.
    #[inline]
    pub fn set(&mut self, index: usize, value: u32) {
        if self.bits == 0 || index >= self.len {
            return;
        }
        debug_assert!(
            u64::from(value) <= self.mask(),
            "value {value} does not fit in {} bits",
            self.bits
        );
        let mask = self.mask();
        let (word, shift) = self.locate(index);
        self.data[word] &= !(mask << shift);
        self.data[word] |= (u64::from(value) & mask) << shift;
    }

    /// Copy of this array at a different width. Values that do not fit the
    /// new width are truncated.
    pub fn resized(&self, bits: u8) -> Self {
        let mut out = Self::new(bits, self.len);
        if self.bits > 0 && bits > 0 {
            for i in 0..self.len {
                out.set(i, self.get(i));
            }
        }
        out
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn raw_data(&self) -> &[u64] {
        &self.data
    }

    /// Rebuild from persisted parts. `None` if the word count does not match
    /// `bits` and `len`.
    pub fn from_raw(bits: u8, len: usize, data: Vec<u64>) -> Option<Self> {
        if bits > Self::MAX_BITS {
            return None;
        }
        let expected = if bits == 0 { 0 } else { len.div_ceil(Self::per_word(bits)) };
        (data.len() == expected).then_some(Self { data, bits, len })
    }
}
