//! Compact per-chunk block storage.
//!
//! [`PalettedStorage`] maps the global state ids present in one chunk to a
//! small local id space and keeps those local ids in a [`BitPackedArray`] at
//! the narrowest width that fits. Readers that must not block the writer take
//! a [`StorageSnapshot`].

pub mod bit_packed;
pub mod paletted;

pub use bit_packed::BitPackedArray;
pub use paletted::{PalettedStorage, StorageSnapshot};
