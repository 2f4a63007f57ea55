//! Server-authoritative voxel world engine.
//!
//! Content is registered into a [`registry::Registry`], frozen into an
//! [`context::EngineContext`] (which bakes the [`palette::GlobalPalette`]),
//! and shared by reference with every [`world::World`]. Chunks store global
//! state ids in paletted, bit-packed [`storage`]; terrain comes from the
//! layered [`generation`] pipeline running on a worker pool; entities are
//! composed from optional components and moved by the [`entity::physics`]
//! step. [`viewport`] and [`protocol`] cover what the server sends to whom.

pub mod content;
pub mod context;
pub mod entity;
pub mod generation;
pub mod palette;
pub mod protocol;
pub mod registry;
pub mod storage;
pub mod viewport;
pub mod world;

pub use context::EngineContext;
pub use world::block::StateId;
pub use world::World;
