use serde::{Deserialize, Serialize};

/// Dense global block-state identifier, assigned by the baked
/// [`GlobalPalette`](crate::palette::GlobalPalette).
///
/// Chunk storage, generation scratch buffers and the wire protocol carry these
/// instead of `BlockState`s. The only id with a fixed meaning is
/// [`StateId::AIR`]: air states bake first, so id 0 is always air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct StateId(pub u32);

impl StateId {
    pub const AIR: StateId = StateId(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_air(self) -> bool {
        self.0 == 0
    }
}
