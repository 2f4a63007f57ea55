//! Process-wide bijection between [`BlockState`]s and dense [`StateId`]s.
//!
//! The palette is *baked* once after every block is registered: air states
//! first, everything else ordered by registration name, states of one block in
//! property-enumeration order. Lookups before baking fail with
//! [`PaletteError::NotBaked`].

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::registry::{BlockState, Registry};
use crate::world::block::StateId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaletteError {
    #[error("global palette used before bake()")]
    NotBaked,
    #[error("block state {0} is not in the palette")]
    UnknownState(String),
    #[error("state id {0} is out of range")]
    InvalidId(u32),
}

/// Per-id behavior bits, precomputed at bake time for hot paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateFlags {
    pub air: bool,
    pub solid: bool,
    pub fluid: bool,
}

#[derive(Default)]
pub struct GlobalPalette {
    states: Vec<Arc<BlockState>>,
    ids: HashMap<BlockState, StateId>,
    flags: Vec<StateFlags>,
    baked: bool,
}

impl GlobalPalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign ids to every registered state. Calling it again is a no-op.
    pub fn bake(&mut self, registry: &Registry) {
        if self.baked {
            return;
        }

        let mut states: Vec<Arc<BlockState>> = registry.all_states().cloned().collect();
        // Stable sort: states of one block keep their enumeration order.
        states.sort_by(|a, b| {
            b.block()
                .is_air()
                .cmp(&a.block().is_air())
                .then_with(|| a.block().name().cmp(b.block().name()))
        });

        self.ids = states
            .iter()
            .enumerate()
            .map(|(i, s)| ((**s).clone(), StateId(i as u32)))
            .collect();
        self.flags = states
            .iter()
            .map(|s| StateFlags {
                air: s.block().is_air(),
                solid: s.block().is_solid(),
                fluid: s.block().is_fluid(),
            })
            .collect();
        self.states = states;
        self.baked = true;

        tracing::debug!(
            "Global palette baked: {} states from {} blocks",
            self.states.len(),
            registry.block_count()
        );
    }

    /// Drop the current mapping and bake again from `registry`.
    pub fn rebake(&mut self, registry: &Registry) {
        self.states.clear();
        self.ids.clear();
        self.flags.clear();
        self.baked = false;
        self.bake(registry);
    }

    pub fn is_baked(&self) -> bool {
        self.baked
    }

    pub fn state_id(&self, state: &BlockState) -> Result<StateId, PaletteError> {
        if !self.baked {
            return Err(PaletteError::NotBaked);
        }
        self.ids
            .get(state)
            .copied()
            .ok_or_else(|| PaletteError::UnknownState(state.descriptor()))
    }

    pub fn state(&self, id: StateId) -> Result<&Arc<BlockState>, PaletteError> {
        if !self.baked {
            return Err(PaletteError::NotBaked);
        }
        self.states
            .get(id.0 as usize)
            .ok_or(PaletteError::InvalidId(id.0))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Flags for `id`. Unknown ids read as air.
    pub fn flags(&self, id: StateId) -> StateFlags {
        self.flags.get(id.0 as usize).copied().unwrap_or(StateFlags {
            air: true,
            solid: false,
            fluid: false,
        })
    }

    pub fn is_solid(&self, id: StateId) -> bool {
        self.flags(id).solid
    }

    pub fn is_fluid(&self, id: StateId) -> bool {
        self.flags(id).fluid
    }

    pub fn is_air(&self, id: StateId) -> bool {
        self.flags(id).air
    }

    /// Canonical descriptors indexed by id, sent to clients at join time.
    pub fn descriptors(&self) -> Vec<String> {
        self.states.iter().map(|s| s.descriptor()).collect()
    }
}
