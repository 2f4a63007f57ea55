//! Block, item and world-template registry.
//!
//! Registration is additive and happens once at startup. Every block state is
//! precomputed here (cartesian product of the block's property domains) so
//! that the [`GlobalPalette`](crate::palette::GlobalPalette) can later assign
//! dense ids without touching the definitions again.

pub mod block;
pub mod item;
pub mod name;
pub mod property;
pub mod state;
pub mod template;

use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

pub use block::{BlockDef, Material};
pub use item::{Item, ItemDef};
pub use name::RegName;
pub use property::{Property, PropertyKind, PropertyValue};
pub use state::BlockState;
pub use template::{GeneratorKind, TerrainParams, WorldTemplate};

/// Content errors. All of these are programmer/content mistakes and abort startup.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid registry name {0:?} (expected namespace:identifier)")]
    InvalidName(String),
    #[error("block {0} is already registered")]
    DuplicateBlock(RegName),
    #[error("item {0} is already registered")]
    DuplicateItem(RegName),
    #[error("world template {0} is already registered")]
    DuplicateTemplate(RegName),
    #[error("invalid property: {0}")]
    InvalidProperty(String),
}

struct BlockEntry {
    def: Arc<BlockDef>,
    states: Vec<Arc<BlockState>>,
}

/// Process content catalog, frozen once wrapped in an
/// [`EngineContext`](crate::context::EngineContext).
#[derive(Default)]
pub struct Registry {
    blocks: IndexMap<RegName, BlockEntry>,
    items: IndexMap<RegName, Arc<Item>>,
    templates: IndexMap<RegName, Arc<WorldTemplate>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a block type and precompute all of its states.
    pub fn register_block(&mut self, def: BlockDef) -> Result<Arc<BlockDef>, RegistryError> {
        if self.blocks.contains_key(def.name()) {
            return Err(RegistryError::DuplicateBlock(def.name().clone()));
        }
        let def = Arc::new(def);
        let states = property::cartesian_product(def.properties())
            .into_iter()
            .map(|values| Arc::new(BlockState::new(Arc::clone(&def), values)))
            .collect();
        self.blocks.insert(
            def.name().clone(),
            BlockEntry {
                def: Arc::clone(&def),
                states,
            },
        );
        Ok(def)
    }

    pub fn block(&self, name: &RegName) -> Option<Arc<BlockDef>> {
        self.blocks.get(name).map(|e| Arc::clone(&e.def))
    }

    /// Look a block up by its textual name. Malformed names are simply absent.
    pub fn block_by_str(&self, name: &str) -> Option<Arc<BlockDef>> {
        RegName::parse(name).ok().and_then(|n| self.block(&n))
    }

    pub fn states_of(&self, name: &RegName) -> Option<&[Arc<BlockState>]> {
        self.blocks.get(name).map(|e| e.states.as_slice())
    }

    /// The first state in enumeration order (every property at its first value).
    pub fn default_state(&self, name: &RegName) -> Option<Arc<BlockState>> {
        self.states_of(name).and_then(|s| s.first().cloned())
    }

    /// Blocks in registration order.
    pub fn blocks(&self) -> impl Iterator<Item = &Arc<BlockDef>> {
        self.blocks.values().map(|e| &e.def)
    }

    /// Every precomputed state, grouped by block in registration order.
    pub fn all_states(&self) -> impl Iterator<Item = &Arc<BlockState>> {
        self.blocks.values().flat_map(|e| e.states.iter())
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn register_item(&mut self, def: ItemDef) -> Result<Arc<Item>, RegistryError> {
        if self.items.contains_key(&def.name) {
            return Err(RegistryError::DuplicateItem(def.name));
        }
        let item = Arc::new(Item::new(
            self.items.len() as u32,
            def.name.clone(),
            def.max_stack,
            def.block,
        ));
        self.items.insert(def.name, Arc::clone(&item));
        Ok(item)
    }

    pub fn item(&self, name: &RegName) -> Option<Arc<Item>> {
        self.items.get(name).cloned()
    }

    pub fn item_by_id(&self, id: u32) -> Option<Arc<Item>> {
        self.items.get_index(id as usize).map(|(_, item)| Arc::clone(item))
    }

    pub fn items(&self) -> impl Iterator<Item = &Arc<Item>> {
        self.items.values()
    }

    pub fn register_template(
        &mut self,
        template: WorldTemplate,
    ) -> Result<Arc<WorldTemplate>, RegistryError> {
        if self.templates.contains_key(&template.name) {
            return Err(RegistryError::DuplicateTemplate(template.name));
        }
        let template = Arc::new(template);
        self.templates
            .insert(template.name.clone(), Arc::clone(&template));
        Ok(template)
    }

    pub fn template(&self, name: &RegName) -> Option<Arc<WorldTemplate>> {
        self.templates.get(name).cloned()
    }
}
