//! The engine context: registry and baked palette, built once at startup and
//! shared by reference with every world, generator and network handler.

use std::sync::Arc;

use thiserror::Error;

use crate::content;
use crate::palette::{GlobalPalette, PaletteError};
use crate::registry::{Registry, RegistryError};

#[derive(Debug, Error)]
pub enum ContextError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Palette(#[from] PaletteError),
}

/// Frozen content. There is no way to get a `&mut Registry` back out, so the
/// palette can never go stale while worlds are running.
pub struct EngineContext {
    registry: Registry,
    palette: GlobalPalette,
}

impl EngineContext {
    /// Freeze `registry` and bake the palette from it.
    pub fn new(registry: Registry) -> Self {
        let mut palette = GlobalPalette::new();
        palette.bake(&registry);
        Self { registry, palette }
    }

    /// Register the core content pack and freeze it.
    pub fn bootstrap() -> Result<Arc<Self>, ContextError> {
        let mut registry = Registry::new();
        content::register_core(&mut registry)?;
        let ctx = Self::new(registry);
        tracing::info!(
            "Engine content ready: {} blocks, {} states, {} items",
            ctx.registry.block_count(),
            ctx.palette.len(),
            ctx.registry.items().count()
        );
        Ok(Arc::new(ctx))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn palette(&self) -> &GlobalPalette {
        &self.palette
    }
}
