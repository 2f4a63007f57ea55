//! Breaking and placing blocks along an entity's line of sight.

use uuid::Uuid;

use super::block::StateId;
use super::position::BlockPos;
use super::World;
use crate::entity::aabb::Aabb;
use crate::entity::raycast;

/// A single block edit made on behalf of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockChange {
    pub pos: BlockPos,
    pub state: StateId,
}

impl World {
    /// Break the block `id` is looking at and give it the block's item.
    ///
    /// Unbreakable blocks (infinite hardness) and targets outside loaded
    /// chunks are left alone.
    pub fn break_target(&mut self, id: &Uuid) -> Option<BlockChange> {
        let hit = raycast::cast_from(self.entities.get(id)?, &self.blocks())?;
        let block = self.ctx.palette().state(hit.state).ok()?.block().clone();
        if block.hardness().is_infinite() {
            return None;
        }
        if !self.set_block(hit.pos, StateId::AIR) {
            return None;
        }

        if let Some(item) = self.ctx.registry().item(block.name()) {
            if let Some(entity) = self.entities.get_mut(id) {
                if let Some(inventory) = entity.inventory.as_mut() {
                    if inventory.insert(&item, 1) > 0 {
                        tracing::debug!("Inventory of {} is full, dropping {}", id, item.name());
                    }
                    entity.dirty = true;
                }
            }
        }
        tracing::trace!("{} broke {} at {:?}", id, block.name(), hit.pos);
        Some(BlockChange {
            pos: hit.pos,
            state: StateId::AIR,
        })
    }

    /// Place the block of the selected hotbar item against the face `id` is
    /// looking at, consuming one item.
    ///
    /// Refused when the target cell is solid or a solid block would overlap
    /// the entity's own box.
    pub fn place_target(&mut self, id: &Uuid) -> Option<BlockChange> {
        let entity = self.entities.get(id)?;
        let hit = raycast::cast_from(entity, &self.blocks())?;
        let target = hit.adjacent();
        if self.is_solid(target) {
            return None;
        }

        let stack = entity.inventory.as_ref()?.selected_stack()?;
        let block = stack.item().block()?;
        let default = self.ctx.registry().default_state(block)?;
        let state = self.ctx.palette().state_id(&default).ok()?;

        let palette = self.ctx.palette();
        let blocked = palette.is_solid(state)
            && entity
                .bounding_box()
                .is_some_and(|body| Aabb::block(target).intersects(&body));
        if blocked || !self.set_block(target, state) {
            return None;
        }

        if let Some(entity) = self.entities.get_mut(id) {
            if let Some(inventory) = entity.inventory.as_mut() {
                inventory.take_selected();
            }
            entity.dirty = true;
        }
        Some(BlockChange { pos: target, state })
    }
}
