//! Entities as a base record plus optional components.
//!
//! Every entity has an id, a kind and a [`Transform`]. Physics, vitals,
//! inventory and player control are attached only where they apply, and the
//! systems in [`physics`] and [`vitals`] act on whichever entities carry the
//! components they need.

pub mod aabb;
pub mod inventory;
pub mod physics;
pub mod raycast;
pub mod vitals;

use std::collections::HashMap;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registry::{RegName, Registry};
use crate::world::position::{ChunkDims, ChunkPos};

pub use aabb::{Aabb, BodySize};
pub use inventory::{Inventory, ItemStack};
pub use physics::MoveInput;
pub use vitals::Vitals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Creature,
}

/// Position and camera orientation, with the previous tick's values kept for
/// interpolation. Angles are in degrees; positive pitch looks down.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub position: DVec3,
    pub prev_position: DVec3,
    pub yaw: f32,
    pub pitch: f32,
    pub prev_yaw: f32,
    pub prev_pitch: f32,
}

impl Transform {
    pub fn at(position: DVec3) -> Self {
        Self {
            position,
            prev_position: position,
            ..Default::default()
        }
    }

    /// Roll current values into the `prev_*` fields.
    pub fn begin_tick(&mut self) {
        self.prev_position = self.position;
        self.prev_yaw = self.yaw;
        self.prev_pitch = self.pitch;
    }

    /// Turn by a camera delta. Pitch is clamped short of straight up/down,
    /// yaw wraps to `[0, 360)`.
    pub fn rotate(&mut self, dyaw: f32, dpitch: f32) {
        if !dyaw.is_finite() || !dpitch.is_finite() {
            return;
        }
        self.yaw = (self.yaw + dyaw).rem_euclid(360.0);
        self.pitch = (self.pitch + dpitch).clamp(-89.9, 89.9);
    }
}

/// Velocity and collision state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsBody {
    pub velocity: DVec3,
    pub on_ground: bool,
    /// Filled in with [`BodySize::DEFAULT`] on the first physics step.
    pub size: Option<BodySize>,
    pub gravity: bool,
}

impl Default for PhysicsBody {
    fn default() -> Self {
        Self {
            velocity: DVec3::ZERO,
            on_ground: false,
            size: None,
            gravity: true,
        }
    }
}

/// Player-specific state: the name and the latest movement input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerControl {
    pub name: String,
    pub input: MoveInput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: Uuid,
    pub kind: EntityKind,
    pub transform: Transform,
    pub physics: Option<PhysicsBody>,
    pub vitals: Option<Vitals>,
    pub inventory: Option<Inventory>,
    pub control: Option<PlayerControl>,
    /// Chunk the entity is tracked in, if any.
    pub chunk: Option<ChunkPos>,
    /// Changed since the last save or sync.
    pub dirty: bool,
}

impl Entity {
    /// Bare entity: transform only.
    pub fn new(id: Uuid, kind: EntityKind, position: DVec3) -> Self {
        Self {
            id,
            kind,
            transform: Transform::at(position),
            physics: None,
            vitals: None,
            inventory: None,
            control: None,
            chunk: None,
            dirty: true,
        }
    }

    /// A living, physical creature.
    pub fn creature(id: Uuid, position: DVec3) -> Self {
        Self {
            physics: Some(PhysicsBody::default()),
            vitals: Some(Vitals::default()),
            ..Self::new(id, EntityKind::Creature, position)
        }
    }

    /// A player: physics, vitals, inventory and control.
    pub fn player(id: Uuid, name: impl Into<String>, position: DVec3) -> Self {
        Self {
            physics: Some(PhysicsBody::default()),
            vitals: Some(Vitals::default()),
            inventory: Some(Inventory::new()),
            control: Some(PlayerControl {
                name: name.into(),
                input: MoveInput::default(),
            }),
            ..Self::new(id, EntityKind::Player, position)
        }
    }

    pub fn position(&self) -> DVec3 {
        self.transform.position
    }

    pub fn chunk_pos(&self, dims: ChunkDims) -> ChunkPos {
        let w = f64::from(dims.width);
        let p = self.transform.position;
        ChunkPos::new((p.x / w).floor() as i32, (p.z / w).floor() as i32)
    }

    pub fn on_ground(&self) -> bool {
        self.physics.is_some_and(|p| p.on_ground)
    }

    /// Collision box at the current position, if the entity has a body.
    pub fn bounding_box(&self) -> Option<Aabb> {
        self.physics
            .map(|p| Aabb::from_feet(self.transform.position, p.size.unwrap_or_default()))
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        let t = &self.transform;
        EntitySnapshot {
            id: self.id,
            kind: self.kind,
            name: self.control.as_ref().map(|c| c.name.clone()),
            position: t.position,
            velocity: self.physics.map_or(DVec3::ZERO, |p| p.velocity),
            yaw: t.yaw,
            pitch: t.pitch,
            vitals: self.vitals.map(|v| (v.health, v.hunger)),
            selected_slot: self.inventory.as_ref().map_or(0, |i| i.selected_slot() as u8),
            inventory: self.inventory.as_ref().map(|inv| {
                inv.slots()
                    .iter()
                    .map(|s| s.as_ref().map(|s| (s.item().name().clone(), s.count())))
                    .collect()
            }),
        }
    }

    /// Rebuild from a persisted snapshot. Unknown items are dropped.
    pub fn from_snapshot(snapshot: &EntitySnapshot, registry: &Registry) -> Self {
        let mut entity = match (snapshot.kind, &snapshot.name) {
            (EntityKind::Player, Some(name)) => Self::player(snapshot.id, name.clone(), snapshot.position),
            _ => Self::creature(snapshot.id, snapshot.position),
        };
        entity.transform.rotate(snapshot.yaw, snapshot.pitch);
        entity.transform.begin_tick();
        if let Some(body) = entity.physics.as_mut() {
            body.velocity = snapshot.velocity;
        }
        if let (Some(vitals), Some((health, hunger))) = (entity.vitals.as_mut(), snapshot.vitals) {
            *vitals = Vitals::new(health, hunger);
        }
        if let (Some(inv), Some(slots)) = (entity.inventory.as_mut(), &snapshot.inventory) {
            for (i, slot) in slots.iter().enumerate() {
                let stack = slot.as_ref().and_then(|(name, count)| {
                    registry.item(name).and_then(|item| ItemStack::new(item, *count))
                });
                inv.set_slot(i, stack);
            }
            inv.select(usize::from(snapshot.selected_slot));
        }
        entity
    }
}

/// Persisted form of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: Uuid,
    pub kind: EntityKind,
    pub name: Option<String>,
    pub position: DVec3,
    pub velocity: DVec3,
    pub yaw: f32,
    pub pitch: f32,
    /// `(health, hunger)`.
    pub vitals: Option<(f32, f32)>,
    pub inventory: Option<Vec<Option<(RegName, u32)>>>,
    pub selected_slot: u8,
}

/// Entities of one world, keyed by id.
#[derive(Default)]
pub struct EntityStore {
    entities: HashMap<Uuid, Entity>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: Entity) -> Option<Entity> {
        self.entities.insert(entity.id, entity)
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<Entity> {
        self.entities.remove(id)
    }

    pub fn get(&self, id: &Uuid) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.entities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    pub(crate) fn map_mut(&mut self) -> &mut HashMap<Uuid, Entity> {
        &mut self.entities
    }
}
