//! The local player: predicted with the server's physics, corrected by the
//! server's state.

use glam::DVec3;
use uuid::Uuid;
use voxelcraft_engine::entity::{physics, Entity, MoveInput, Vitals};
use voxelcraft_engine::protocol::{ClientMessage, PlayerState};
use voxelcraft_engine::world::BlockSource;

use crate::prediction::{reconcile, Correction};

pub struct ClientPlayer {
    entity: Entity,
    input: MoveInput,
    seq: u32,
    ticks_per_second: u32,
    last_server_tick: u64,
}

impl ClientPlayer {
    pub fn new(id: Uuid, name: &str, spawn: DVec3, ticks_per_second: u32) -> Self {
        Self {
            entity: Entity::player(id, name, spawn),
            input: MoveInput::default(),
            seq: 0,
            ticks_per_second,
            last_server_tick: 0,
        }
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn position(&self) -> DVec3 {
        self.entity.position()
    }

    pub fn input(&self) -> MoveInput {
        self.input
    }

    pub fn last_server_tick(&self) -> u64 {
        self.last_server_tick
    }

    /// Use `input` from now on. Returns the message telling the server,
    /// or `None` if nothing changed.
    pub fn apply_input(&mut self, input: MoveInput) -> Option<ClientMessage> {
        if input == self.input {
            return None;
        }
        self.input = input;
        self.seq = self.seq.wrapping_add(1);
        Some(ClientMessage::Input { seq: self.seq, input })
    }

    /// Advance the local prediction by `delta` seconds, exactly as the
    /// server steps the authoritative entity.
    pub fn predict(&mut self, blocks: &impl BlockSource, delta: f64) -> bool {
        self.entity.transform.begin_tick();
        physics::apply_input(&mut self.entity, self.input, self.ticks_per_second, delta);
        physics::step(&mut self.entity, blocks, delta)
    }

    /// Correct the prediction against the server. Camera, hotbar slot and
    /// vitals are taken as they are; only the position is reconciled.
    pub fn reconcile(&mut self, state: &PlayerState) -> Correction {
        let predicted = self.entity.position();
        let correction = reconcile(predicted, state.position);
        self.entity.transform.position = correction.apply(predicted);
        if correction.is_snap() {
            self.entity.transform.prev_position = state.prev_position;
            if let Some(body) = self.entity.physics.as_mut() {
                body.velocity = state.velocity;
                body.on_ground = state.on_ground;
            }
        }

        let t = &mut self.entity.transform;
        t.yaw = state.yaw;
        t.pitch = state.pitch;
        t.prev_yaw = state.prev_yaw;
        t.prev_pitch = state.prev_pitch;
        if let Some(inventory) = self.entity.inventory.as_mut() {
            inventory.select(usize::from(state.selected_slot));
        }
        self.entity.vitals = Some(Vitals::new(state.health, state.hunger));
        self.last_server_tick = state.tick;
        correction
    }
}
