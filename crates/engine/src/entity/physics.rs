//! Discrete-step entity physics: gravity, per-axis collision against solid
//! blocks in X, Z, Y order, then friction.
//!
//! Everything here is a pure function of the entity, the input and the block
//! layout, so the client can run the exact same step for prediction.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::aabb::{Aabb, BodySize};
use super::Entity;
use crate::world::BlockSource;

/// Longest step integrated at once, in seconds.
pub const MAX_STEP: f64 = 0.1;
/// Blocks per second squared.
pub const GRAVITY: f64 = 32.0;
pub const JUMP_VELOCITY: f64 = 9.0;
/// Horizontal velocity multiplier per step while grounded.
pub const GROUND_FRICTION: f64 = 0.6;
/// Horizontal velocity multiplier per step while airborne.
pub const AIR_FRICTION: f64 = 0.91;
/// Velocity gained per nominal tick of full input.
pub const GROUND_ACCEL: f64 = 2.9;
pub const AIR_ACCEL: f64 = 0.4;
pub const SPRINT_FACTOR: f64 = 1.3;
/// How far below the feet the ground check probes.
const GROUND_PROBE: f64 = 1e-3;

/// One tick of movement intent. `forward` and `strafe` are in `[-1, 1]`;
/// positive strafe is to the right.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MoveInput {
    pub forward: f32,
    pub strafe: f32,
    pub jump: bool,
    pub sprint: bool,
}

impl MoveInput {
    pub fn is_idle(&self) -> bool {
        self.forward == 0.0 && self.strafe == 0.0 && !self.jump
    }

    pub fn is_finite(&self) -> bool {
        self.forward.is_finite() && self.strafe.is_finite()
    }
}

/// Clamp an input axis to `[-1, 1]`; NaN and infinities count as no input.
fn input_axis(value: f32) -> f64 {
    if value.is_finite() {
        f64::from(value.clamp(-1.0, 1.0))
    } else {
        0.0
    }
}

/// Turn input into velocity. Acceleration is scaled by how many nominal
/// ticks `delta` covers at `ticks_per_second`.
pub fn apply_input(entity: &mut Entity, input: MoveInput, ticks_per_second: u32, delta: f64) {
    let yaw = f64::from(entity.transform.yaw).to_radians();
    let Some(body) = entity.physics.as_mut() else {
        return;
    };

    let forward = DVec3::new(-yaw.sin(), 0.0, yaw.cos());
    let right = DVec3::new(-yaw.cos(), 0.0, -yaw.sin());
    let mut wish = forward * input_axis(input.forward) + right * input_axis(input.strafe);
    if wish.length_squared() > 1.0 {
        wish = wish.normalize();
    }

    let scale = delta.min(MAX_STEP) * f64::from(ticks_per_second.max(1));
    let mut accel = if body.on_ground { GROUND_ACCEL } else { AIR_ACCEL };
    if input.sprint && input_axis(input.forward) > 0.0 {
        accel *= SPRINT_FACTOR;
    }
    body.velocity += wish * accel * scale;

    if input.jump && body.on_ground {
        body.velocity.y = JUMP_VELOCITY;
        body.on_ground = false;
    }
}

/// Advance one step of `delta` seconds (clamped to [`MAX_STEP`]). Returns
/// whether the position changed; a moved entity is marked dirty.
pub fn step(entity: &mut Entity, blocks: &impl BlockSource, delta: f64) -> bool {
    let dt = delta.clamp(0.0, MAX_STEP);
    let start = entity.transform.position;
    let Some(body) = entity.physics.as_mut() else {
        return false;
    };
    let size = *body.size.get_or_insert(BodySize::DEFAULT);

    if body.gravity {
        body.velocity.y -= GRAVITY * dt;
    }
    let displacement = body.velocity * dt;

    let mut pos = start;
    for axis in [0, 2, 1] {
        if move_axis(&mut pos, size, axis, displacement[axis], blocks) {
            body.velocity[axis] = 0.0;
            if axis == 1 && displacement.y < 0.0 {
                body.on_ground = true;
            }
        }
    }

    let probe = Aabb::from_feet(pos, size).offset(DVec3::new(0.0, -GROUND_PROBE, 0.0));
    if !collides(&probe, blocks) {
        body.on_ground = false;
    }

    let friction = if body.on_ground { GROUND_FRICTION } else { AIR_FRICTION };
    body.velocity.x *= friction;
    body.velocity.z *= friction;

    entity.transform.position = pos;
    let moved = pos != start;
    if moved {
        entity.dirty = true;
    }
    moved
}

/// Whether any solid block overlaps `bbox`.
pub fn collides(bbox: &Aabb, blocks: &impl BlockSource) -> bool {
    bbox.cells().any(|cell| blocks.is_solid(cell))
}

/// Move `pos` along one axis by `d`. When blocked, advance only up to the
/// nearest blocking face, or roll back entirely if that still collides.
/// Returns whether the axis was blocked.
fn move_axis(pos: &mut DVec3, size: BodySize, axis: usize, d: f64, blocks: &impl BlockSource) -> bool {
    if d == 0.0 {
        return false;
    }
    let mut moved = *pos;
    moved[axis] += d;
    let swept = Aabb::from_feet(moved, size);
    if !collides(&swept, blocks) {
        *pos = moved;
        return false;
    }

    let origin = Aabb::from_feet(*pos, size);
    let mut allowed = d;
    let mut found = false;
    for cell in swept.cells().filter(|c| blocks.is_solid(*c)) {
        let cell_min = f64::from([cell.x, cell.y, cell.z][axis]);
        if d > 0.0 {
            let gap = cell_min - origin.max[axis];
            if gap >= 0.0 {
                allowed = allowed.min(gap);
                found = true;
            }
        } else {
            let gap = cell_min + 1.0 - origin.min[axis];
            if gap <= 0.0 {
                allowed = allowed.max(gap);
                found = true;
            }
        }
    }

    if found {
        let mut contact = *pos;
        contact[axis] += allowed;
        if !collides(&Aabb::from_feet(contact, size), blocks) {
            *pos = contact;
        }
    }
    true
}
