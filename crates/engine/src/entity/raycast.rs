//! Block picking by grid traversal (Amanatides & Woo).

use glam::{DVec3, IVec3};

use super::Entity;
use crate::world::block::StateId;
use crate::world::position::BlockPos;
use crate::world::BlockSource;

/// Reach for breaking and placing, in blocks.
pub const MAX_REACH: f64 = 5.0;
/// Eye height above the feet.
pub const EYE_HEIGHT: f64 = 1.62;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub pos: BlockPos,
    /// Outward normal of the face the ray entered through. Zero when the ray
    /// starts inside a solid block.
    pub normal: IVec3,
    pub distance: f64,
    pub state: StateId,
}

impl RayHit {
    /// The cell on the struck face, where a placed block would go.
    pub fn adjacent(&self) -> BlockPos {
        self.pos.offset(self.normal.x, self.normal.y, self.normal.z)
    }
}

/// Unit look direction from yaw/pitch in degrees. Yaw 0 faces +z, positive
/// pitch looks down.
pub fn look_vector(yaw: f32, pitch: f32) -> DVec3 {
    let (yaw, pitch) = (f64::from(yaw).to_radians(), f64::from(pitch).to_radians());
    DVec3::new(-yaw.sin() * pitch.cos(), -pitch.sin(), yaw.cos() * pitch.cos())
}

pub fn eye_position(entity: &Entity) -> DVec3 {
    entity.transform.position + DVec3::new(0.0, EYE_HEIGHT, 0.0)
}

/// First solid block along the entity's line of sight.
pub fn cast_from(entity: &Entity, blocks: &impl BlockSource) -> Option<RayHit> {
    let t = &entity.transform;
    cast(eye_position(entity), look_vector(t.yaw, t.pitch), MAX_REACH, blocks)
}

/// Walk the grid from `origin` along `dir` and return the first solid block
/// within `max_distance`.
pub fn cast(origin: DVec3, dir: DVec3, max_distance: f64, blocks: &impl BlockSource) -> Option<RayHit> {
    let dir = dir.try_normalize()?;
    let mut cell = origin.floor().as_ivec3();
    let step = IVec3::new(sign(dir.x), sign(dir.y), sign(dir.z));
    let t_delta = DVec3::new(inv(dir.x), inv(dir.y), inv(dir.z));
    let mut t_max = DVec3::new(
        first_boundary(origin.x, dir.x, t_delta.x),
        first_boundary(origin.y, dir.y, t_delta.y),
        first_boundary(origin.z, dir.z, t_delta.z),
    );

    let mut normal = IVec3::ZERO;
    let mut t = 0.0;
    loop {
        let pos = BlockPos::new(cell.x, cell.y, cell.z);
        if blocks.is_solid(pos) {
            return Some(RayHit {
                pos,
                normal,
                distance: t,
                state: blocks.block(pos),
            });
        }

        if t_max.x < t_max.y && t_max.x < t_max.z {
            t = t_max.x;
            t_max.x += t_delta.x;
            cell.x += step.x;
            normal = IVec3::new(-step.x, 0, 0);
        } else if t_max.y < t_max.z {
            t = t_max.y;
            t_max.y += t_delta.y;
            cell.y += step.y;
            normal = IVec3::new(0, -step.y, 0);
        } else {
            t = t_max.z;
            t_max.z += t_delta.z;
            cell.z += step.z;
            normal = IVec3::new(0, 0, -step.z);
        }

        if t > max_distance {
            return None;
        }
    }
}

fn sign(v: f64) -> i32 {
    if v >= 0.0 { 1 } else { -1 }
}

fn inv(v: f64) -> f64 {
    if v == 0.0 { f64::INFINITY } else { (1.0 / v).abs() }
}

fn first_boundary(origin: f64, dir: f64, t_delta: f64) -> f64 {
    if dir == 0.0 {
        return f64::INFINITY;
    }
    let frac = origin - origin.floor();
    if dir > 0.0 { (1.0 - frac) * t_delta } else { frac * t_delta }
}
