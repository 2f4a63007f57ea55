use glam::DVec3;

use crate::world::position::BlockPos;

/// Overlap tolerance: boxes that merely touch a block face do not collide.
const TOUCH_EPSILON: f64 = 1e-7;

/// Box dimensions of an entity, anchored at the feet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySize {
    pub width: f64,
    pub height: f64,
}

impl BodySize {
    /// Player-sized default: 0.6 wide, 1.8 tall.
    pub const DEFAULT: BodySize = BodySize {
        width: 0.6,
        height: 1.8,
    };
}

impl Default for BodySize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Axis-aligned box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Box whose bottom face is centered on `feet`.
    pub fn from_feet(feet: DVec3, size: BodySize) -> Self {
        let half = size.width / 2.0;
        Self {
            min: DVec3::new(feet.x - half, feet.y, feet.z - half),
            max: DVec3::new(feet.x + half, feet.y + size.height, feet.z + half),
        }
    }

    /// The unit block cube at `pos`.
    pub fn block(pos: BlockPos) -> Self {
        let min = DVec3::new(f64::from(pos.x), f64::from(pos.y), f64::from(pos.z));
        Self {
            min,
            max: min + DVec3::ONE,
        }
    }

    pub fn offset(&self, by: DVec3) -> Self {
        Self {
            min: self.min + by,
            max: self.max + by,
        }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x - TOUCH_EPSILON
            && self.max.x > other.min.x + TOUCH_EPSILON
            && self.min.y < other.max.y - TOUCH_EPSILON
            && self.max.y > other.min.y + TOUCH_EPSILON
            && self.min.z < other.max.z - TOUCH_EPSILON
            && self.max.z > other.min.z + TOUCH_EPSILON
    }

    /// Every block cell the box overlaps by more than a touch.
    pub fn cells(&self) -> impl Iterator<Item = BlockPos> {
        let lo = (self.min + DVec3::splat(TOUCH_EPSILON)).floor();
        let hi = (self.max - DVec3::splat(TOUCH_EPSILON)).ceil();
        let (x0, y0, z0) = (lo.x as i32, lo.y as i32, lo.z as i32);
        let (x1, y1, z1) = (hi.x as i32, hi.y as i32, hi.z as i32);
        (x0..x1).flat_map(move |x| (y0..y1).flat_map(move |y| (z0..z1).map(move |z| BlockPos::new(x, y, z))))
    }
}
