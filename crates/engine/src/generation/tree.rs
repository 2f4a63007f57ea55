use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::scratch::ChunkScratch;
use super::GenContext;

/// Widest leaf layer radius. Trees keep this far from chunk edges so they
/// never clip across a chunk boundary.
pub const LEAF_RADIUS: i32 = 2;

/// Deterministic per-chunk RNG seeded from `(world_seed, chunk_x, chunk_z)`.
pub fn chunk_rng(world_seed: u64, chunk_x: i32, chunk_z: i32) -> ChaCha8Rng {
    let mixed = world_seed
        ^ (chunk_x as u32 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (chunk_z as u32 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F).rotate_left(31);
    ChaCha8Rng::seed_from_u64(mixed)
}

/// First non-solid y directly above the highest solid block of column
/// `(x, z)`. `None` for an all-open column or one solid to the top.
pub fn find_surface_y(scratch: &ChunkScratch, x: i32, z: i32, ctx: &GenContext) -> Option<i32> {
    let h = scratch.dims().height as i32;
    let top = (0..h).rev().find(|&y| ctx.is_solid(scratch.get(x, y, z)))?;
    (top + 1 < h).then_some(top + 1)
}

/// Grow a tree whose trunk starts at `(x, y, z)`. Returns the trunk height,
/// or `None` if the tree would not fit under the top of the chunk.
///
/// Leaves form three layers around the top of the trunk; the topmost layer
/// has its radius reduced by one. Leaves only replace air.
pub fn place_tree(
    scratch: &mut ChunkScratch,
    x: i32,
    y: i32,
    z: i32,
    rng: &mut impl Rng,
    ctx: &GenContext,
) -> Option<i32> {
    let min = ctx.terrain.trunk_min as i32;
    let max = (ctx.terrain.trunk_max as i32).max(min);
    let height = rng.random_range(min..=max);
    let crown = y + height - 1;
    if y < 0 || crown + 1 >= scratch.dims().height as i32 {
        return None;
    }

    for ty in y..=crown {
        scratch.set(x, ty, z, ctx.blocks.wood);
    }

    for ly in crown - 1..=crown + 1 {
        let radius = if ly == crown + 1 { LEAF_RADIUS - 1 } else { LEAF_RADIUS };
        for dx in -radius..=radius {
            for dz in -radius..=radius {
                if dx * dx + dz * dz > radius * radius {
                    continue;
                }
                if scratch.get(x + dx, ly, z + dz).is_air() {
                    scratch.set(x + dx, ly, z + dz, ctx.blocks.leaves);
                }
            }
        }
    }
    Some(height)
}
