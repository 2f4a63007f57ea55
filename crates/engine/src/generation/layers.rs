//! The standard layers. Each is a pure function of (chunk position, context)
//! plus whatever the earlier layers wrote.

use rand::Rng;

use super::scratch::ChunkScratch;
use super::tree::{chunk_rng, find_surface_y, place_tree, LEAF_RADIUS};
use super::GenContext;
use crate::world::position::ChunkPos;

/// Soil depth under the surface block.
const SOIL_DEPTH: i32 = 3;
/// Top of the spawn platform.
pub const PLATFORM_Y: i32 = 64;
/// Half-width of the spawn platform, centered in chunk (0, 0).
const PLATFORM_HALF: i32 = 4;

/// `density = -y + sea_floor + noise * amplitude`; positive is stone.
pub fn base_density(scratch: &mut ChunkScratch, pos: ChunkPos, ctx: &GenContext) {
    let dims = scratch.dims();
    let (w, h) = (dims.width as i32, dims.height as i32);
    let origin = pos.block_origin(dims, 0);
    for x in 0..w {
        for z in 0..w {
            let wx = f64::from(origin.x + x);
            let wz = f64::from(origin.z + z);
            for y in 0..h {
                let density = -f64::from(y)
                    + ctx.terrain.sea_floor
                    + ctx.noise.noise(wx, f64::from(y), wz) * ctx.terrain.amplitude;
                if density > 0.0 {
                    scratch.set(x, y, z, ctx.blocks.stone);
                }
            }
        }
    }
}

/// Fill air below sea level with water. Never replaces anything solid.
pub fn water(scratch: &mut ChunkScratch, _pos: ChunkPos, ctx: &GenContext) {
    let dims = scratch.dims();
    let w = dims.width as i32;
    let top = ctx.terrain.sea_level.min(dims.height as i32);
    for x in 0..w {
        for z in 0..w {
            for y in 0..top {
                if scratch.get(x, y, z).is_air() {
                    scratch.set(x, y, z, ctx.blocks.water);
                }
            }
        }
    }
}

/// The topmost stone of each column becomes grass when open to the air
/// (sand when under water), with a thin layer of dirt beneath.
pub fn surface(scratch: &mut ChunkScratch, _pos: ChunkPos, ctx: &GenContext) {
    let dims = scratch.dims();
    let (w, h) = (dims.width as i32, dims.height as i32);
    for x in 0..w {
        for z in 0..w {
            let Some(top) = (0..h).rev().find(|&y| scratch.get(x, y, z) == ctx.blocks.stone) else {
                continue;
            };
            let above = scratch.get(x, top + 1, z);
            let cover = if above.is_air() {
                ctx.blocks.grass
            } else if above == ctx.blocks.water {
                ctx.blocks.sand
            } else {
                continue;
            };
            scratch.set(x, top, z, cover);
            for y in (top - SOIL_DEPTH).max(0)..top {
                if scratch.get(x, y, z) == ctx.blocks.stone {
                    scratch.set(x, y, z, ctx.blocks.dirt);
                }
            }
        }
    }
}

/// Scatter trees over grass columns. One draw per candidate column, so the
/// same (seed, chunk) always yields the same trees.
pub fn features(scratch: &mut ChunkScratch, pos: ChunkPos, ctx: &GenContext) {
    let dims = scratch.dims();
    let w = dims.width as i32;
    let mut rng = chunk_rng(ctx.seed, pos.x, pos.z);
    for x in LEAF_RADIUS..w - LEAF_RADIUS {
        for z in LEAF_RADIUS..w - LEAF_RADIUS {
            let draw: f64 = rng.random();
            if draw <= ctx.terrain.tree_threshold {
                continue;
            }
            let Some(y) = find_surface_y(scratch, x, z, ctx) else {
                continue;
            };
            if scratch.get(x, y - 1, z) == ctx.blocks.grass {
                place_tree(scratch, x, y, z, &mut rng, ctx);
            }
        }
    }
}

/// A single-layer stone platform with a planks top, only in chunk (0, 0).
pub fn spawn_platform(scratch: &mut ChunkScratch, pos: ChunkPos, ctx: &GenContext) {
    if pos != ChunkPos::new(0, 0) {
        return;
    }
    let dims = scratch.dims();
    let center = dims.width as i32 / 2;
    let y = PLATFORM_Y.min(dims.height as i32 - 1);
    for x in center - PLATFORM_HALF..center + PLATFORM_HALF {
        for z in center - PLATFORM_HALF..center + PLATFORM_HALF {
            scratch.set(x, y - 1, z, ctx.blocks.stone);
            scratch.set(x, y, z, ctx.blocks.planks);
        }
    }
}
