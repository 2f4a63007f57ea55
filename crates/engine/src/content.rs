//! The built-in content pack: core blocks, their block items, and the two
//! world templates.

use crate::context::EngineContext;
use crate::palette::PaletteError;
use crate::registry::{
    BlockDef, GeneratorKind, ItemDef, Material, Property, PropertyValue, RegName, Registry,
    RegistryError, WorldTemplate,
};
use crate::world::block::StateId;

pub const AIR: &str = "voxelcraft:air";
pub const STONE: &str = "voxelcraft:stone";
pub const GRASS_BLOCK: &str = "voxelcraft:grass_block";
pub const DIRT: &str = "voxelcraft:dirt";
pub const WOOD: &str = "voxelcraft:wood";
pub const LEAVES: &str = "voxelcraft:leaves";
pub const WATER: &str = "voxelcraft:water";
pub const BEDROCK: &str = "voxelcraft:bedrock";
pub const SAND: &str = "voxelcraft:sand";
pub const PLANKS: &str = "voxelcraft:planks";

pub const OVERWORLD: &str = "voxelcraft:overworld";
pub const SPAWN_PLATFORM: &str = "voxelcraft:spawn_platform";

fn name(raw: &str) -> Result<RegName, RegistryError> {
    RegName::parse(raw)
}

/// Register every core block, a block item for each non-air block, and the
/// core world templates.
pub fn register_core(registry: &mut Registry) -> Result<(), RegistryError> {
    let blocks = [
        BlockDef::new(name(AIR)?, Material::Air).durability(0.0).mass(0.0, 1.0),
        BlockDef::new(name(STONE)?, Material::Solid)
            .durability(1.5)
            .mining_level(1)
            .mass(2.6, 1.0),
        BlockDef::new(name(GRASS_BLOCK)?, Material::Solid)
            .durability(0.6)
            .mass(1.3, 1.0),
        BlockDef::new(name(DIRT)?, Material::Solid)
            .durability(0.5)
            .mass(1.3, 1.0),
        BlockDef::new(name(WOOD)?, Material::Solid)
            .durability(2.0)
            .mass(0.7, 1.0)
            .property(Property::enumeration("axis", &["x", "y", "z"])?),
        BlockDef::new(name(LEAVES)?, Material::Foliage)
            .durability(0.2)
            .mass(0.1, 1.0)
            .property(Property::boolean("persistent")),
        BlockDef::new(name(WATER)?, Material::Fluid)
            .durability(100.0)
            .mass(1.0, 1.0)
            .property(Property::int("level", 0, 7)?),
        BlockDef::new(name(BEDROCK)?, Material::Solid)
            .durability(f32::INFINITY)
            .mining_level(u8::MAX),
        BlockDef::new(name(SAND)?, Material::Solid)
            .durability(0.5)
            .mass(1.6, 1.0),
        BlockDef::new(name(PLANKS)?, Material::Solid)
            .durability(2.0)
            .mass(0.6, 1.0),
    ];

    for def in blocks {
        let block = registry.register_block(def)?;
        if !block.is_air() && !block.is_fluid() {
            registry.register_item(ItemDef::new(block.name().clone()).places(block.name().clone()))?;
        }
    }

    registry.register_template(WorldTemplate::new(name(OVERWORLD)?, GeneratorKind::Layered))?;
    registry.register_template(WorldTemplate::new(
        name(SPAWN_PLATFORM)?,
        GeneratorKind::SpawnPlatform,
    ))?;
    Ok(())
}

/// Global ids of the states the generator and gameplay code place directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreBlocks {
    pub air: StateId,
    pub stone: StateId,
    pub grass: StateId,
    pub dirt: StateId,
    /// Upright log (`axis=y`).
    pub wood: StateId,
    pub leaves: StateId,
    /// Source water (`level=0`).
    pub water: StateId,
    pub bedrock: StateId,
    pub sand: StateId,
    pub planks: StateId,
}

impl CoreBlocks {
    pub fn resolve(ctx: &EngineContext) -> Result<Self, PaletteError> {
        let registry = ctx.registry();
        let palette = ctx.palette();
        let lookup = |raw: &str, property: Option<(&str, PropertyValue)>| -> Result<StateId, PaletteError> {
            let missing = || PaletteError::UnknownState(raw.to_string());
            let reg = RegName::parse(raw).map_err(|_| missing())?;
            let mut state = (*registry.default_state(&reg).ok_or_else(missing)?).clone();
            if let Some((prop, value)) = property {
                state = state.with(prop, value).ok_or_else(missing)?;
            }
            palette.state_id(&state)
        };

        Ok(Self {
            air: lookup(AIR, None)?,
            stone: lookup(STONE, None)?,
            grass: lookup(GRASS_BLOCK, None)?,
            dirt: lookup(DIRT, None)?,
            wood: lookup(WOOD, Some(("axis", PropertyValue::enumeration("y"))))?,
            leaves: lookup(LEAVES, None)?,
            water: lookup(WATER, Some(("level", PropertyValue::Int(0))))?,
            bedrock: lookup(BEDROCK, None)?,
            sand: lookup(SAND, None)?,
            planks: lookup(PLANKS, None)?,
        })
    }
}
