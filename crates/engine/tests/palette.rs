//! Registry and global palette behaviour over real content.

use voxelcraft_engine::content::{self, CoreBlocks};
use voxelcraft_engine::palette::{GlobalPalette, PaletteError};
use voxelcraft_engine::registry::{BlockDef, Material, Property, RegName, Registry, RegistryError};
use voxelcraft_engine::{EngineContext, StateId};

fn scenario_registry() -> Registry {
    let mut r = Registry::new();
    // Deliberately not in name order, and air not first.
    for (name, material) in [
        ("stone", Material::Solid),
        ("grass_block", Material::Solid),
        ("air", Material::Air),
        ("dirt", Material::Solid),
    ] {
        r.register_block(BlockDef::new(RegName::core(name).unwrap(), material)).unwrap();
    }
    r.register_block(
        BlockDef::new(RegName::core("wood").unwrap(), Material::Solid)
            .property(Property::enumeration("axis", &["x", "y", "z"]).unwrap()),
    )
    .unwrap();
    r.register_block(
        BlockDef::new(RegName::core("leaves").unwrap(), Material::Foliage)
            .property(Property::boolean("persistent")),
    )
    .unwrap();
    r.register_block(
        BlockDef::new(RegName::core("water").unwrap(), Material::Fluid)
            .property(Property::int("level", 0, 7).unwrap()),
    )
    .unwrap();
    r
}

#[test]
fn air_gets_state_id_zero() {
    let registry = scenario_registry();
    let mut palette = GlobalPalette::new();
    palette.bake(&registry);
    let air = registry.default_state(&RegName::core("air").unwrap()).unwrap();
    assert_eq!(palette.state_id(&air).unwrap(), StateId::AIR);
    assert_eq!(palette.len(), 4 + 3 + 2 + 8);
}

#[test]
fn palette_is_a_bijection() {
    let registry = scenario_registry();
    let mut palette = GlobalPalette::new();
    palette.bake(&registry);

    for state in registry.all_states() {
        let id = palette.state_id(state).unwrap();
        assert_eq!(palette.state(id).unwrap().as_ref(), state.as_ref());
    }
    for i in 0..palette.len() as u32 {
        let state = palette.state(StateId(i)).unwrap();
        assert_eq!(palette.state_id(state).unwrap(), StateId(i));
    }
}

#[test]
fn baking_is_deterministic_across_registration_order() {
    let mut first = GlobalPalette::new();
    first.bake(&scenario_registry());

    let mut reversed = Registry::new();
    let source = scenario_registry();
    let defs: Vec<_> = source.blocks().cloned().collect();
    for def in defs.into_iter().rev() {
        reversed.register_block((*def).clone()).unwrap();
    }
    let mut second = GlobalPalette::new();
    second.bake(&reversed);
    assert_eq!(first.descriptors(), second.descriptors());

    let names = first.descriptors();
    let mut sorted = names[1..].to_vec();
    sorted.sort();
    assert_eq!(names[0], "voxelcraft:air");
    // States of one block keep enumeration order, which here is also lexical.
    assert_eq!(names[1..].to_vec(), sorted);

    second.rebake(&reversed);
    assert_eq!(first.descriptors(), second.descriptors());
}

#[test]
fn unbaked_palette_fails_fast() {
    let registry = scenario_registry();
    let palette = GlobalPalette::new();
    let stone = registry.default_state(&RegName::core("stone").unwrap()).unwrap();
    assert_eq!(palette.state_id(&stone), Err(PaletteError::NotBaked));
}

#[test]
fn registration_errors() {
    let mut registry = scenario_registry();
    assert!(matches!(
        registry.register_block(BlockDef::new(RegName::core("stone").unwrap(), Material::Solid)),
        Err(RegistryError::DuplicateBlock(_))
    ));
    assert!(matches!(RegName::parse("Stone"), Err(RegistryError::InvalidName(_))));
    assert!(matches!(RegName::parse("a:B"), Err(RegistryError::InvalidName(_))));
    assert!(registry.block_by_str("voxelcraft:missing").is_none());
}

#[test]
fn core_content_resolves() {
    let ctx = EngineContext::bootstrap().unwrap();
    let core = CoreBlocks::resolve(&ctx).unwrap();
    let wood = ctx.palette().state(core.wood).unwrap();
    assert_eq!(wood.descriptor(), "voxelcraft:wood[axis=y]");
    let water = ctx.palette().state(core.water).unwrap();
    assert_eq!(water.descriptor(), "voxelcraft:water[level=0]");
    for name in [content::OVERWORLD, content::SPAWN_PLATFORM] {
        assert!(ctx.registry().template(&RegName::parse(name).unwrap()).is_some());
    }
}
