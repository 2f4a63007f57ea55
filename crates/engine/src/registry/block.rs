use super::name::RegName;
use super::property::Property;

/// Coarse behavior class of a block type. Solidity, fluid handling and
/// texture selection all dispatch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Material {
    Air,
    Solid,
    Fluid,
    /// Solid for collision, but see-through (leaves).
    Foliage,
}

/// An immutable block type definition.
///
/// A block type is stateless; per-voxel variation lives in its
/// [`BlockState`](super::BlockState)s, one per combination of property values.
#[derive(Debug, Clone)]
pub struct BlockDef {
    name: RegName,
    material: Material,
    durability: f32,
    mining_level: u8,
    mass: f32,
    volume: f32,
    properties: Vec<Property>,
}

impl BlockDef {
    pub fn new(name: RegName, material: Material) -> Self {
        Self {
            name,
            material,
            durability: 1.0,
            mining_level: 0,
            mass: 1.0,
            volume: 1.0,
            properties: Vec::new(),
        }
    }

    pub fn durability(mut self, durability: f32) -> Self {
        self.durability = durability;
        self
    }

    pub fn mining_level(mut self, level: u8) -> Self {
        self.mining_level = level;
        self
    }

    pub fn mass(mut self, mass: f32, volume: f32) -> Self {
        self.mass = mass;
        self.volume = volume;
        self
    }

    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn name(&self) -> &RegName {
        &self.name
    }

    pub fn material(&self) -> Material {
        self.material
    }

    pub fn hardness(&self) -> f32 {
        self.durability
    }

    pub fn required_mining_level(&self) -> u8 {
        self.mining_level
    }

    pub fn density(&self) -> f32 {
        if self.volume > 0.0 { self.mass / self.volume } else { 0.0 }
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn is_air(&self) -> bool {
        self.material == Material::Air
    }

    /// Does this block stop entities and rays?
    pub fn is_solid(&self) -> bool {
        matches!(self.material, Material::Solid | Material::Foliage)
    }

    pub fn is_fluid(&self) -> bool {
        self.material == Material::Fluid
    }

    /// Can another block be placed into this cell?
    pub fn is_replaceable(&self) -> bool {
        matches!(self.material, Material::Air | Material::Fluid)
    }
}
