use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::block::BlockDef;
use super::property::PropertyValue;

/// A block type plus a concrete value for each of its properties.
///
/// All states are created once at registration and shared behind `Arc`;
/// chunks never hold a `BlockState`, only its global palette id. Equality
/// is structural: same block name and same property values.
#[derive(Clone)]
pub struct BlockState {
    block: Arc<BlockDef>,
    /// Parallel to `block.properties()`.
    values: Vec<PropertyValue>,
}

impl BlockState {
    pub(crate) fn new(block: Arc<BlockDef>, values: Vec<PropertyValue>) -> Self {
        Self { block, values }
    }

    pub fn block(&self) -> &Arc<BlockDef> {
        &self.block
    }

    pub fn values(&self) -> &[PropertyValue] {
        &self.values
    }

    /// The value of the named property, if the block has it.
    pub fn value(&self, property: &str) -> Option<&PropertyValue> {
        self.block
            .properties()
            .iter()
            .position(|p| p.name() == property)
            .map(|i| &self.values[i])
    }

    /// This state with one property changed. `None` if the property does not
    /// exist or the value is outside its domain.
    pub fn with(&self, property: &str, value: PropertyValue) -> Option<BlockState> {
        let index = self
            .block
            .properties()
            .iter()
            .position(|p| p.name() == property)?;
        if !self.block.properties()[index].accepts(&value) {
            return None;
        }
        let mut values = self.values.clone();
        values[index] = value;
        Some(Self::new(Arc::clone(&self.block), values))
    }

    /// Canonical textual form: `ns:block[prop=value,...]`.
    pub fn descriptor(&self) -> String {
        if self.values.is_empty() {
            return self.block.name().to_string();
        }
        let props: Vec<String> = self
            .block
            .properties()
            .iter()
            .zip(&self.values)
            .map(|(p, v)| format!("{}={}", p.name(), v))
            .collect();
        format!("{}[{}]", self.block.name(), props.join(","))
    }
}

impl PartialEq for BlockState {
    fn eq(&self, other: &Self) -> bool {
        self.block.name() == other.block.name() && self.values == other.values
    }
}

impl Eq for BlockState {}

impl Hash for BlockState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.block.name().hash(state);
        self.values.hash(state);
    }
}

impl fmt::Debug for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockState({})", self.descriptor())
    }
}
