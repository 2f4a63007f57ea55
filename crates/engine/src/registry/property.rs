use std::fmt;

use serde::{Deserialize, Serialize};

use super::RegistryError;

/// The value domain of a block property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    Bool,
    /// Inclusive integer range.
    Int { min: i32, max: i32 },
    Enum(Vec<String>),
}

/// A named, enumerable block property (e.g. `axis`, `level`, `persistent`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    name: String,
    kind: PropertyKind,
}

impl Property {
    pub fn boolean(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: PropertyKind::Bool,
        }
    }

    pub fn int(name: &str, min: i32, max: i32) -> Result<Self, RegistryError> {
        if min > max {
            return Err(RegistryError::InvalidProperty(format!(
                "{name}: empty range {min}..={max}"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            kind: PropertyKind::Int { min, max },
        })
    }

    pub fn enumeration(name: &str, variants: &[&str]) -> Result<Self, RegistryError> {
        if variants.is_empty() {
            return Err(RegistryError::InvalidProperty(format!("{name}: no variants")));
        }
        Ok(Self {
            name: name.to_string(),
            kind: PropertyKind::Enum(variants.iter().map(|v| v.to_string()).collect()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    /// Every value in the domain, in declaration order.
    pub fn values(&self) -> Vec<PropertyValue> {
        match &self.kind {
            PropertyKind::Bool => vec![PropertyValue::Bool(false), PropertyValue::Bool(true)],
            PropertyKind::Int { min, max } => (*min..=*max).map(PropertyValue::Int).collect(),
            PropertyKind::Enum(variants) => variants
                .iter()
                .map(|v| PropertyValue::Enum(v.clone()))
                .collect(),
        }
    }

    pub fn accepts(&self, value: &PropertyValue) -> bool {
        match (&self.kind, value) {
            (PropertyKind::Bool, PropertyValue::Bool(_)) => true,
            (PropertyKind::Int { min, max }, PropertyValue::Int(v)) => (*min..=*max).contains(v),
            (PropertyKind::Enum(variants), PropertyValue::Enum(v)) => variants.contains(v),
            _ => false,
        }
    }
}

/// A concrete property value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i32),
    Enum(String),
}

impl PropertyValue {
    pub fn enumeration(variant: &str) -> Self {
        Self::Enum(variant.to_string())
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Enum(v) => f.write_str(v),
        }
    }
}

/// Cartesian product of every property domain, in declaration order with the
/// last property varying fastest.
pub fn cartesian_product(properties: &[Property]) -> Vec<Vec<PropertyValue>> {
    let mut combos: Vec<Vec<PropertyValue>> = vec![Vec::new()];
    for property in properties {
        let values = property.values();
        let mut next = Vec::with_capacity(combos.len() * values.len());
        for combo in &combos {
            for value in &values {
                let mut extended = combo.clone();
                extended.push(value.clone());
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}
