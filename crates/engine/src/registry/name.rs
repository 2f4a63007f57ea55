use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::RegistryError;

/// Namespace used by the built-in content pack.
pub const CORE_NAMESPACE: &str = "voxelcraft";

/// A `namespace:identifier` registration key.
///
/// Stable across the registry, the wire protocol and save files. Equality and
/// hashing are by string value; cloning is a refcount bump.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegName(Arc<str>);

impl RegName {
    pub fn new(namespace: &str, path: &str) -> Result<Self, RegistryError> {
        Self::parse(&format!("{namespace}:{path}"))
    }

    /// Shorthand for names in the core namespace.
    pub fn core(path: &str) -> Result<Self, RegistryError> {
        Self::new(CORE_NAMESPACE, path)
    }

    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let Some((namespace, path)) = raw.split_once(':') else {
            return Err(RegistryError::InvalidName(raw.to_string()));
        };
        let namespace_ok = !namespace.is_empty()
            && namespace
                .bytes()
                .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' | b'-'));
        let path_ok = !path.is_empty()
            && path
                .bytes()
                .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' | b'-' | b'/'));
        if !namespace_ok || !path_ok {
            return Err(RegistryError::InvalidName(raw.to_string()));
        }
        Ok(Self(Arc::from(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn namespace(&self) -> &str {
        self.0.split_once(':').map(|(ns, _)| ns).unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        self.0.split_once(':').map(|(_, p)| p).unwrap_or_default()
    }
}

impl fmt::Display for RegName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for RegName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegName({})", self.0)
    }
}

impl FromStr for RegName {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for RegName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RegName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_names() {
        let name = RegName::parse("voxelcraft:grass_block").unwrap();
        assert_eq!(name.namespace(), "voxelcraft");
        assert_eq!(name.path(), "grass_block");
        assert_eq!(name.to_string(), "voxelcraft:grass_block");

        assert!(RegName::parse("my-mod:blocks/ore.v2").is_ok());
    }

    #[test]
    fn rejects_malformed_names() {
        for raw in ["stone", ":stone", "voxelcraft:", "Voxel:stone", "a:b c", "a:b:c"] {
            assert!(
                matches!(RegName::parse(raw), Err(RegistryError::InvalidName(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn equality_is_by_value() {
        let a = RegName::core("dirt").unwrap();
        let b: RegName = "voxelcraft:dirt".parse().unwrap();
        assert_eq!(a, b);
    }
}
