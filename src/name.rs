//! Name hierarchy - the canonical, serialized identity of a graph node
//!
//! Format: `<delimiter>\tm<element>\tn<element>...`
//!
//! Examples:
//! - `::\tmns\tnfoo` for the C++ function `ns::foo`
//! - `.\tmcom\tnexample\tnApp` for the Java class `com.example.App`
//!
//! The serialized string is the natural key stored in the node table and
//! used by `get_node_by_serialized_name`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const META_DELIMITER: &str = "\tm";
const NAME_DELIMITER: &str = "\tn";

/// A qualified name split into its scope elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameHierarchy {
    /// Language-specific scope delimiter (`::`, `.`, `/`)
    pub delimiter: String,
    /// Outermost scope first, the named entity last
    pub elements: Vec<String>,
}

impl NameHierarchy {
    /// Create an empty hierarchy with the given delimiter
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            elements: Vec::new(),
        }
    }

    /// Split a qualified name on its delimiter, e.g. `ns::foo` with `::`
    pub fn from_qualified(qualified: &str, delimiter: &str) -> Self {
        Self {
            delimiter: delimiter.to_string(),
            elements: qualified
                .split(delimiter)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Append a child scope
    pub fn push(mut self, element: impl Into<String>) -> Self {
        self.elements.push(element.into());
        self
    }

    /// Innermost element, the entity's own name
    pub fn raw_name(&self) -> &str {
        self.elements.last().map(String::as_str).unwrap_or("")
    }

    /// The hierarchy without its last element
    pub fn parent(&self) -> Option<NameHierarchy> {
        if self.elements.len() < 2 {
            return None;
        }
        Some(Self {
            delimiter: self.delimiter.clone(),
            elements: self.elements[..self.elements.len() - 1].to_vec(),
        })
    }

    /// Human-readable qualified name, e.g. `ns::foo`
    pub fn qualified_name(&self) -> String {
        self.elements.join(&self.delimiter)
    }

    /// Parse a serialized name back into its hierarchy
    pub fn deserialize_name(serialized: &str) -> Result<Self> {
        let (delimiter, rest) = serialized.split_once(META_DELIMITER).ok_or_else(|| {
            Error::InvalidValue(format!("serialized name lacks a delimiter: {serialized:?}"))
        })?;

        if rest.is_empty() {
            return Err(Error::InvalidValue("serialized name has no elements".to_string()));
        }

        Ok(Self {
            delimiter: delimiter.to_string(),
            elements: rest.split(NAME_DELIMITER).map(str::to_string).collect(),
        })
    }

    /// Flatten into the canonical string stored as `serialized_name`
    pub fn serialize_name(&self) -> String {
        format!(
            "{}{}{}",
            self.delimiter,
            META_DELIMITER,
            self.elements.join(NAME_DELIMITER)
        )
    }
}

impl fmt::Display for NameHierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

impl FromStr for NameHierarchy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::deserialize_name(s)
    }
}

impl Serialize for NameHierarchy {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.serialize_name())
    }
}

impl<'de> Deserialize<'de> for NameHierarchy {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NameHierarchy::deserialize_name(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_form() {
        let name = NameHierarchy::from_qualified("ns::foo", "::");
        assert_eq!(name.serialize_name(), "::\tmns\tnfoo");

        let parsed = NameHierarchy::deserialize_name("::\tmns\tnfoo").unwrap();
        assert_eq!(parsed, name);
        assert_eq!(parsed.qualified_name(), "ns::foo");
    }

    #[test]
    fn test_parent_and_raw_name() {
        let name = NameHierarchy::new(".").push("com").push("example").push("App");
        assert_eq!(name.raw_name(), "App");
        assert_eq!(name.parent().unwrap().qualified_name(), "com.example");
        assert!(NameHierarchy::new(".").push("App").parent().is_none());
    }

    #[test]
    fn test_invalid_serialized_name() {
        assert!(NameHierarchy::deserialize_name("ns::foo").is_err());
        assert!(NameHierarchy::deserialize_name("::\tm").is_err());
    }
}
