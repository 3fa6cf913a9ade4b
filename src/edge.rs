//! Edge types - typed, directed relationships between nodes
//!
//! The graph may be cyclic; nothing here enforces acyclicity.

use crate::{Error, Id, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Edge type tags. The integer values are part of the storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Container owns a member (class → method, namespace → function)
    Member,
    /// Symbol mentions a type
    TypeUsage,
    /// Symbol reads or writes a variable
    Usage,
    /// Callable calls another callable
    Call,
    /// Type derives from another type
    Inheritance,
    /// Method overrides a base method
    Override,
    /// Template or generic argument
    TypeArgument,
    TemplateSpecialization,
    /// File includes another file
    Include,
    /// Module imports a symbol or module
    Import,
    MacroUsage,
    AnnotationUsage,
}

impl EdgeKind {
    /// Get the string representation of the edge kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Member => "member",
            EdgeKind::TypeUsage => "type_usage",
            EdgeKind::Usage => "usage",
            EdgeKind::Call => "call",
            EdgeKind::Inheritance => "inheritance",
            EdgeKind::Override => "override",
            EdgeKind::TypeArgument => "type_argument",
            EdgeKind::TemplateSpecialization => "template_specialization",
            EdgeKind::Include => "include",
            EdgeKind::Import => "import",
            EdgeKind::MacroUsage => "macro_usage",
            EdgeKind::AnnotationUsage => "annotation_usage",
        }
    }

    /// Stored integer tag (one bit per kind)
    pub fn as_int(&self) -> i64 {
        match self {
            EdgeKind::Member => 1,
            EdgeKind::TypeUsage => 1 << 1,
            EdgeKind::Usage => 1 << 2,
            EdgeKind::Call => 1 << 3,
            EdgeKind::Inheritance => 1 << 4,
            EdgeKind::Override => 1 << 5,
            EdgeKind::TypeArgument => 1 << 6,
            EdgeKind::TemplateSpecialization => 1 << 7,
            EdgeKind::Include => 1 << 8,
            EdgeKind::Import => 1 << 9,
            EdgeKind::MacroUsage => 1 << 10,
            EdgeKind::AnnotationUsage => 1 << 11,
        }
    }

    pub fn from_int(value: i64) -> Option<Self> {
        Self::all().iter().copied().find(|kind| kind.as_int() == value)
    }

    /// Get all edge kinds
    pub fn all() -> &'static [EdgeKind] {
        &[
            EdgeKind::Member,
            EdgeKind::TypeUsage,
            EdgeKind::Usage,
            EdgeKind::Call,
            EdgeKind::Inheritance,
            EdgeKind::Override,
            EdgeKind::TypeArgument,
            EdgeKind::TemplateSpecialization,
            EdgeKind::Include,
            EdgeKind::Import,
            EdgeKind::MacroUsage,
            EdgeKind::AnnotationUsage,
        ]
    }
}

impl FromStr for EdgeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "member" | "contains" => Ok(EdgeKind::Member),
            "type_usage" => Ok(EdgeKind::TypeUsage),
            "usage" | "uses" => Ok(EdgeKind::Usage),
            "call" | "calls" => Ok(EdgeKind::Call),
            "inheritance" | "inherits" | "extends" => Ok(EdgeKind::Inheritance),
            "override" | "overrides" => Ok(EdgeKind::Override),
            "type_argument" => Ok(EdgeKind::TypeArgument),
            "template_specialization" => Ok(EdgeKind::TemplateSpecialization),
            "include" | "includes" => Ok(EdgeKind::Include),
            "import" | "imports" => Ok(EdgeKind::Import),
            "macro_usage" => Ok(EdgeKind::MacroUsage),
            "annotation_usage" => Ok(EdgeKind::AnnotationUsage),
            _ => Err(Error::InvalidValue(format!("Unknown edge kind: {}", s))),
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageEdge {
    pub id: Id,
    pub kind: EdgeKind,
    pub source_node_id: Id,
    pub target_node_id: Id,
}

impl StorageEdge {
    /// Whether the edge touches the given node on either end
    pub fn touches(&self, node_id: Id) -> bool {
        self.source_node_id == node_id || self.target_node_id == node_id
    }

    /// The endpoint opposite to `node_id`, if the edge touches it
    pub fn other_end(&self, node_id: Id) -> Option<Id> {
        if self.source_node_id == node_id {
            Some(self.target_node_id)
        } else if self.target_node_id == node_id {
            Some(self.source_node_id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_kind_roundtrip() {
        for kind in EdgeKind::all() {
            let parsed: EdgeKind = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
            assert_eq!(EdgeKind::from_int(kind.as_int()), Some(*kind));
        }
    }

    #[test]
    fn test_edge_kind_aliases() {
        assert_eq!(EdgeKind::from_str("calls").unwrap(), EdgeKind::Call);
        assert_eq!(EdgeKind::from_str("extends").unwrap(), EdgeKind::Inheritance);
        assert!(EdgeKind::from_str("friend").is_err());
    }

    #[test]
    fn test_other_end() {
        let edge = StorageEdge {
            id: 3,
            kind: EdgeKind::Call,
            source_node_id: 1,
            target_node_id: 2,
        };
        assert!(edge.touches(2));
        assert_eq!(edge.other_end(1), Some(2));
        assert_eq!(edge.other_end(2), Some(1));
        assert_eq!(edge.other_end(9), None);
    }
}
