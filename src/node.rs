//! Node types - graph vertices and their specializations
//!
//! Every node carries a type tag and its canonical serialized name.
//! Specialized rows share the node's id:
//! - `StorageSymbol`: a node with a definition kind
//! - `StorageFile`: a node with a path, modification time and line count
//!
//! `StorageLocalSymbol` stands alone: it is scoped to one file and has no
//! node row, but its id comes from the same allocator.

use crate::{Error, Id, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Node type tags. The integer values are part of the storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Referenced but not yet classified
    Symbol,
    Type,
    BuiltinType,
    Module,
    Namespace,
    Package,
    Struct,
    Class,
    Interface,
    Annotation,
    GlobalVariable,
    Field,
    Function,
    Method,
    Enum,
    EnumConstant,
    Typedef,
    TypeParameter,
    File,
    Macro,
    Union,
}

impl NodeKind {
    /// Get the string representation of the node kind
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Symbol => "symbol",
            NodeKind::Type => "type",
            NodeKind::BuiltinType => "builtin_type",
            NodeKind::Module => "module",
            NodeKind::Namespace => "namespace",
            NodeKind::Package => "package",
            NodeKind::Struct => "struct",
            NodeKind::Class => "class",
            NodeKind::Interface => "interface",
            NodeKind::Annotation => "annotation",
            NodeKind::GlobalVariable => "global_variable",
            NodeKind::Field => "field",
            NodeKind::Function => "function",
            NodeKind::Method => "method",
            NodeKind::Enum => "enum",
            NodeKind::EnumConstant => "enum_constant",
            NodeKind::Typedef => "typedef",
            NodeKind::TypeParameter => "type_parameter",
            NodeKind::File => "file",
            NodeKind::Macro => "macro",
            NodeKind::Union => "union",
        }
    }

    /// Stored integer tag (one bit per kind)
    pub fn as_int(&self) -> i64 {
        match self {
            NodeKind::Symbol => 1,
            NodeKind::Type => 1 << 1,
            NodeKind::BuiltinType => 1 << 2,
            NodeKind::Module => 1 << 3,
            NodeKind::Namespace => 1 << 4,
            NodeKind::Package => 1 << 5,
            NodeKind::Struct => 1 << 6,
            NodeKind::Class => 1 << 7,
            NodeKind::Interface => 1 << 8,
            NodeKind::Annotation => 1 << 9,
            NodeKind::GlobalVariable => 1 << 10,
            NodeKind::Field => 1 << 11,
            NodeKind::Function => 1 << 12,
            NodeKind::Method => 1 << 13,
            NodeKind::Enum => 1 << 14,
            NodeKind::EnumConstant => 1 << 15,
            NodeKind::Typedef => 1 << 16,
            NodeKind::TypeParameter => 1 << 17,
            NodeKind::File => 1 << 18,
            NodeKind::Macro => 1 << 19,
            NodeKind::Union => 1 << 20,
        }
    }

    /// Decode a stored integer tag
    pub fn from_int(value: i64) -> Option<Self> {
        Self::all().iter().copied().find(|kind| kind.as_int() == value)
    }

    /// Get all node kinds
    pub fn all() -> &'static [NodeKind] {
        &[
            NodeKind::Symbol,
            NodeKind::Type,
            NodeKind::BuiltinType,
            NodeKind::Module,
            NodeKind::Namespace,
            NodeKind::Package,
            NodeKind::Struct,
            NodeKind::Class,
            NodeKind::Interface,
            NodeKind::Annotation,
            NodeKind::GlobalVariable,
            NodeKind::Field,
            NodeKind::Function,
            NodeKind::Method,
            NodeKind::Enum,
            NodeKind::EnumConstant,
            NodeKind::Typedef,
            NodeKind::TypeParameter,
            NodeKind::File,
            NodeKind::Macro,
            NodeKind::Union,
        ]
    }
}

impl FromStr for NodeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| Error::InvalidValue(format!("Unknown node kind: {}", s)))
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a symbol came to be known to the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    /// Only declared or referenced, no definition seen
    None,
    /// Generated by the compiler (implicit constructors, ...)
    Implicit,
    /// Defined in indexed source
    Explicit,
}

impl DefinitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefinitionKind::None => "none",
            DefinitionKind::Implicit => "implicit",
            DefinitionKind::Explicit => "explicit",
        }
    }

    pub fn as_int(&self) -> i64 {
        match self {
            DefinitionKind::None => 0,
            DefinitionKind::Implicit => 1,
            DefinitionKind::Explicit => 2,
        }
    }

    pub fn from_int(value: i64) -> Option<Self> {
        [DefinitionKind::None, DefinitionKind::Implicit, DefinitionKind::Explicit]
            .into_iter()
            .find(|kind| kind.as_int() == value)
    }
}

impl std::fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Access specifier attached to a member node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    None,
    Public,
    Protected,
    Private,
    /// Java package-private
    Default,
    TemplateParameter,
    TypeParameter,
}

impl AccessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessKind::None => "none",
            AccessKind::Public => "public",
            AccessKind::Protected => "protected",
            AccessKind::Private => "private",
            AccessKind::Default => "default",
            AccessKind::TemplateParameter => "template_parameter",
            AccessKind::TypeParameter => "type_parameter",
        }
    }

    pub fn as_int(&self) -> i64 {
        match self {
            AccessKind::None => 0,
            AccessKind::Public => 1,
            AccessKind::Protected => 2,
            AccessKind::Private => 3,
            AccessKind::Default => 4,
            AccessKind::TemplateParameter => 5,
            AccessKind::TypeParameter => 6,
        }
    }

    pub fn from_int(value: i64) -> Option<Self> {
        [
            AccessKind::None,
            AccessKind::Public,
            AccessKind::Protected,
            AccessKind::Private,
            AccessKind::Default,
            AccessKind::TemplateParameter,
            AccessKind::TypeParameter,
        ]
        .into_iter()
        .find(|kind| kind.as_int() == value)
    }
}

impl std::fmt::Display for AccessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored graph vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageNode {
    pub id: Id,
    pub kind: NodeKind,
    /// Canonical serialized name hierarchy, unique per store
    pub serialized_name: String,
}

/// A node with a definition kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSymbol {
    pub id: Id,
    pub kind: NodeKind,
    pub serialized_name: String,
    pub definition_kind: DefinitionKind,
}

impl StorageSymbol {
    /// The node row this symbol extends
    pub fn node(&self) -> StorageNode {
        StorageNode {
            id: self.id,
            kind: self.kind,
            serialized_name: self.serialized_name.clone(),
        }
    }
}

/// A node representing a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageFile {
    pub id: Id,
    pub serialized_name: String,
    /// Path as reported by the indexer
    pub file_path: String,
    /// Last modification time as reported by the indexer
    pub modification_time: String,
    /// Number of lines at the time the file was stored
    pub line_count: u32,
}

/// A name scoped to a single file (function locals, parameters).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLocalSymbol {
    pub id: Id,
    pub name: String,
}

/// Access specifier annotation on a member node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageComponentAccess {
    pub id: Id,
    pub node_id: Id,
    pub access: AccessKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_int_roundtrip() {
        for kind in NodeKind::all() {
            assert_eq!(NodeKind::from_int(kind.as_int()), Some(*kind));
        }
        assert_eq!(NodeKind::from_int(0), None);
        assert_eq!(NodeKind::from_int(3), None);
    }

    #[test]
    fn test_node_kind_parse() {
        assert_eq!(NodeKind::from_str("function").unwrap(), NodeKind::Function);
        assert_eq!(NodeKind::from_str("Global_Variable").unwrap(), NodeKind::GlobalVariable);
        assert!(NodeKind::from_str("lambda").is_err());
    }

    #[test]
    fn test_definition_and_access_tags() {
        assert_eq!(DefinitionKind::from_int(2), Some(DefinitionKind::Explicit));
        assert_eq!(DefinitionKind::from_int(7), None);
        assert_eq!(AccessKind::from_int(AccessKind::Private.as_int()), Some(AccessKind::Private));
    }

    #[test]
    fn test_symbol_node_view() {
        let symbol = StorageSymbol {
            id: 4,
            kind: NodeKind::Class,
            serialized_name: "::\tmWidget".to_string(),
            definition_kind: DefinitionKind::Explicit,
        };
        let node = symbol.node();
        assert_eq!(node.id, 4);
        assert_eq!(node.kind, NodeKind::Class);
    }
}
