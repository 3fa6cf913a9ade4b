//! Source locations, occurrences and the per-file token location view

use crate::{Error, Id, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A 1-based, inclusive line/column range inside a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Check the 1-based and end ≥ start invariants
    pub fn validate(&self) -> Result<()> {
        if self.start_line == 0 || self.start_col == 0 || self.end_line == 0 || self.end_col == 0 {
            return Err(Error::InvalidSpan(format!("{self} is not 1-based")));
        }
        if (self.end_line, self.end_col) < (self.start_line, self.start_col) {
            return Err(Error::InvalidSpan(format!("{self} ends before it starts")));
        }
        Ok(())
    }

    pub fn contains_line(&self, line: u32) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    pub fn line_count(&self) -> u32 {
        self.end_line - self.start_line + 1
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({},{})-({},{})",
            self.start_line, self.start_col, self.end_line, self.end_col
        )
    }
}

/// What a source location marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    /// The name token of a symbol or reference
    Token,
    /// Body of a scope (braces, indented block)
    Scope,
    /// Qualifier part of a qualified name
    Qualifier,
    /// Token of a file-local symbol
    LocalSymbol,
    /// Full declaration signature
    Signature,
    Comment,
    /// Range of an indexing error
    Error,
}

impl LocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationKind::Token => "token",
            LocationKind::Scope => "scope",
            LocationKind::Qualifier => "qualifier",
            LocationKind::LocalSymbol => "local_symbol",
            LocationKind::Signature => "signature",
            LocationKind::Comment => "comment",
            LocationKind::Error => "error",
        }
    }

    pub fn as_int(&self) -> i64 {
        match self {
            LocationKind::Token => 0,
            LocationKind::Scope => 1,
            LocationKind::Qualifier => 2,
            LocationKind::LocalSymbol => 3,
            LocationKind::Signature => 4,
            LocationKind::Comment => 5,
            LocationKind::Error => 6,
        }
    }

    pub fn from_int(value: i64) -> Option<Self> {
        [
            LocationKind::Token,
            LocationKind::Scope,
            LocationKind::Qualifier,
            LocationKind::LocalSymbol,
            LocationKind::Signature,
            LocationKind::Comment,
            LocationKind::Error,
        ]
        .into_iter()
        .find(|kind| kind.as_int() == value)
    }
}

impl std::fmt::Display for LocationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A span in a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSourceLocation {
    pub id: Id,
    pub file_node_id: Id,
    pub span: Span,
    pub kind: LocationKind,
}

/// Join row: `element_id` (node, edge or local symbol) appears at a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageOccurrence {
    pub element_id: Id,
    pub source_location_id: Id,
}

/// A comment range in a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageCommentLocation {
    pub id: Id,
    pub file_node_id: Id,
    pub span: Span,
}

/// One location of a file together with every element occurring there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLocation {
    pub location_id: Id,
    pub kind: LocationKind,
    pub span: Span,
    /// Sorted ascending
    pub element_ids: Vec<Id>,
}

/// All token locations of one file, ordered by position, ready for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLocationFile {
    pub file_path: String,
    pub locations: Vec<TokenLocation>,
}

impl TokenLocationFile {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            locations: Vec::new(),
        }
    }

    /// Assemble the view from a file's locations and their occurrences.
    /// Occurrences pointing at locations outside `locations` are ignored.
    pub fn build(
        file_path: impl Into<String>,
        locations: Vec<StorageSourceLocation>,
        occurrences: &[StorageOccurrence],
    ) -> Self {
        let mut elements: HashMap<Id, Vec<Id>> = HashMap::new();
        for occurrence in occurrences {
            elements
                .entry(occurrence.source_location_id)
                .or_default()
                .push(occurrence.element_id);
        }

        let mut token_locations: Vec<TokenLocation> = locations
            .into_iter()
            .map(|location| {
                let mut element_ids = elements.remove(&location.id).unwrap_or_default();
                element_ids.sort_unstable();
                element_ids.dedup();
                TokenLocation {
                    location_id: location.id,
                    kind: location.kind,
                    span: location.span,
                    element_ids,
                }
            })
            .collect();
        token_locations.sort_by_key(|location| (location.span, location.location_id));

        Self {
            file_path: file_path.into(),
            locations: token_locations,
        }
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Locations whose span covers `line`
    pub fn locations_on_line(&self, line: u32) -> impl Iterator<Item = &TokenLocation> {
        self.locations
            .iter()
            .filter(move |location| location.span.contains_line(line))
    }

    /// Locations at which `element_id` occurs
    pub fn locations_of_element(&self, element_id: Id) -> impl Iterator<Item = &TokenLocation> {
        self.locations
            .iter()
            .filter(move |location| location.element_ids.contains(&element_id))
    }
}
