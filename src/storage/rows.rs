//! Row decoding for every stored entity kind

use std::collections::BTreeSet;
use rusqlite::Row;
use rusqlite::types::Type;
use crate::diagnostic::StorageDiagnostic;
use crate::edge::{EdgeKind, StorageEdge};
use crate::location::{
    LocationKind, Span, StorageCommentLocation, StorageOccurrence, StorageSourceLocation,
};
use crate::node::{
    AccessKind, DefinitionKind, NodeKind, StorageComponentAccess, StorageFile, StorageLocalSymbol,
    StorageNode, StorageSymbol,
};
use crate::{Error, Id};

/// Upper bound on bound parameters per statement
pub(super) const MAX_BATCH: usize = 500;

/// A record type the generic id lookups can fetch.
///
/// Each implementation knows its own SELECT, so `get_first_by_id::<T>` and
/// friends resolve to a fixed query at compile time.
pub trait StorageRow: Sized {
    /// Column list and FROM clause, without WHERE
    const SELECT: &'static str;
    /// Column the id lookups filter on
    const ID_COLUMN: &'static str;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

pub(super) fn to_sql_id(id: Id) -> i64 {
    id as i64
}

pub(super) fn from_sql_id(id: i64) -> Id {
    id as Id
}

/// `?1, ?2, ...` for an IN clause of `count` values
pub(super) fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Sorted, deduplicated ids with the `0` sentinel dropped
pub(super) fn unique_ids(ids: &[Id]) -> Vec<Id> {
    ids.iter()
        .copied()
        .filter(|id| *id != 0)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn get_id(row: &Row<'_>, idx: usize) -> rusqlite::Result<Id> {
    row.get::<_, i64>(idx).map(from_sql_id)
}

/// Decode a stored integer tag, rejecting values this build does not know
fn get_tag<T>(
    row: &Row<'_>,
    idx: usize,
    what: &str,
    decode: impl FnOnce(i64) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: i64 = row.get(idx)?;
    decode(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            Box::new(Error::InvalidValue(format!("unknown {what} tag {raw}"))),
        )
    })
}

fn get_span(row: &Row<'_>, first: usize) -> rusqlite::Result<Span> {
    Ok(Span::new(
        row.get(first)?,
        row.get(first + 1)?,
        row.get(first + 2)?,
        row.get(first + 3)?,
    ))
}

impl StorageRow for StorageNode {
    const SELECT: &'static str = "SELECT id, type, serialized_name FROM node";
    const ID_COLUMN: &'static str = "id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_id(row, 0)?,
            kind: get_tag(row, 1, "node kind", NodeKind::from_int)?,
            serialized_name: row.get(2)?,
        })
    }
}

impl StorageRow for StorageSymbol {
    const SELECT: &'static str = "SELECT node.id, node.type, node.serialized_name, symbol.definition_kind \
         FROM symbol JOIN node ON node.id = symbol.id";
    const ID_COLUMN: &'static str = "symbol.id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_id(row, 0)?,
            kind: get_tag(row, 1, "node kind", NodeKind::from_int)?,
            serialized_name: row.get(2)?,
            definition_kind: get_tag(row, 3, "definition kind", DefinitionKind::from_int)?,
        })
    }
}

impl StorageRow for StorageFile {
    const SELECT: &'static str = "SELECT node.id, node.serialized_name, file.path, file.modification_time, file.line_count \
         FROM file JOIN node ON node.id = file.id";
    const ID_COLUMN: &'static str = "file.id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_id(row, 0)?,
            serialized_name: row.get(1)?,
            file_path: row.get(2)?,
            modification_time: row.get(3)?,
            line_count: row.get(4)?,
        })
    }
}

impl StorageRow for StorageLocalSymbol {
    const SELECT: &'static str = "SELECT id, name FROM local_symbol";
    const ID_COLUMN: &'static str = "id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_id(row, 0)?,
            name: row.get(1)?,
        })
    }
}

impl StorageRow for StorageEdge {
    const SELECT: &'static str = "SELECT id, type, source_node_id, target_node_id FROM edge";
    const ID_COLUMN: &'static str = "id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_id(row, 0)?,
            kind: get_tag(row, 1, "edge kind", EdgeKind::from_int)?,
            source_node_id: get_id(row, 2)?,
            target_node_id: get_id(row, 3)?,
        })
    }
}

impl StorageRow for StorageSourceLocation {
    const SELECT: &'static str = "SELECT id, file_node_id, start_line, start_column, end_line, end_column, type \
         FROM source_location";
    const ID_COLUMN: &'static str = "id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_id(row, 0)?,
            file_node_id: get_id(row, 1)?,
            span: get_span(row, 2)?,
            kind: get_tag(row, 6, "location kind", LocationKind::from_int)?,
        })
    }
}

impl StorageRow for StorageOccurrence {
    const SELECT: &'static str = "SELECT element_id, source_location_id FROM occurrence";
    const ID_COLUMN: &'static str = "element_id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            element_id: get_id(row, 0)?,
            source_location_id: get_id(row, 1)?,
        })
    }
}

impl StorageRow for StorageComponentAccess {
    const SELECT: &'static str = "SELECT id, node_id, type FROM component_access";
    const ID_COLUMN: &'static str = "id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_id(row, 0)?,
            node_id: get_id(row, 1)?,
            access: get_tag(row, 2, "access kind", AccessKind::from_int)?,
        })
    }
}

impl StorageRow for StorageCommentLocation {
    const SELECT: &'static str = "SELECT id, file_node_id, start_line, start_column, end_line, end_column \
         FROM comment_location";
    const ID_COLUMN: &'static str = "id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_id(row, 0)?,
            file_node_id: get_id(row, 1)?,
            span: get_span(row, 2)?,
        })
    }
}

impl StorageRow for StorageDiagnostic {
    const SELECT: &'static str = "SELECT id, message, file_path, line_number, column_number, fatal, indexed \
         FROM error";
    const ID_COLUMN: &'static str = "id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_id(row, 0)?,
            message: row.get(1)?,
            file_path: row.get(2)?,
            line: row.get(3)?,
            column: row.get(4)?,
            fatal: row.get(5)?,
            indexed: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?1");
        assert_eq!(placeholders(3), "?1, ?2, ?3");
        assert_eq!(placeholders(0), "");
    }

    #[test]
    fn test_unique_ids_drops_sentinel() {
        assert_eq!(unique_ids(&[5, 0, 3, 5, 1]), vec![1, 3, 5]);
        assert!(unique_ids(&[0, 0]).is_empty());
    }

    #[test]
    fn test_unknown_tag_is_a_conversion_error() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let result = conn.query_row("SELECT 7, 999, 'x'", [], StorageNode::from_row);
        assert!(matches!(
            result,
            Err(rusqlite::Error::FromSqlConversionFailure(1, Type::Integer, _))
        ));
    }
}
