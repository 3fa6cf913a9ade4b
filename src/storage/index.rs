//! Secondary indices and the modes that need them
//!
//! Uniqueness indices (node names, file paths, occurrence pairs) live in the
//! table DDL and always exist. The indices here only speed up lookups, so
//! they can be dropped while bulk inserting and rebuilt for querying.

use serde::{Deserialize, Serialize};

/// Workload the secondary indices are tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexMode {
    /// Every lookup index exists (default)
    Query,
    /// Only indices read by insert deduplication and file cleanup
    BulkInsert,
}

/// A named index over one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqliteIndex {
    pub name: &'static str,
    pub table: &'static str,
    pub columns: &'static [&'static str],
    /// Also kept in `IndexMode::BulkInsert`
    pub needed_for_insert: bool,
}

impl SqliteIndex {
    pub const fn new(
        name: &'static str,
        table: &'static str,
        columns: &'static [&'static str],
        needed_for_insert: bool,
    ) -> Self {
        Self {
            name,
            table,
            columns,
            needed_for_insert,
        }
    }

    pub fn create_sql(&self) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {}({})",
            self.name,
            self.table,
            self.columns.join(", ")
        )
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP INDEX IF EXISTS {}", self.name)
    }

    pub fn is_needed_for(&self, mode: IndexMode) -> bool {
        match mode {
            IndexMode::Query => true,
            IndexMode::BulkInsert => self.needed_for_insert,
        }
    }
}

/// All secondary indices
pub const INDICES: &[SqliteIndex] = &[
    SqliteIndex::new(
        "edge_triple_index",
        "edge",
        &["source_node_id", "target_node_id", "type"],
        true,
    ),
    SqliteIndex::new("edge_target_index", "edge", &["target_node_id"], true),
    SqliteIndex::new("edge_type_index", "edge", &["type"], false),
    SqliteIndex::new(
        "source_location_all_index",
        "source_location",
        &["file_node_id", "start_line", "start_column", "end_line", "end_column", "type"],
        true,
    ),
    SqliteIndex::new("source_location_type_index", "source_location", &["type"], false),
    SqliteIndex::new(
        "occurrence_source_location_index",
        "occurrence",
        &["source_location_id"],
        true,
    ),
    SqliteIndex::new(
        "comment_location_file_index",
        "comment_location",
        &["file_node_id"],
        true,
    ),
    SqliteIndex::new("error_file_path_index", "error", &["file_path"], true),
];
