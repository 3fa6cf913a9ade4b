//! Graph query API
//!
//! Lookups never treat absence as an error: unknown ids, names and paths
//! yield `None` or an empty collection. Id `0` short-circuits without
//! touching the database.

use std::path::Path;
use rusqlite::{OptionalExtension, Params, params, params_from_iter};
use serde::Serialize;
use crate::diagnostic::StorageDiagnostic;
use crate::edge::{EdgeKind, StorageEdge};
use crate::location::{
    LocationKind, Span, StorageCommentLocation, StorageOccurrence, StorageSourceLocation,
    TokenLocationFile,
};
use crate::node::{StorageComponentAccess, StorageFile, StorageLocalSymbol, StorageNode, StorageSymbol};
use crate::text::FileContent;
use crate::{Id, Result};
use super::rows::{MAX_BATCH, StorageRow, from_sql_id, placeholders, to_sql_id, unique_ids};
use super::sqlite::SqliteStore;

/// Aggregate counts for progress and statistics display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub nodes: usize,
    pub edges: usize,
    pub files: usize,
    pub lines: u64,
    pub source_locations: usize,
    pub errors: usize,
}

impl std::fmt::Display for StorageStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Storage Statistics:")?;
        writeln!(f, "  Nodes: {}", self.nodes)?;
        writeln!(f, "  Edges: {}", self.edges)?;
        writeln!(f, "  Files: {} ({} lines)", self.files, self.lines)?;
        writeln!(f, "  Source locations: {}", self.source_locations)?;
        writeln!(f, "  Errors: {}", self.errors)
    }
}

impl SqliteStore {
    // ========== Generic Lookups ==========

    /// Fetch one row of kind `T` by id
    pub fn get_first_by_id<T: StorageRow>(&self, id: Id) -> Result<Option<T>> {
        if id == 0 {
            return Ok(None);
        }
        self.check_compatible()?;
        let sql = format!("{} WHERE {} = ?1 LIMIT 1", T::SELECT, T::ID_COLUMN);
        self.conn
            .query_row(&sql, [to_sql_id(id)], T::from_row)
            .optional()
            .map_err(Into::into)
    }

    /// Fetch every row of kind `T` whose id is listed. Unknown ids and `0`
    /// are skipped.
    pub fn get_all_by_ids<T: StorageRow>(&self, ids: &[Id]) -> Result<Vec<T>> {
        self.query_rows_in(T::ID_COLUMN, ids)
    }

    /// Fetch every row of kind `T`
    pub fn get_all<T: StorageRow>(&self) -> Result<Vec<T>> {
        self.query_rows("", [])
    }

    pub(super) fn query_rows<T: StorageRow, P: Params>(&self, filter: &str, params: P) -> Result<Vec<T>> {
        self.check_compatible()?;
        let sql = format!("{} {}", T::SELECT, filter);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(params, T::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn query_rows_in<T: StorageRow>(&self, column: &str, ids: &[Id]) -> Result<Vec<T>> {
        let ids = unique_ids(ids);
        let mut rows = Vec::new();
        for chunk in ids.chunks(MAX_BATCH) {
            let filter = format!("WHERE {column} IN ({})", placeholders(chunk.len()));
            rows.extend(self.query_rows(&filter, params_from_iter(chunk.iter().map(|id| to_sql_id(*id))))?);
        }
        Ok(rows)
    }

    /// Run `select` (a single id column) filtered by `column IN ids`
    pub(super) fn select_ids_in(&self, select: &str, column: &str, ids: &[Id]) -> Result<Vec<Id>> {
        let mut found = Vec::new();
        for chunk in unique_ids(ids).chunks(MAX_BATCH) {
            let sql = format!("{select} WHERE {column} IN ({})", placeholders(chunk.len()));
            let mut stmt = self.conn.prepare(&sql)?;
            let ids = stmt
                .query_map(params_from_iter(chunk.iter().map(|id| to_sql_id(*id))), |row| {
                    row.get::<_, i64>(0)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            found.extend(ids.into_iter().map(from_sql_id));
        }
        Ok(found)
    }

    fn row_exists(&self, table: &str, id: Id) -> Result<bool> {
        if id == 0 {
            return Ok(false);
        }
        self.check_compatible()?;
        let found: Option<i64> = self
            .conn
            .query_row(
                &format!("SELECT 1 FROM {table} WHERE id = ?1"),
                [to_sql_id(id)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn is_node(&self, id: Id) -> Result<bool> {
        self.row_exists("node", id)
    }

    pub fn is_edge(&self, id: Id) -> Result<bool> {
        self.row_exists("edge", id)
    }

    pub fn is_file(&self, id: Id) -> Result<bool> {
        self.row_exists("file", id)
    }

    pub fn is_local_symbol(&self, id: Id) -> Result<bool> {
        self.row_exists("local_symbol", id)
    }

    pub fn is_source_location(&self, id: Id) -> Result<bool> {
        self.row_exists("source_location", id)
    }

    // ========== Name Lookups ==========

    pub fn get_node_by_serialized_name(&self, serialized_name: &str) -> Result<Option<StorageNode>> {
        self.first_where("WHERE serialized_name = ?1", [serialized_name])
    }

    pub fn get_symbol_by_serialized_name(&self, serialized_name: &str) -> Result<Option<StorageSymbol>> {
        self.first_where("WHERE node.serialized_name = ?1", [serialized_name])
    }

    pub fn get_local_symbol_by_name(&self, name: &str) -> Result<Option<StorageLocalSymbol>> {
        self.first_where("WHERE name = ?1", [name])
    }

    fn first_where<T: StorageRow, P: Params>(&self, filter: &str, params: P) -> Result<Option<T>> {
        Ok(self
            .query_rows(&format!("{filter} LIMIT 1"), params)?
            .into_iter()
            .next())
    }

    // ========== File Operations ==========

    pub fn get_file_by_path(&self, file_path: &str) -> Result<Option<StorageFile>> {
        self.first_where("WHERE file.path = ?1", [file_path])
    }

    pub fn get_files_by_paths<S: AsRef<str>>(&self, file_paths: &[S]) -> Result<Vec<StorageFile>> {
        let mut files = Vec::new();
        for chunk in file_paths.chunks(MAX_BATCH) {
            let filter = format!("WHERE file.path IN ({})", placeholders(chunk.len()));
            files.extend(self.query_rows(&filter, params_from_iter(chunk.iter().map(|p| p.as_ref())))?);
        }
        Ok(files)
    }

    /// Current on-disk content of a path, read through the text access
    pub fn get_file_content_by_path(&self, file_path: &str) -> Result<Option<FileContent>> {
        self.text_access.read(Path::new(file_path))
    }

    /// Current content of a stored file
    pub fn get_file_content_by_id(&self, file_id: Id) -> Result<Option<FileContent>> {
        match self.get_first_by_id::<StorageFile>(file_id)? {
            Some(file) => self.get_file_content_by_path(&file.file_path),
            None => Ok(None),
        }
    }

    // ========== Edge Operations ==========

    pub fn get_edges_by_source_id(&self, source_node_id: Id) -> Result<Vec<StorageEdge>> {
        self.get_edges_by_source_ids(&[source_node_id])
    }

    pub fn get_edges_by_target_id(&self, target_node_id: Id) -> Result<Vec<StorageEdge>> {
        self.get_edges_by_target_ids(&[target_node_id])
    }

    pub fn get_edges_by_source_ids(&self, source_node_ids: &[Id]) -> Result<Vec<StorageEdge>> {
        self.query_rows_in("source_node_id", source_node_ids)
    }

    pub fn get_edges_by_target_ids(&self, target_node_ids: &[Id]) -> Result<Vec<StorageEdge>> {
        self.query_rows_in("target_node_id", target_node_ids)
    }

    /// Every edge touching the node, self loops reported once
    pub fn get_edges_by_source_or_target_id(&self, node_id: Id) -> Result<Vec<StorageEdge>> {
        if node_id == 0 {
            return Ok(Vec::new());
        }
        self.query_rows(
            "WHERE source_node_id = ?1 OR target_node_id = ?1",
            [to_sql_id(node_id)],
        )
    }

    pub fn get_edges_by_type(&self, kind: EdgeKind) -> Result<Vec<StorageEdge>> {
        self.query_rows("WHERE type = ?1", [kind.as_int()])
    }

    pub fn get_edges_by_source_type(&self, source_node_id: Id, kind: EdgeKind) -> Result<Vec<StorageEdge>> {
        if source_node_id == 0 {
            return Ok(Vec::new());
        }
        self.query_rows(
            "WHERE source_node_id = ?1 AND type = ?2",
            params![to_sql_id(source_node_id), kind.as_int()],
        )
    }

    pub fn get_edges_by_target_type(&self, target_node_id: Id, kind: EdgeKind) -> Result<Vec<StorageEdge>> {
        if target_node_id == 0 {
            return Ok(Vec::new());
        }
        self.query_rows(
            "WHERE target_node_id = ?1 AND type = ?2",
            params![to_sql_id(target_node_id), kind.as_int()],
        )
    }

    /// Edges of one kind pointing at any of the given nodes
    pub fn get_edges_by_target_ids_type(&self, target_node_ids: &[Id], kind: EdgeKind) -> Result<Vec<StorageEdge>> {
        let mut edges = self.get_edges_by_target_ids(target_node_ids)?;
        edges.retain(|edge| edge.kind == kind);
        Ok(edges)
    }

    /// Exact (source, target, kind) lookup. The lowest id wins if more than
    /// one row matches.
    pub fn get_edge_by_source_target_type(
        &self,
        source_node_id: Id,
        target_node_id: Id,
        kind: EdgeKind,
    ) -> Result<Option<StorageEdge>> {
        if source_node_id == 0 || target_node_id == 0 {
            return Ok(None);
        }
        self.first_where(
            "WHERE source_node_id = ?1 AND target_node_id = ?2 AND type = ?3 ORDER BY id",
            params![to_sql_id(source_node_id), to_sql_id(target_node_id), kind.as_int()],
        )
    }

    // ========== Location Operations ==========

    /// Exact span lookup, used to avoid storing the same location twice
    pub fn get_source_location_by_all(
        &self,
        file_node_id: Id,
        span: Span,
        kind: LocationKind,
    ) -> Result<Option<StorageSourceLocation>> {
        if file_node_id == 0 {
            return Ok(None);
        }
        self.first_where(
            "WHERE file_node_id = ?1 AND start_line = ?2 AND start_column = ?3 \
             AND end_line = ?4 AND end_column = ?5 AND type = ?6 ORDER BY id",
            params![
                to_sql_id(file_node_id),
                span.start_line,
                span.start_col,
                span.end_line,
                span.end_col,
                kind.as_int()
            ],
        )
    }

    pub fn get_source_locations_for_file(&self, file_node_id: Id) -> Result<Vec<StorageSourceLocation>> {
        if file_node_id == 0 {
            return Ok(Vec::new());
        }
        self.query_rows(
            "WHERE file_node_id = ?1 ORDER BY start_line, start_column, id",
            [to_sql_id(file_node_id)],
        )
    }

    /// Every location in a file with the elements occurring at it.
    /// Unknown paths give an empty view.
    pub fn get_token_locations_for_file(&self, file_path: &str) -> Result<TokenLocationFile> {
        let Some(file) = self.get_file_by_path(file_path)? else {
            return Ok(TokenLocationFile::new(file_path));
        };

        let locations = self.get_source_locations_for_file(file.id)?;
        let location_ids: Vec<Id> = locations.iter().map(|location| location.id).collect();
        let occurrences = self.get_occurrences_for_location_ids(&location_ids)?;
        Ok(TokenLocationFile::build(file_path, locations, &occurrences))
    }

    pub fn get_comment_locations_in_file(&self, file_path: &str) -> Result<Vec<StorageCommentLocation>> {
        let Some(file) = self.get_file_by_path(file_path)? else {
            return Ok(Vec::new());
        };
        self.query_rows(
            "WHERE file_node_id = ?1 ORDER BY start_line, start_column, id",
            [to_sql_id(file.id)],
        )
    }

    // ========== Occurrence Operations ==========

    pub fn get_occurrences_for_location_id(&self, source_location_id: Id) -> Result<Vec<StorageOccurrence>> {
        self.get_occurrences_for_location_ids(&[source_location_id])
    }

    pub fn get_occurrences_for_location_ids(&self, source_location_ids: &[Id]) -> Result<Vec<StorageOccurrence>> {
        self.query_rows_in("source_location_id", source_location_ids)
    }

    pub fn get_occurrences_for_element_ids(&self, element_ids: &[Id]) -> Result<Vec<StorageOccurrence>> {
        self.query_rows_in("element_id", element_ids)
    }

    // ========== Component Access Operations ==========

    pub fn get_component_access_by_node_id(&self, node_id: Id) -> Result<Option<StorageComponentAccess>> {
        if node_id == 0 {
            return Ok(None);
        }
        self.first_where("WHERE node_id = ?1", [to_sql_id(node_id)])
    }

    pub fn get_component_accesses_by_node_ids(&self, node_ids: &[Id]) -> Result<Vec<StorageComponentAccess>> {
        self.query_rows_in("node_id", node_ids)
    }

    // ========== Error Operations ==========

    pub fn get_errors(&self) -> Result<Vec<StorageDiagnostic>> {
        self.query_rows("ORDER BY file_path, line_number, column_number, id", [])
    }

    pub fn get_errors_in_file(&self, file_path: &str) -> Result<Vec<StorageDiagnostic>> {
        self.query_rows(
            "WHERE file_path = ?1 ORDER BY line_number, column_number, id",
            [file_path],
        )
    }

    // ========== Counts ==========

    fn count(&self, sql: &str) -> Result<usize> {
        self.check_compatible()?;
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn get_node_count(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM node")
    }

    pub fn get_edge_count(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM edge")
    }

    pub fn get_file_count(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM file")
    }

    pub fn get_source_location_count(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM source_location")
    }

    pub fn get_error_count(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM error")
    }

    /// Total line count over all stored files
    pub fn get_file_line_sum(&self) -> Result<u64> {
        self.check_compatible()?;
        let sum: i64 = self
            .conn
            .query_row("SELECT COALESCE(SUM(line_count), 0) FROM file", [], |row| row.get(0))?;
        Ok(sum.max(0) as u64)
    }

    pub fn stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            nodes: self.get_node_count()?,
            edges: self.get_edge_count()?,
            files: self.get_file_count()?,
            lines: self.get_file_line_sum()?,
            source_locations: self.get_source_location_count()?,
            errors: self.get_error_count()?,
        })
    }
}
