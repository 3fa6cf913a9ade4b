//! Graph mutation API
//!
//! Every public operation is atomic on its own: it runs in a savepoint, so a
//! failed validation leaves no partial rows behind. Inside an explicit
//! transaction the savepoint nests and the outer commit decides durability.

use std::collections::BTreeSet;
use std::path::Path;
use rusqlite::{OptionalExtension, params, params_from_iter};
use crate::location::{LocationKind, Span};
use crate::node::{AccessKind, DefinitionKind, NodeKind};
use crate::edge::EdgeKind;
use crate::{Error, Id, Result};
use super::rows::{MAX_BATCH, from_sql_id, placeholders, to_sql_id, unique_ids};
use super::sqlite::SqliteStore;

impl SqliteStore {
    // ========== Node Operations ==========

    /// Insert a plain node. Serialized names are unique across all nodes.
    pub fn add_node(&self, kind: NodeKind, serialized_name: &str) -> Result<Id> {
        self.ensure_writable()?;
        self.atomically(|| self.insert_node(kind, serialized_name, "node"))
    }

    /// Insert a node together with its symbol row
    pub fn add_symbol(
        &self,
        kind: NodeKind,
        serialized_name: &str,
        definition_kind: DefinitionKind,
    ) -> Result<Id> {
        self.ensure_writable()?;
        self.atomically(|| {
            let id = self.insert_node(kind, serialized_name, "symbol")?;
            self.conn.execute(
                "INSERT INTO symbol (id, definition_kind) VALUES (?1, ?2)",
                params![to_sql_id(id), definition_kind.as_int()],
            )?;
            Ok(id)
        })
    }

    /// Insert a file node. The line count is read through the store's text
    /// access; a file that cannot be found counts as zero lines.
    pub fn add_file(
        &self,
        serialized_name: &str,
        file_path: &str,
        modification_time: &str,
    ) -> Result<Id> {
        self.ensure_writable()?;
        let line_count = self
            .text_access
            .read(Path::new(file_path))?
            .map(|content| content.line_count())
            .unwrap_or(0);
        self.atomically(|| self.insert_file(serialized_name, file_path, modification_time, line_count))
    }

    /// Insert a file node with a line count the caller already knows
    pub fn add_file_with_line_count(
        &self,
        serialized_name: &str,
        file_path: &str,
        modification_time: &str,
        line_count: u32,
    ) -> Result<Id> {
        self.ensure_writable()?;
        self.atomically(|| self.insert_file(serialized_name, file_path, modification_time, line_count))
    }

    pub fn add_local_symbol(&self, name: &str) -> Result<Id> {
        self.ensure_writable()?;
        self.atomically(|| {
            if name.is_empty() {
                return Err(Error::EmptyName("local symbol"));
            }
            let existing: Option<i64> = self
                .conn
                .query_row("SELECT id FROM local_symbol WHERE name = ?1", [name], |row| row.get(0))
                .optional()?;
            if let Some(id) = existing {
                return Err(Error::Duplicate(format!("local symbol {name:?} (id {id})")));
            }

            let id = self.allocate_id()?;
            self.conn.execute(
                "INSERT INTO local_symbol (id, name) VALUES (?1, ?2)",
                params![to_sql_id(id), name],
            )?;
            Ok(id)
        })
    }

    /// Change a node's kind. Returns false if no such node exists.
    pub fn set_node_type(&self, node_id: Id, kind: NodeKind) -> Result<bool> {
        self.ensure_writable()?;
        if node_id == 0 {
            return Ok(false);
        }
        let changed = self.conn.execute(
            "UPDATE node SET type = ?1 WHERE id = ?2",
            params![kind.as_int(), to_sql_id(node_id)],
        )?;
        Ok(changed > 0)
    }

    /// Change a symbol's definition kind. Returns false if no such symbol exists.
    pub fn set_symbol_definition_type(
        &self,
        symbol_id: Id,
        definition_kind: DefinitionKind,
    ) -> Result<bool> {
        self.ensure_writable()?;
        if symbol_id == 0 {
            return Ok(false);
        }
        let changed = self.conn.execute(
            "UPDATE symbol SET definition_kind = ?1 WHERE id = ?2",
            params![definition_kind.as_int(), to_sql_id(symbol_id)],
        )?;
        Ok(changed > 0)
    }

    fn insert_node(&self, kind: NodeKind, serialized_name: &str, what: &'static str) -> Result<Id> {
        if serialized_name.is_empty() {
            return Err(Error::EmptyName(what));
        }
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM node WHERE serialized_name = ?1",
                [serialized_name],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Err(Error::Duplicate(format!("{what} {serialized_name:?} (id {id})")));
        }

        let id = self.allocate_id()?;
        self.conn.execute(
            "INSERT INTO node (id, type, serialized_name) VALUES (?1, ?2, ?3)",
            params![to_sql_id(id), kind.as_int(), serialized_name],
        )?;
        Ok(id)
    }

    fn insert_file(
        &self,
        serialized_name: &str,
        file_path: &str,
        modification_time: &str,
        line_count: u32,
    ) -> Result<Id> {
        if file_path.is_empty() {
            return Err(Error::EmptyName("file path"));
        }
        let existing: Option<i64> = self
            .conn
            .query_row("SELECT id FROM file WHERE path = ?1", [file_path], |row| row.get(0))
            .optional()?;
        if let Some(id) = existing {
            return Err(Error::Duplicate(format!("file {file_path:?} (id {id})")));
        }

        let id = self.insert_node(NodeKind::File, serialized_name, "file")?;
        self.conn.execute(
            "INSERT INTO file (id, path, modification_time, line_count) VALUES (?1, ?2, ?3, ?4)",
            params![to_sql_id(id), file_path, modification_time, line_count],
        )?;
        Ok(id)
    }

    // ========== Edge Operations ==========

    /// Insert an edge between two existing nodes. An edge with the same
    /// (source, target, kind) is not duplicated; its id is returned instead.
    pub fn add_edge(&self, kind: EdgeKind, source_node_id: Id, target_node_id: Id) -> Result<Id> {
        self.ensure_writable()?;
        self.atomically(|| {
            self.require_node(source_node_id)?;
            self.require_node(target_node_id)?;

            let existing: Option<i64> = self
                .conn
                .query_row(
                    "SELECT id FROM edge WHERE source_node_id = ?1 AND target_node_id = ?2 AND type = ?3 \
                     ORDER BY id LIMIT 1",
                    params![to_sql_id(source_node_id), to_sql_id(target_node_id), kind.as_int()],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(id) = existing {
                tracing::debug!(
                    "Edge {} {} -> {} already stored as {}",
                    kind,
                    source_node_id,
                    target_node_id,
                    id
                );
                return Ok(from_sql_id(id));
            }

            let id = self.allocate_id()?;
            self.conn.execute(
                "INSERT INTO edge (id, type, source_node_id, target_node_id) VALUES (?1, ?2, ?3, ?4)",
                params![
                    to_sql_id(id),
                    kind.as_int(),
                    to_sql_id(source_node_id),
                    to_sql_id(target_node_id)
                ],
            )?;
            Ok(id)
        })
    }

    // ========== Location Operations ==========

    pub fn add_source_location(&self, file_node_id: Id, span: Span, kind: LocationKind) -> Result<Id> {
        self.ensure_writable()?;
        span.validate()?;
        self.atomically(|| {
            self.require_file(file_node_id)?;
            let id = self.allocate_id()?;
            self.conn.execute(
                "INSERT INTO source_location (id, file_node_id, start_line, start_column, end_line, end_column, type) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    to_sql_id(id),
                    to_sql_id(file_node_id),
                    span.start_line,
                    span.start_col,
                    span.end_line,
                    span.end_col,
                    kind.as_int()
                ],
            )?;
            Ok(id)
        })
    }

    /// Link an element (node, edge or local symbol) to a source location.
    /// Returns false when the pair was already linked.
    pub fn add_occurrence(&self, element_id: Id, source_location_id: Id) -> Result<bool> {
        self.ensure_writable()?;
        self.atomically(|| {
            if !(self.is_node(element_id)? || self.is_edge(element_id)? || self.is_local_symbol(element_id)?) {
                return Err(Error::MissingReference {
                    kind: "element",
                    id: element_id,
                });
            }
            if !self.is_source_location(source_location_id)? {
                return Err(Error::MissingReference {
                    kind: "source location",
                    id: source_location_id,
                });
            }

            let inserted = self.conn.execute(
                "INSERT OR IGNORE INTO occurrence (element_id, source_location_id) VALUES (?1, ?2)",
                params![to_sql_id(element_id), to_sql_id(source_location_id)],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn add_comment_location(&self, file_node_id: Id, span: Span) -> Result<Id> {
        self.ensure_writable()?;
        span.validate()?;
        self.atomically(|| {
            self.require_file(file_node_id)?;
            let id = self.allocate_id()?;
            self.conn.execute(
                "INSERT INTO comment_location (id, file_node_id, start_line, start_column, end_line, end_column) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    to_sql_id(id),
                    to_sql_id(file_node_id),
                    span.start_line,
                    span.start_col,
                    span.end_line,
                    span.end_col
                ],
            )?;
            Ok(id)
        })
    }

    // ========== Component Access Operations ==========

    /// Record the access level of a member. The key is the member node, or
    /// the member edge linking it to its parent. One record per key; a second
    /// call overwrites the level and returns the existing id.
    pub fn add_component_access(&self, node_id: Id, access: AccessKind) -> Result<Id> {
        self.ensure_writable()?;
        self.atomically(|| {
            if !(self.is_node(node_id)? || self.is_edge(node_id)?) {
                return Err(Error::MissingReference {
                    kind: "node",
                    id: node_id,
                });
            }

            let existing: Option<i64> = self
                .conn
                .query_row(
                    "SELECT id FROM component_access WHERE node_id = ?1",
                    [to_sql_id(node_id)],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(id) = existing {
                self.conn.execute(
                    "UPDATE component_access SET type = ?1 WHERE id = ?2",
                    params![access.as_int(), id],
                )?;
                return Ok(from_sql_id(id));
            }

            let id = self.allocate_id()?;
            self.conn.execute(
                "INSERT INTO component_access (id, node_id, type) VALUES (?1, ?2, ?3)",
                params![to_sql_id(id), to_sql_id(node_id), access.as_int()],
            )?;
            Ok(id)
        })
    }

    // ========== Error Operations ==========

    /// Record an indexing diagnostic. Reporting the same diagnostic twice
    /// returns the first row's id.
    pub fn add_error(
        &self,
        message: &str,
        file_path: &str,
        line: u32,
        column: u32,
        fatal: bool,
        indexed: bool,
    ) -> Result<Id> {
        self.ensure_writable()?;
        self.atomically(|| {
            let existing: Option<i64> = self
                .conn
                .query_row(
                    "SELECT id FROM error WHERE message = ?1 AND file_path = ?2 AND line_number = ?3 \
                     AND column_number = ?4 AND fatal = ?5 AND indexed = ?6 LIMIT 1",
                    params![message, file_path, line, column, fatal, indexed],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(id) = existing {
                return Ok(from_sql_id(id));
            }

            let id = self.allocate_id()?;
            self.conn.execute(
                "INSERT INTO error (id, message, file_path, line_number, column_number, fatal, indexed) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![to_sql_id(id), message, file_path, line, column, fatal, indexed],
            )?;
            Ok(id)
        })
    }

    /// Delete the diagnostics reported for the given paths
    pub fn remove_errors_in_files<S: AsRef<str>>(&self, file_paths: &[S]) -> Result<usize> {
        self.ensure_writable()?;
        self.atomically(|| {
            let mut removed = 0;
            for chunk in file_paths.chunks(MAX_BATCH) {
                let sql = format!("DELETE FROM error WHERE file_path IN ({})", placeholders(chunk.len()));
                removed += self
                    .conn
                    .execute(&sql, params_from_iter(chunk.iter().map(|path| path.as_ref())))?;
            }
            tracing::debug!("Removed {} errors in {} files", removed, file_paths.len());
            Ok(removed)
        })
    }

    // ========== Removal ==========

    pub fn remove_element(&self, id: Id) -> Result<usize> {
        self.remove_elements(&[id])
    }

    /// Delete nodes, edges and local symbols by id, with everything that
    /// references them:
    /// - occurrences and component access of every removed element
    /// - every edge touching a removed node
    /// - symbol and file rows of removed nodes
    /// - locations and comments of removed files
    ///
    /// Returns the number of elements removed, cascaded edges included.
    pub fn remove_elements(&self, ids: &[Id]) -> Result<usize> {
        self.ensure_writable()?;
        self.atomically(|| self.delete_elements(ids))
    }

    /// Clear everything indexed from the given files ahead of a re-index:
    /// their locations, the occurrences and comments in them, every element
    /// that lost its last occurrence that way, and the file nodes themselves.
    pub fn remove_elements_with_location_in_files(&self, file_ids: &[Id]) -> Result<usize> {
        self.ensure_writable()?;
        self.atomically(|| {
            // only file nodes are removed here
            let file_ids = self.select_ids_in("SELECT id FROM file", "id", file_ids)?;
            if file_ids.is_empty() {
                return Ok(0);
            }

            let location_ids =
                self.select_ids_in("SELECT id FROM source_location", "file_node_id", &file_ids)?;
            let candidates = self.select_ids_in(
                "SELECT DISTINCT element_id FROM occurrence",
                "source_location_id",
                &location_ids,
            )?;

            self.delete_where_in("occurrence", "source_location_id", &location_ids)?;
            self.delete_where_in("source_location", "id", &location_ids)?;
            self.delete_where_in("comment_location", "file_node_id", &file_ids)?;

            let still_referenced: BTreeSet<Id> = self
                .select_ids_in("SELECT DISTINCT element_id FROM occurrence", "element_id", &candidates)?
                .into_iter()
                .collect();
            let mut orphans: Vec<Id> = candidates
                .into_iter()
                .filter(|id| !still_referenced.contains(id))
                .collect();
            orphans.extend(&file_ids);

            let removed = self.delete_elements(&orphans)?;
            tracing::debug!(
                "Removed {} locations and {} elements from {} files",
                location_ids.len(),
                removed,
                file_ids.len()
            );
            Ok(removed)
        })
    }

    fn delete_elements(&self, ids: &[Id]) -> Result<usize> {
        let ids = unique_ids(ids);
        if ids.is_empty() {
            return Ok(0);
        }

        let node_ids = self.select_ids_in("SELECT id FROM node", "id", &ids)?;
        let local_symbol_ids = self.select_ids_in("SELECT id FROM local_symbol", "id", &ids)?;
        let mut edge_ids: BTreeSet<Id> = self
            .select_ids_in("SELECT id FROM edge", "id", &ids)?
            .into_iter()
            .collect();
        edge_ids.extend(self.select_ids_in("SELECT id FROM edge", "source_node_id", &node_ids)?);
        edge_ids.extend(self.select_ids_in("SELECT id FROM edge", "target_node_id", &node_ids)?);
        let edge_ids: Vec<Id> = edge_ids.into_iter().collect();

        let file_ids = self.select_ids_in("SELECT id FROM file", "id", &node_ids)?;
        if !file_ids.is_empty() {
            let location_ids =
                self.select_ids_in("SELECT id FROM source_location", "file_node_id", &file_ids)?;
            self.delete_where_in("occurrence", "source_location_id", &location_ids)?;
            self.delete_where_in("source_location", "id", &location_ids)?;
            self.delete_where_in("comment_location", "file_node_id", &file_ids)?;
            self.delete_where_in("file", "id", &file_ids)?;
        }

        let mut elements = node_ids.clone();
        elements.extend(&edge_ids);
        elements.extend(&local_symbol_ids);

        // locations left without any occurrence go with their elements
        let touched_locations = self.select_ids_in(
            "SELECT DISTINCT source_location_id FROM occurrence",
            "element_id",
            &elements,
        )?;
        self.delete_where_in("occurrence", "element_id", &elements)?;
        let kept_locations: BTreeSet<Id> = self
            .select_ids_in(
                "SELECT DISTINCT source_location_id FROM occurrence",
                "source_location_id",
                &touched_locations,
            )?
            .into_iter()
            .collect();
        let unused_locations: Vec<Id> = touched_locations
            .into_iter()
            .filter(|id| !kept_locations.contains(id))
            .collect();
        self.delete_where_in("source_location", "id", &unused_locations)?;

        self.delete_where_in("component_access", "node_id", &elements)?;
        let mut removed = self.delete_where_in("edge", "id", &edge_ids)?;
        self.delete_where_in("symbol", "id", &node_ids)?;
        removed += self.delete_where_in("node", "id", &node_ids)?;
        removed += self.delete_where_in("local_symbol", "id", &local_symbol_ids)?;
        Ok(removed)
    }

    fn delete_where_in(&self, table: &str, column: &str, ids: &[Id]) -> Result<usize> {
        let mut removed = 0;
        for chunk in ids.chunks(MAX_BATCH) {
            let sql = format!("DELETE FROM {table} WHERE {column} IN ({})", placeholders(chunk.len()));
            removed += self
                .conn
                .execute(&sql, params_from_iter(chunk.iter().map(|id| to_sql_id(*id))))?;
        }
        Ok(removed)
    }

    fn require_node(&self, id: Id) -> Result<()> {
        if !self.is_node(id)? {
            return Err(Error::MissingReference { kind: "node", id });
        }
        Ok(())
    }

    fn require_file(&self, id: Id) -> Result<()> {
        if !self.is_file(id)? {
            return Err(Error::MissingReference { kind: "file", id });
        }
        Ok(())
    }
}
