//! SQLite storage implementation: connection, schema lifecycle, transactions
//! and metadata. The graph API lives in `write.rs` and `read.rs`.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use crate::{Error, Id, Result};
use crate::text::{FileSystemTextAccess, TextAccess};
use super::ids::IdAllocator;
use super::index::{INDICES, IndexMode};
use super::schema::{self, STORAGE_VERSION};

/// Whether a handle may mutate the store. Fixed at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

/// SQLite-backed storage for the code graph
pub struct SqliteStore {
    pub(super) conn: Connection,
    pub(super) text_access: Box<dyn TextAccess>,
    ids: IdAllocator,
    db_path: Option<PathBuf>,
    mode: AccessMode,
    transaction_open: bool,
    incompatible: Cell<bool>,
    index_mode: Cell<IndexMode>,
}

impl SqliteStore {
    /// Open a database file. Read-write handles create the file if needed;
    /// read-only handles fail if it does not exist.
    ///
    /// Opening only inspects the stored version. Call `setup()` before
    /// writing to a fresh file.
    pub fn open(path: &Path, mode: AccessMode) -> Result<Self> {
        let conn = match mode {
            AccessMode::ReadWrite => Connection::open(path)?,
            AccessMode::ReadOnly => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?,
        };
        let store = Self::from_connection(conn, Some(path.to_path_buf()), mode)?;
        tracing::debug!("Opened {} ({:?})", path.display(), mode);
        Ok(store)
    }

    /// Open a set-up in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self::from_connection(conn, None, AccessMode::ReadWrite)?;
        store.setup()?;
        Ok(store)
    }

    fn from_connection(conn: Connection, db_path: Option<PathBuf>, mode: AccessMode) -> Result<Self> {
        let store = Self {
            conn,
            text_access: Box::new(FileSystemTextAccess),
            ids: IdAllocator::default(),
            db_path,
            mode,
            transaction_open: false,
            incompatible: Cell::new(false),
            index_mode: Cell::new(IndexMode::Query),
        };
        store.ids.observe(store.stored_high_water()?);

        if store.is_incompatible()? {
            tracing::warn!(
                "Storage version {:?} does not match expected version {}",
                store.storage_version()?,
                STORAGE_VERSION
            );
        }
        Ok(store)
    }

    /// Replace the collaborator that serves file contents
    pub fn with_text_access(mut self, text_access: impl TextAccess + 'static) -> Self {
        self.text_access = Box::new(text_access);
        self
    }

    /// Backing file, `None` for in-memory stores
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn is_read_only(&self) -> bool {
        self.mode == AccessMode::ReadOnly
    }

    // ========== Schema Lifecycle ==========

    /// Create all tables and indices if absent and stamp the version of a
    /// fresh store. Safe to call on an existing compatible store.
    pub fn setup(&self) -> Result<()> {
        self.ensure_mode_writable()?;
        if self.is_incompatible()? {
            return Err(self.incompatible_error()?);
        }

        self.atomically(|| {
            self.create_tables()?;
            if self.storage_version()?.is_none() {
                self.set_version()?;
                self.persist_high_water()?;
            }
            Ok(())
        })?;

        tracing::info!("Storage schema ready (version {})", STORAGE_VERSION);
        Ok(())
    }

    /// Drop every table, metadata included, and recreate the schema.
    /// The id allocator keeps counting; see `reset_ids`.
    pub fn clear(&self) -> Result<()> {
        self.ensure_mode_writable()?;

        self.atomically(|| {
            for table in schema::TABLES {
                self.conn.execute(&format!("DROP TABLE IF EXISTS {table}"), [])?;
            }
            self.create_tables()?;
            self.set_version()?;
            self.persist_high_water()?;
            Ok(())
        })?;
        self.incompatible.set(false);

        tracing::info!("Storage cleared");
        Ok(())
    }

    fn create_tables(&self) -> Result<()> {
        for stmt in schema::all_table_statements() {
            self.conn.execute(stmt, [])?;
        }
        let mode = self.index_mode.get();
        for index in INDICES.iter().filter(|index| index.is_needed_for(mode)) {
            self.conn.execute(&index.create_sql(), [])?;
        }
        Ok(())
    }

    /// True when the core graph tables hold no rows (or do not exist yet)
    pub fn is_empty(&self) -> Result<bool> {
        for table in schema::CORE_TABLES {
            if !self.has_table(table)? {
                continue;
            }
            let any: Option<i64> = self
                .conn
                .query_row(&format!("SELECT 1 FROM {table} LIMIT 1"), [], |row| row.get(0))
                .optional()?;
            if any.is_some() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether the stored format differs from `STORAGE_VERSION`.
    /// A store without a version stamp is compatible only while empty.
    pub fn is_incompatible(&self) -> Result<bool> {
        let incompatible = match self.storage_version()? {
            Some(version) => version != STORAGE_VERSION,
            None => !self.is_empty()?,
        };
        self.incompatible.set(incompatible);
        Ok(incompatible)
    }

    /// Create the indices `mode` needs and drop the rest. The handle keeps
    /// the mode, so later `setup()` and `clear()` calls build the same set.
    /// New handles start in `IndexMode::Query`.
    pub fn set_index_mode(&self, mode: IndexMode) -> Result<()> {
        self.ensure_writable()?;
        for index in INDICES {
            if index.is_needed_for(mode) {
                self.conn.execute(&index.create_sql(), [])?;
            } else {
                self.conn.execute(&index.drop_sql(), [])?;
            }
        }
        self.index_mode.set(mode);
        tracing::info!("Index mode set to {:?}", mode);
        Ok(())
    }

    pub fn index_mode(&self) -> IndexMode {
        self.index_mode.get()
    }

    /// Release cached pages held by the connection
    pub fn optimize_memory(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA shrink_memory")?;
        Ok(())
    }

    pub(super) fn has_table(&self, table: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    // ========== Guards ==========

    /// Fail unless the handle may write and the stored format is current
    pub(super) fn ensure_writable(&self) -> Result<()> {
        self.ensure_mode_writable()?;
        self.check_compatible()
    }

    fn ensure_mode_writable(&self) -> Result<()> {
        if self.is_read_only() {
            tracing::warn!("Rejected write on read-only store");
            return Err(Error::ReadOnly);
        }
        Ok(())
    }

    /// Fail if the store was found incompatible
    pub(super) fn check_compatible(&self) -> Result<()> {
        if self.incompatible.get() {
            return Err(self.incompatible_error()?);
        }
        Ok(())
    }

    fn incompatible_error(&self) -> Result<Error> {
        Ok(Error::Incompatible {
            found: self.storage_version()?.unwrap_or(0),
            expected: STORAGE_VERSION,
        })
    }

    /// Run `f` inside a savepoint: all of its writes land or none do.
    /// Nests inside an explicit transaction.
    pub(super) fn atomically<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.conn.execute_batch("SAVEPOINT codetrail_op")?;
        match f() {
            Ok(value) => {
                self.conn.execute_batch("RELEASE SAVEPOINT codetrail_op")?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_error) = self
                    .conn
                    .execute_batch("ROLLBACK TO SAVEPOINT codetrail_op; RELEASE SAVEPOINT codetrail_op")
                {
                    tracing::error!("Failed to roll back savepoint: {}", rollback_error);
                }
                Err(e)
            }
        }
    }

    // ========== Transactions ==========

    /// Begin a unit of work. Transactions do not nest.
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.ensure_writable()?;
        if self.sync_transaction_state() {
            return Err(Error::TransactionAlreadyOpen);
        }
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        self.transaction_open = true;
        Ok(())
    }

    /// Make every write since `begin_transaction` durable
    pub fn commit_transaction(&mut self) -> Result<()> {
        if !self.sync_transaction_state() {
            return Err(Error::NoTransaction);
        }
        self.persist_high_water()?;
        if let Err(e) = self.conn.execute_batch("COMMIT") {
            self.sync_transaction_state();
            return Err(e.into());
        }
        self.transaction_open = false;
        Ok(())
    }

    /// Discard every write since `begin_transaction`. Ids allocated in the
    /// meantime stay burned.
    pub fn rollback_transaction(&mut self) -> Result<()> {
        if !self.transaction_open {
            return Err(Error::NoTransaction);
        }
        // SQLite may have rolled back already
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        self.transaction_open = false;
        // the rollback also undid the in-transaction high-water write
        self.persist_high_water()?;
        tracing::debug!("Transaction rolled back");
        Ok(())
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction_open && !self.conn.is_autocommit()
    }

    /// Drop the open-transaction flag if SQLite already ended the
    /// transaction on its own, e.g. after `SQLITE_FULL`.
    fn sync_transaction_state(&mut self) -> bool {
        if self.transaction_open && self.conn.is_autocommit() {
            tracing::warn!("Transaction was ended by SQLite; discarding it");
            self.transaction_open = false;
            if let Err(e) = self.persist_high_water() {
                tracing::error!("Failed to persist id high-water mark: {}", e);
            }
        }
        self.transaction_open
    }

    // ========== Identifiers ==========

    /// Next id from the shared allocator. Outside an explicit transaction
    /// the high-water mark is persisted right away, otherwise on commit.
    pub(super) fn allocate_id(&self) -> Result<Id> {
        let id = self.ids.next();
        if !self.in_transaction() {
            self.persist_high_water()?;
        }
        Ok(id)
    }

    /// Restart id allocation right after the highest id still stored
    pub fn reset_ids(&self) -> Result<()> {
        self.ensure_writable()?;
        let high_water = self.max_stored_id()?;
        self.ids.reset_to(high_water);
        self.persist_high_water()?;
        tracing::info!("Id allocator reset to {}", high_water);
        Ok(())
    }

    /// Highest id handed out or persisted so far
    pub fn id_high_water(&self) -> Id {
        self.ids.high_water()
    }

    fn persist_high_water(&self) -> Result<()> {
        self.insert_or_update_meta_value(schema::META_ID_HIGH_WATER, &self.ids.high_water().to_string())
    }

    fn stored_high_water(&self) -> Result<Id> {
        let persisted = self
            .get_meta_value(schema::META_ID_HIGH_WATER)?
            .and_then(|value| value.parse::<Id>().ok())
            .unwrap_or(0);
        Ok(persisted.max(self.max_stored_id()?))
    }

    fn max_stored_id(&self) -> Result<Id> {
        let mut max: Id = 0;
        for table in schema::ID_TABLES {
            if !self.has_table(table)? {
                continue;
            }
            let table_max: Option<i64> =
                self.conn
                    .query_row(&format!("SELECT MAX(id) FROM {table}"), [], |row| row.get(0))?;
            max = max.max(table_max.unwrap_or(0).max(0) as Id);
        }
        Ok(max)
    }

    // ========== Metadata ==========

    fn get_meta_value(&self, key: &str) -> Result<Option<String>> {
        if !self.has_table("meta")? {
            return Ok(None);
        }
        self.conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    fn insert_or_update_meta_value(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO meta (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// Stamp the current storage version and crate version
    pub fn set_version(&self) -> Result<()> {
        self.set_storage_version(STORAGE_VERSION)?;
        self.set_application_version(env!("CARGO_PKG_VERSION"))
    }

    /// Persisted storage format version, `None` if never stamped.
    /// An unreadable stamp reads as version 0, which never matches.
    pub fn storage_version(&self) -> Result<Option<u32>> {
        Ok(self.get_meta_value(schema::META_STORAGE_VERSION)?.map(|value| {
            value.trim().parse::<u32>().unwrap_or_else(|_| {
                tracing::warn!("Unreadable storage version {:?}", value);
                0
            })
        }))
    }

    /// Overwrite the persisted storage format version
    pub fn set_storage_version(&self, version: u32) -> Result<()> {
        self.ensure_mode_writable()?;
        self.insert_or_update_meta_value(schema::META_STORAGE_VERSION, &version.to_string())?;
        self.incompatible.set(version != STORAGE_VERSION);
        Ok(())
    }

    /// Version of the tool that last wrote the store (diagnostics only)
    pub fn application_version(&self) -> Result<Option<String>> {
        self.get_meta_value(schema::META_APPLICATION_VERSION)
    }

    pub fn set_application_version(&self, version: &str) -> Result<()> {
        self.ensure_mode_writable()?;
        self.insert_or_update_meta_value(schema::META_APPLICATION_VERSION, version)
    }

    /// Opaque project settings stored next to the index
    pub fn project_settings_text(&self) -> Result<Option<String>> {
        self.get_meta_value(schema::META_PROJECT_SETTINGS)
    }

    pub fn set_project_settings_text(&self, text: &str) -> Result<()> {
        self.ensure_mode_writable()?;
        self.insert_or_update_meta_value(schema::META_PROJECT_SETTINGS, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{DefinitionKind, NodeKind};

    #[test]
    fn test_setup_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.is_empty().unwrap());
        assert!(!store.is_incompatible().unwrap());

        store.add_symbol(NodeKind::Function, "::\tmfoo", DefinitionKind::Explicit).unwrap();
        store.setup().unwrap();
        assert!(!store.is_empty().unwrap());
        assert_eq!(store.storage_version().unwrap(), Some(STORAGE_VERSION));
    }

    #[test]
    fn test_version_mismatch_is_incompatible() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set_storage_version(STORAGE_VERSION + 1).unwrap();
        assert!(store.is_incompatible().unwrap());

        let err = store.add_node(NodeKind::Class, "::\tmWidget").unwrap_err();
        assert!(matches!(err, Error::Incompatible { found, expected }
            if found == STORAGE_VERSION + 1 && expected == STORAGE_VERSION));
        assert!(matches!(store.get_node_count(), Err(Error::Incompatible { .. })));
        assert!(matches!(store.setup(), Err(Error::Incompatible { .. })));

        store.clear().unwrap();
        assert!(!store.is_incompatible().unwrap());
        assert_eq!(store.get_node_count().unwrap(), 0);
    }

    #[test]
    fn test_clear_drops_rows_and_restamps() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set_project_settings_text("name = \"demo\"").unwrap();
        let id = store.add_node(NodeKind::Namespace, "::\tmns").unwrap();

        store.clear().unwrap();
        assert!(store.is_empty().unwrap());
        assert_eq!(store.project_settings_text().unwrap(), None);
        assert_eq!(store.storage_version().unwrap(), Some(STORAGE_VERSION));
        assert_eq!(
            store.application_version().unwrap().as_deref(),
            Some(env!("CARGO_PKG_VERSION"))
        );

        // ids keep counting across a clear
        let next = store.add_node(NodeKind::Namespace, "::\tmns").unwrap();
        assert!(next > id);
    }

    #[test]
    fn test_reset_ids() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.add_node(NodeKind::Namespace, "::\tma").unwrap();
        store.add_node(NodeKind::Namespace, "::\tmb").unwrap();
        store.clear().unwrap();
        store.reset_ids().unwrap();
        assert_eq!(store.add_node(NodeKind::Namespace, "::\tmc").unwrap(), 1);
    }

    #[test]
    fn test_transaction_rollback_restores_counts() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let keep = store.add_node(NodeKind::Class, "::\tmKeep").unwrap();
        let before = (store.get_node_count().unwrap(), store.get_edge_count().unwrap());

        store.begin_transaction().unwrap();
        let a = store.add_node(NodeKind::Function, "::\tma").unwrap();
        store.add_edge(crate::EdgeKind::Call, a, keep).unwrap();
        assert_eq!(store.get_node_count().unwrap(), before.0 + 1);
        store.rollback_transaction().unwrap();

        assert_eq!((store.get_node_count().unwrap(), store.get_edge_count().unwrap()), before);
        // burned ids are not reused
        assert!(store.add_node(NodeKind::Function, "::\tma").unwrap() > a);
    }

    #[test]
    fn test_transaction_ended_by_sqlite_is_discarded() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.begin_transaction().unwrap();
        let lost = store.add_node(NodeKind::Class, "::\tmLost").unwrap();
        store.conn.execute_batch("ROLLBACK").unwrap();
        assert!(!store.in_transaction());

        store.begin_transaction().unwrap();
        let kept = store.add_node(NodeKind::Class, "::\tmKept").unwrap();
        store.conn.execute_batch("ROLLBACK").unwrap();
        store.rollback_transaction().unwrap();

        store.begin_transaction().unwrap();
        store.add_node(NodeKind::Class, "::\tmKept").unwrap();
        store.commit_transaction().unwrap();
        assert_eq!(store.get_node_count().unwrap(), 1);
        assert!(store.id_high_water() > kept && kept > lost);
    }

    #[test]
    fn test_unreadable_version_stamp_is_incompatible() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("index.db");
        {
            let store = SqliteStore::open(&db, AccessMode::ReadWrite).unwrap();
            store.setup().unwrap();
            store.add_node(NodeKind::Class, "::\tmA").unwrap();
            store.insert_or_update_meta_value(schema::META_STORAGE_VERSION, "v2").unwrap();
        }

        let store = SqliteStore::open(&db, AccessMode::ReadWrite).unwrap();
        assert_eq!(store.storage_version().unwrap(), Some(0));
        assert!(store.is_incompatible().unwrap());
        assert!(matches!(store.get_node_count(), Err(Error::Incompatible { found: 0, .. })));

        store.clear().unwrap();
        assert!(!store.is_incompatible().unwrap());
    }

    #[test]
    fn test_transactions_do_not_nest() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(store.commit_transaction(), Err(Error::NoTransaction)));
        store.begin_transaction().unwrap();
        assert!(matches!(store.begin_transaction(), Err(Error::TransactionAlreadyOpen)));
        store.add_node(NodeKind::Class, "::\tmA").unwrap();
        store.commit_transaction().unwrap();
        assert!(!store.in_transaction());
        assert_eq!(store.get_node_count().unwrap(), 1);
    }

    #[test]
    fn test_failed_insert_leaves_no_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.add_symbol(NodeKind::Function, "::\tmfoo", DefinitionKind::Explicit).unwrap();
        assert!(matches!(
            store.add_symbol(NodeKind::Function, "::\tmfoo", DefinitionKind::None),
            Err(Error::Duplicate(_))
        ));
        assert_eq!(store.get_node_count().unwrap(), 1);
    }

    #[test]
    fn test_index_modes() {
        let store = SqliteStore::open_in_memory().unwrap();
        let index_exists = |name: &str| -> bool {
            store
                .conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1",
                    [name],
                    |row| row.get::<_, i64>(0),
                )
                .optional()
                .unwrap()
                .is_some()
        };

        assert!(index_exists("edge_type_index"));
        store.set_index_mode(IndexMode::BulkInsert).unwrap();
        assert!(!index_exists("edge_type_index"));
        assert!(index_exists("edge_triple_index"));
        store.set_index_mode(IndexMode::Query).unwrap();
        assert!(index_exists("edge_type_index"));

        // setup and clear keep the chosen mode
        store.set_index_mode(IndexMode::BulkInsert).unwrap();
        store.setup().unwrap();
        assert_eq!(store.index_mode(), IndexMode::BulkInsert);
        assert!(!index_exists("edge_type_index"));
        store.clear().unwrap();
        assert!(!index_exists("edge_type_index"));
        assert!(index_exists("edge_triple_index"));
    }

    #[test]
    fn test_project_settings_roundtrip() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.project_settings_text().unwrap(), None);
        store.set_project_settings_text("source_paths = [\"src\"]").unwrap();
        assert_eq!(
            store.project_settings_text().unwrap().as_deref(),
            Some("source_paths = [\"src\"]")
        );
    }
}
