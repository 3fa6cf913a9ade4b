//! # Codetrail - persistent graph index for source-code analysis
//!
//! Stores everything a parser discovers about a code base and answers the
//! structural queries a navigation UI needs.
//!
//! Codetrail provides:
//! - A typed node/edge graph (symbols, files, local symbols) in SQLite
//! - Source locations and the occurrences joining them to graph elements
//! - Transactional, per-file writes with incremental re-index cleanup
//! - Version-gated storage files carrying their project settings

pub mod name;
pub mod node;
pub mod edge;
pub mod location;
pub mod diagnostic;
pub mod text;
pub mod storage;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use name::NameHierarchy;
pub use node::{
    AccessKind, DefinitionKind, NodeKind, StorageComponentAccess, StorageFile, StorageLocalSymbol,
    StorageNode, StorageSymbol,
};
pub use edge::{EdgeKind, StorageEdge};
pub use location::{
    LocationKind, Span, StorageCommentLocation, StorageOccurrence, StorageSourceLocation,
    TokenLocation, TokenLocationFile,
};
pub use diagnostic::StorageDiagnostic;
pub use text::{FileContent, FileSystemTextAccess, MemoryTextAccess, TextAccess};
pub use storage::{AccessMode, IndexMode, SqliteStore, StorageStats, STORAGE_VERSION};

/// Identifier shared by every stored entity kind. `0` means "none".
pub type Id = u64;

/// Result type alias for Codetrail operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Codetrail operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Incompatible storage version {found} (expected {expected}), a full re-index is required")]
    Incompatible { found: u32, expected: u32 },

    #[error("Store is opened read-only")]
    ReadOnly,

    #[error("Referenced {kind} {id} does not exist")]
    MissingReference { kind: &'static str, id: Id },

    #[error("Empty name for {0}")]
    EmptyName(&'static str),

    #[error("Already stored: {0}")]
    Duplicate(String),

    #[error("Invalid span: {0}")]
    InvalidSpan(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("A transaction is already open")]
    TransactionAlreadyOpen,

    #[error("No transaction is open")]
    NoTransaction,

    #[error("Invalid project settings: {0}")]
    Settings(String),
}
