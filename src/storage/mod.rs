//! Storage Layer - SQLite-backed persistence
//!
//! System of record is one SQLite file with tables:
//! - node / symbol / file (graph vertices, symbol and file rows extend node by id)
//! - local_symbol, edge
//! - source_location, occurrence (location <-> element join)
//! - component_access, comment_location, error
//! - meta (storage version, id high-water mark, project settings)

pub mod schema;
pub mod index;
pub mod ids;
pub mod rows;
pub mod sqlite;
mod write;
mod read;

pub use index::{IndexMode, SqliteIndex};
pub use ids::IdAllocator;
pub use read::StorageStats;
pub use rows::StorageRow;
pub use schema::STORAGE_VERSION;
pub use sqlite::{AccessMode, SqliteStore};
