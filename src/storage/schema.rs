//! Database schema definitions

/// Storage format revision this build reads and writes.
/// Bump on any change to table layout or tag values.
pub const STORAGE_VERSION: u32 = 3;

/// Metadata keys
pub const META_STORAGE_VERSION: &str = "storage_version";
pub const META_APPLICATION_VERSION: &str = "application_version";
pub const META_PROJECT_SETTINGS: &str = "project_settings";
pub const META_ID_HIGH_WATER: &str = "id_high_water";

/// SQL to create the metadata table
pub const CREATE_META_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
)
"#;

/// SQL to create the node table
pub const CREATE_NODE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS node (
    id INTEGER PRIMARY KEY NOT NULL,
    type INTEGER NOT NULL,
    serialized_name TEXT NOT NULL UNIQUE
)
"#;

/// SQL to create the symbol table (extends node by id)
pub const CREATE_SYMBOL_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS symbol (
    id INTEGER PRIMARY KEY NOT NULL,
    definition_kind INTEGER NOT NULL
)
"#;

/// SQL to create the file table (extends node by id)
pub const CREATE_FILE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS file (
    id INTEGER PRIMARY KEY NOT NULL,
    path TEXT NOT NULL UNIQUE,
    modification_time TEXT NOT NULL,
    line_count INTEGER NOT NULL DEFAULT 0
)
"#;

/// SQL to create the local_symbol table
pub const CREATE_LOCAL_SYMBOL_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS local_symbol (
    id INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE
)
"#;

/// SQL to create the edge table
pub const CREATE_EDGE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS edge (
    id INTEGER PRIMARY KEY NOT NULL,
    type INTEGER NOT NULL,
    source_node_id INTEGER NOT NULL,
    target_node_id INTEGER NOT NULL
)
"#;

/// SQL to create the source_location table
pub const CREATE_SOURCE_LOCATION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS source_location (
    id INTEGER PRIMARY KEY NOT NULL,
    file_node_id INTEGER NOT NULL,
    start_line INTEGER NOT NULL,
    start_column INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_column INTEGER NOT NULL,
    type INTEGER NOT NULL
)
"#;

/// SQL to create the occurrence join table
pub const CREATE_OCCURRENCE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS occurrence (
    element_id INTEGER NOT NULL,
    source_location_id INTEGER NOT NULL,
    PRIMARY KEY (element_id, source_location_id)
)
"#;

/// SQL to create the component_access table
pub const CREATE_COMPONENT_ACCESS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS component_access (
    id INTEGER PRIMARY KEY NOT NULL,
    node_id INTEGER NOT NULL UNIQUE,
    type INTEGER NOT NULL
)
"#;

/// SQL to create the comment_location table
pub const CREATE_COMMENT_LOCATION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS comment_location (
    id INTEGER PRIMARY KEY NOT NULL,
    file_node_id INTEGER NOT NULL,
    start_line INTEGER NOT NULL,
    start_column INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_column INTEGER NOT NULL
)
"#;

/// SQL to create the error table
pub const CREATE_ERROR_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS error (
    id INTEGER PRIMARY KEY NOT NULL,
    message TEXT NOT NULL,
    file_path TEXT NOT NULL,
    line_number INTEGER NOT NULL,
    column_number INTEGER NOT NULL,
    fatal INTEGER NOT NULL,
    indexed INTEGER NOT NULL
)
"#;

/// Every table, in drop order
pub const TABLES: &[&str] = &[
    "occurrence",
    "component_access",
    "source_location",
    "comment_location",
    "edge",
    "symbol",
    "file",
    "local_symbol",
    "node",
    "error",
    "meta",
];

/// Tables whose ids come from the shared allocator
pub const ID_TABLES: &[&str] = &[
    "node",
    "edge",
    "local_symbol",
    "source_location",
    "component_access",
    "comment_location",
    "error",
];

/// Tables that hold indexed graph data; all empty means a fresh store
pub const CORE_TABLES: &[&str] = &["node", "edge", "local_symbol", "source_location", "error"];

/// All table creation statements
pub fn all_table_statements() -> Vec<&'static str> {
    vec![
        CREATE_META_TABLE,
        CREATE_NODE_TABLE,
        CREATE_SYMBOL_TABLE,
        CREATE_FILE_TABLE,
        CREATE_LOCAL_SYMBOL_TABLE,
        CREATE_EDGE_TABLE,
        CREATE_SOURCE_LOCATION_TABLE,
        CREATE_OCCURRENCE_TABLE,
        CREATE_COMPONENT_ACCESS_TABLE,
        CREATE_COMMENT_LOCATION_TABLE,
        CREATE_ERROR_TABLE,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_table_is_created_and_dropped() {
        let statements = all_table_statements();
        assert_eq!(statements.len(), TABLES.len());
        for table in TABLES {
            let needle = format!("CREATE TABLE IF NOT EXISTS {table} (");
            assert!(
                statements.iter().any(|stmt| stmt.contains(&needle)),
                "no DDL for {table}"
            );
        }
        for table in ID_TABLES.iter().chain(CORE_TABLES) {
            assert!(TABLES.contains(table));
        }
    }
}
