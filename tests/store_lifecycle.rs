//! On-disk store behavior across handles and sessions

use codetrail::config::ProjectSettings;
use codetrail::{
    AccessMode, DefinitionKind, EdgeKind, Error, IndexMode, LocationKind, MemoryTextAccess,
    NodeKind, Span, SqliteStore, StorageSourceLocation, STORAGE_VERSION,
};
use std::path::Path;

fn create_store(path: &Path) -> SqliteStore {
    let store = SqliteStore::open(path, AccessMode::ReadWrite).unwrap();
    store.setup().unwrap();
    store
}

#[test]
fn test_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("index.db");

    let foo = {
        let store = create_store(&db);
        store
            .add_symbol(NodeKind::Function, "::\tmns\tnfoo", DefinitionKind::Explicit)
            .unwrap()
    };

    let store = SqliteStore::open(&db, AccessMode::ReadOnly).unwrap();
    assert_eq!(store.db_path(), Some(db.as_path()));
    let symbol = store.get_symbol_by_serialized_name("::\tmns\tnfoo").unwrap().unwrap();
    assert_eq!(symbol.id, foo);
    assert!(!store.is_incompatible().unwrap());
}

#[test]
fn test_ids_are_not_reused_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("index.db");

    let (removed, committed) = {
        let mut store = create_store(&db);
        let a = store.add_node(NodeKind::Class, "::\tmA").unwrap();
        store.add_node(NodeKind::Class, "::\tmB").unwrap();
        store.remove_element(a).unwrap();

        store.begin_transaction().unwrap();
        let c = store.add_node(NodeKind::Class, "::\tmC").unwrap();
        store.commit_transaction().unwrap();
        store.remove_element(c).unwrap();
        (a, c)
    };

    let store = SqliteStore::open(&db, AccessMode::ReadWrite).unwrap();
    let next = store.add_node(NodeKind::Class, "::\tmD").unwrap();
    assert!(next > removed);
    assert!(next > committed);
}

#[test]
fn test_rolled_back_ids_stay_burned_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("index.db");

    let burned = {
        let mut store = create_store(&db);
        store.add_node(NodeKind::Class, "::\tmA").unwrap();
        store.begin_transaction().unwrap();
        let b = store.add_node(NodeKind::Class, "::\tmB").unwrap();
        store.rollback_transaction().unwrap();
        assert!(!store.is_node(b).unwrap());
        b
    };

    let store = SqliteStore::open(&db, AccessMode::ReadWrite).unwrap();
    assert!(store.id_high_water() >= burned);
    let next = store.add_node(NodeKind::Class, "::\tmC").unwrap();
    assert!(next > burned);
}

#[test]
fn test_read_only_rejects_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("index.db");
    create_store(&db).add_node(NodeKind::Module, "::\tmcore").unwrap();

    let mut store = SqliteStore::open(&db, AccessMode::ReadOnly).unwrap();
    assert!(store.is_read_only());
    assert!(matches!(store.add_node(NodeKind::Module, "::\tmother"), Err(Error::ReadOnly)));
    assert!(matches!(store.remove_element(1), Err(Error::ReadOnly)));
    assert!(matches!(store.begin_transaction(), Err(Error::ReadOnly)));
    assert!(matches!(store.clear(), Err(Error::ReadOnly)));
    assert!(matches!(store.set_project_settings_text("x"), Err(Error::ReadOnly)));
    assert_eq!(store.get_node_count().unwrap(), 1);
}

#[test]
fn test_read_only_open_of_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        SqliteStore::open(&dir.path().join("missing.db"), AccessMode::ReadOnly),
        Err(Error::Storage(_))
    ));
}

#[test]
fn test_version_gate_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("index.db");
    {
        let store = create_store(&db);
        store.add_node(NodeKind::Class, "::\tmA").unwrap();
        store.set_storage_version(STORAGE_VERSION - 1).unwrap();
    }

    let store = SqliteStore::open(&db, AccessMode::ReadWrite).unwrap();
    assert!(store.is_incompatible().unwrap());
    assert!(matches!(store.get_node_count(), Err(Error::Incompatible { .. })));
    assert!(matches!(
        store.add_node(NodeKind::Class, "::\tmB"),
        Err(Error::Incompatible { .. })
    ));
    // metadata stays readable so callers can report what they found
    assert_eq!(store.storage_version().unwrap(), Some(STORAGE_VERSION - 1));

    store.clear().unwrap();
    assert!(!store.is_incompatible().unwrap());
    assert!(store.is_empty().unwrap());
}

#[test]
fn test_fresh_file_is_compatible_before_setup() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("index.db"), AccessMode::ReadWrite).unwrap();
    assert!(store.is_empty().unwrap());
    assert!(!store.is_incompatible().unwrap());
    assert_eq!(store.storage_version().unwrap(), None);

    store.setup().unwrap();
    assert_eq!(store.storage_version().unwrap(), Some(STORAGE_VERSION));
}

#[test]
fn test_reindex_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let access = MemoryTextAccess::new()
        .with_file("a.cpp", "void foo();\nvoid bar() { foo(); }\n")
        .with_file("b.cpp", "void baz() { foo(); }\n");
    let mut store = create_store(&dir.path().join("index.db")).with_text_access(access);

    // index both files
    store.begin_transaction().unwrap();
    let a = store.add_file("a.cpp", "a.cpp", "2024-01-01 10:00:00").unwrap();
    let b = store.add_file("b.cpp", "b.cpp", "2024-01-01 10:00:00").unwrap();
    let foo = store.add_symbol(NodeKind::Function, "::\tmfoo", DefinitionKind::Explicit).unwrap();
    let bar = store.add_symbol(NodeKind::Function, "::\tmbar", DefinitionKind::Explicit).unwrap();
    let call = store.add_edge(EdgeKind::Call, bar, foo).unwrap();

    let foo_decl = store.add_source_location(a, Span::new(1, 6, 1, 8), LocationKind::Token).unwrap();
    let bar_decl = store.add_source_location(a, Span::new(2, 6, 2, 8), LocationKind::Token).unwrap();
    let call_site = store.add_source_location(a, Span::new(2, 14, 2, 16), LocationKind::Token).unwrap();
    let foo_use_b = store.add_source_location(b, Span::new(1, 14, 1, 16), LocationKind::Token).unwrap();
    store.add_occurrence(foo, foo_decl).unwrap();
    store.add_occurrence(bar, bar_decl).unwrap();
    store.add_occurrence(call, call_site).unwrap();
    store.add_occurrence(foo, foo_use_b).unwrap();
    store.add_error("unexpected token", "a.cpp", 5, 3, false, true).unwrap();
    store.commit_transaction().unwrap();
    assert_eq!(store.get_file_line_sum().unwrap(), 3);

    // a.cpp changed: clear what it contributed
    store.begin_transaction().unwrap();
    store.remove_elements_with_location_in_files(&[a]).unwrap();
    store.remove_errors_in_files(&["a.cpp"]).unwrap();
    store.commit_transaction().unwrap();

    assert!(store.get_file_by_path("a.cpp").unwrap().is_none());
    assert!(store.get_errors_in_file("a.cpp").unwrap().is_empty());
    assert!(store.get_all_by_ids::<StorageSourceLocation>(&[foo_decl, bar_decl, call_site]).unwrap().is_empty());
    assert!(!store.is_node(bar).unwrap());
    assert!(!store.is_edge(call).unwrap());
    // still referenced from b.cpp
    assert!(store.is_node(foo).unwrap());
    assert_eq!(store.get_token_locations_for_file("b.cpp").unwrap().len(), 1);
    assert_eq!(store.get_file_line_sum().unwrap(), 1);

    // re-insert fresh results for a.cpp
    let a2 = store.add_file("a.cpp", "a.cpp", "2024-01-02 09:00:00").unwrap();
    assert!(a2 > a);
    let decl = store.add_source_location(a2, Span::new(1, 6, 1, 8), LocationKind::Token).unwrap();
    store.add_occurrence(foo, decl).unwrap();
    let view = store.get_token_locations_for_file("a.cpp").unwrap();
    assert_eq!(view.locations_of_element(foo).count(), 1);
}

#[test]
fn test_bulk_insert_mode_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = create_store(&dir.path().join("index.db"));

    store.set_index_mode(IndexMode::BulkInsert).unwrap();
    store.begin_transaction().unwrap();
    let mut previous = store.add_node(NodeKind::Namespace, "::\tmroot").unwrap();
    for i in 0..50 {
        let node = store.add_node(NodeKind::Function, &format!("::\tmf{i}")).unwrap();
        store.add_edge(EdgeKind::Call, previous, node).unwrap();
        previous = node;
    }
    store.commit_transaction().unwrap();
    store.set_index_mode(IndexMode::Query).unwrap();
    store.optimize_memory().unwrap();

    assert_eq!(store.get_node_count().unwrap(), 51);
    assert_eq!(store.get_edges_by_type(EdgeKind::Call).unwrap().len(), 50);
}

#[test]
fn test_project_settings_travel_with_index() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("index.db");

    let mut settings = ProjectSettings::new("demo");
    settings.source_paths = vec!["src".into()];
    settings.header_search_paths = vec!["/usr/include".into()];
    create_store(&db).set_project_settings_text(&settings.to_text().unwrap()).unwrap();

    let store = SqliteStore::open(&db, AccessMode::ReadOnly).unwrap();
    let text = store.project_settings_text().unwrap().unwrap();
    assert_eq!(ProjectSettings::from_text(&text).unwrap(), settings);
    assert_eq!(
        store.application_version().unwrap().as_deref(),
        Some(env!("CARGO_PKG_VERSION"))
    );
}
