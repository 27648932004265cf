//! Dual-write coordinator: two-phase create, best-effort delete, file
//! invalidation, orphan detection and recovery.

use std::sync::Arc;

use ariadne_core::models::{Summary, SummaryLevel, Symbol, SymbolKind};
use ariadne_storage::{Collection, DualWriteCoordinator, GraphStore, VectorStore};

fn setup() -> (tempfile::TempDir, Arc<GraphStore>, DualWriteCoordinator, VectorStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(GraphStore::open(&dir.path().join("graph.db")).unwrap());
    let vectors = VectorStore::open(&dir.path().join("vectors")).unwrap();
    let coordinator = DualWriteCoordinator::new(Arc::clone(&store));
    (dir, store, coordinator, vectors)
}

fn seed_symbol(store: &GraphStore, fqn: &str) {
    store
        .insert_symbols(&[
            Symbol::new(fqn, SymbolKind::Method, fqn.rsplit('.').next().unwrap())
                .with_file("/src/Seed.java"),
        ])
        .unwrap();
}

#[test]
fn create_with_vector_links_both_planes() {
    let (_dir, store, coordinator, vectors) = setup();
    seed_symbol(&store, "com.example.A.m()");

    let summary = Summary::fresh("com.example.A.m()", SummaryLevel::Method, "Validates input");
    let vector_id = coordinator
        .create_summary_with_vector(&summary, Some(&[0.1, 0.2, 0.3]), &vectors)
        .unwrap()
        .unwrap();

    // SQLite row carries the id, the vector plane has the entry, and the
    // sync-state row says synced.
    let record = store.get_summary("com.example.A.m()", None).unwrap().unwrap();
    assert_eq!(record.vector_id.as_deref(), Some(vector_id.as_str()));
    assert!(!record.is_stale);
    assert!(vectors.get(Collection::Summaries, &vector_id).unwrap().is_some());

    let synced: i64 = store
        .with_reader(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM vector_sync_state WHERE sync_status = 'synced'",
                [],
                |row| row.get(0),
            )
            .map_err(ariadne_core::StorageError::sqlite)
        })
        .unwrap();
    assert_eq!(synced, 1);
}

#[test]
fn create_without_embedding_skips_vector_plane() {
    let (_dir, store, coordinator, vectors) = setup();
    seed_symbol(&store, "com.example.A.m()");

    let summary = Summary::fresh("com.example.A.m()", SummaryLevel::Method, "No vector");
    let vector_id = coordinator
        .create_summary_with_vector(&summary, None, &vectors)
        .unwrap();

    assert!(vector_id.is_none());
    assert_eq!(vectors.count(Collection::Summaries).unwrap(), 0);
    let record = store.get_summary("com.example.A.m()", None).unwrap().unwrap();
    assert!(record.vector_id.is_none());
}

#[test]
fn vector_failure_rolls_back_and_records_pending_op() {
    let (dir, store, coordinator, vectors) = setup();
    seed_symbol(&store, "com.example.A.m()");

    // Break the vector plane underneath the coordinator.
    {
        let conn = rusqlite::Connection::open(dir.path().join("vectors/vectors.db")).unwrap();
        conn.execute_batch("DROP TABLE vector_records;").unwrap();
    }

    let summary = Summary::fresh("com.example.A.m()", SummaryLevel::Method, "Will fail");
    let result =
        coordinator.create_summary_with_vector(&summary, Some(&[1.0, 0.0]), &vectors);
    assert!(result.is_err());

    // The summary row must have rolled back with the transaction...
    assert!(store.get_summary("com.example.A.m()", None).unwrap().is_none());

    // ...while the orphan-tracking op survived on its own connection.
    let pending: i64 = store
        .with_reader(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM pending_vector_ops WHERE op = 'create'",
                [],
                |row| row.get(0),
            )
            .map_err(ariadne_core::StorageError::sqlite)
        })
        .unwrap();
    assert_eq!(pending, 1);
}

#[test]
fn delete_cascade_removes_both_planes() {
    let (_dir, store, coordinator, vectors) = setup();
    seed_symbol(&store, "com.example.A.m()");

    let summary = Summary::fresh("com.example.A.m()", SummaryLevel::Method, "To delete");
    let vector_id = coordinator
        .create_summary_with_vector(&summary, Some(&[0.5, 0.5]), &vectors)
        .unwrap()
        .unwrap();

    let deleted = coordinator
        .delete_summary_cascade("com.example.A.m()", &vectors)
        .unwrap();
    assert!(deleted);

    assert!(store.get_summary("com.example.A.m()", None).unwrap().is_none());
    assert!(vectors.get(Collection::Summaries, &vector_id).unwrap().is_none());

    // Deleting again reports absence without error.
    assert!(!coordinator
        .delete_summary_cascade("com.example.A.m()", &vectors)
        .unwrap());
}

#[test]
fn stale_marking_by_file_includes_parents() {
    let (_dir, store, coordinator, vectors) = setup();

    store
        .insert_symbols(&[
            Symbol::new("com.example.Order", SymbolKind::Class, "Order")
                .with_file("/src/Other.java"),
            Symbol::new("com.example.Order.total()", SymbolKind::Method, "total")
                .with_parent("com.example.Order")
                .with_file("/src/Order.java"),
        ])
        .unwrap();

    // Fresh summaries for both the method and its containing class.
    coordinator
        .create_summary_with_vector(
            &Summary::fresh("com.example.Order.total()", SummaryLevel::Method, "Totals"),
            None,
            &vectors,
        )
        .unwrap();
    coordinator
        .create_summary_with_vector(
            &Summary::fresh("com.example.Order", SummaryLevel::Class, "An order"),
            None,
            &vectors,
        )
        .unwrap();

    let marked = coordinator
        .mark_summaries_stale_by_file("/src/Order.java")
        .unwrap();
    assert_eq!(marked, 2);

    assert!(store.get_summary("com.example.Order.total()", None).unwrap().unwrap().is_stale);
    assert!(store.get_summary("com.example.Order", None).unwrap().unwrap().is_stale);
}

#[test]
fn detect_orphans_on_clean_state_reports_zeros() {
    let (_dir, store, coordinator, vectors) = setup();
    seed_symbol(&store, "com.example.A.m()");
    coordinator
        .create_summary_with_vector(
            &Summary::fresh("com.example.A.m()", SummaryLevel::Method, "Clean"),
            Some(&[1.0]),
            &vectors,
        )
        .unwrap();

    let report = coordinator.detect_orphans(&vectors).unwrap();
    assert!(report.is_clean(), "clean state must report zero orphans: {report:?}");
}

#[test]
fn recover_orphans_deletes_unowned_vectors() {
    let (_dir, store, coordinator, vectors) = setup();
    seed_symbol(&store, "com.example.A.m()");
    coordinator
        .create_summary_with_vector(
            &Summary::fresh("com.example.A.m()", SummaryLevel::Method, "Owned"),
            Some(&[1.0]),
            &vectors,
        )
        .unwrap();

    // Plant a vector nothing owns.
    vectors
        .add(Collection::Summaries, "999", "orphan", Some(&[0.2]), None)
        .unwrap();

    let report = coordinator.detect_orphans(&vectors).unwrap();
    assert_eq!(report.vectors_missing_row, 1);

    let recovery = coordinator.recover_orphans(&vectors).unwrap();
    assert_eq!(recovery.orphan_vectors_deleted, 1);
    assert!(vectors.get(Collection::Summaries, "999").unwrap().is_none());

    // The owned vector is untouched.
    assert_eq!(vectors.count(Collection::Summaries).unwrap(), 1);
}

#[test]
fn recover_orphans_is_a_noop_when_clean() {
    let (_dir, _store, coordinator, vectors) = setup();
    let recovery = coordinator.recover_orphans(&vectors).unwrap();
    assert_eq!(recovery.orphan_vectors_deleted, 0);
    assert_eq!(recovery.ops_retried, 0);
    assert_eq!(recovery.sync_rows_cleared, 0);
}

#[test]
fn pending_create_op_replays_on_recovery() {
    let (dir, store, coordinator, vectors) = setup();
    seed_symbol(&store, "com.example.A.m()");

    // Break the vector plane under the live handle: its cached connection
    // now fails every write.
    {
        let conn = rusqlite::Connection::open(dir.path().join("vectors/vectors.db")).unwrap();
        conn.execute_batch("DROP TABLE vector_records;").unwrap();
    }
    let summary = Summary::fresh("com.example.A.m()", SummaryLevel::Method, "Retry me");
    assert!(coordinator
        .create_summary_with_vector(&summary, Some(&[1.0, 0.0]), &vectors)
        .is_err());
    drop(vectors);

    // Reopening heals the schema; recovery replays the recorded create.
    let healthy = VectorStore::open(&dir.path().join("vectors")).unwrap();

    let recovery = coordinator.recover_orphans(&healthy).unwrap();
    assert_eq!(recovery.ops_retried, 1);
    assert_eq!(recovery.ops_succeeded, 1);

    let record = store.get_summary("com.example.A.m()", None).unwrap().unwrap();
    assert!(record.vector_id.is_some());
    assert_eq!(healthy.count(Collection::Summaries).unwrap(), 1);
}
