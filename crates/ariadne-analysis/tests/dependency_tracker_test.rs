//! Dependency tracker: 1-hop closure, built-in stale marking, and
//! idempotence of the affected-set computation.

use std::sync::Arc;

use ariadne_analysis::DependencyTracker;
use ariadne_core::models::{Edge, Relation, Summary, SummaryLevel, Symbol, SymbolKind};
use ariadne_storage::GraphStore;

/// OrderService.create calls OrderValidator.validate; both live in Order-
/// related classes. Changing validate() must invalidate its caller and its
/// containing class, nothing further.
fn seeded_store() -> Arc<GraphStore> {
    let store = Arc::new(GraphStore::open_in_memory().unwrap());

    store
        .insert_symbols(&[
            Symbol::new("com.example.OrderValidator", SymbolKind::Class, "OrderValidator"),
            Symbol::new(
                "com.example.OrderValidator.validate(Order)",
                SymbolKind::Method,
                "validate",
            )
            .with_parent("com.example.OrderValidator"),
            Symbol::new("com.example.OrderService", SymbolKind::Class, "OrderService"),
            Symbol::new(
                "com.example.OrderService.create(Order)",
                SymbolKind::Method,
                "create",
            )
            .with_parent("com.example.OrderService"),
            Symbol::new(
                "com.example.OrderController.post(Order)",
                SymbolKind::Method,
                "post",
            ),
        ])
        .unwrap();

    store
        .insert_edges(&[
            Edge::new(
                "com.example.OrderService.create(Order)",
                "com.example.OrderValidator.validate(Order)",
                Relation::Calls,
            ),
            // Two hops away: must NOT be in the 1-hop closure.
            Edge::new(
                "com.example.OrderController.post(Order)",
                "com.example.OrderService.create(Order)",
                Relation::Calls,
            ),
        ])
        .unwrap();

    store
}

#[test]
fn one_hop_closure_is_callers_plus_parent() {
    let store = seeded_store();
    let tracker = DependencyTracker::new(store);

    let affected = tracker
        .get_affected_symbols(&["com.example.OrderValidator.validate(Order)".into()])
        .unwrap();

    assert!(affected
        .total_set
        .contains("com.example.OrderValidator.validate(Order)"));
    assert!(affected
        .total_set
        .contains("com.example.OrderService.create(Order)"));
    assert!(affected.total_set.contains("com.example.OrderValidator"));
    // Transitive caller excluded: one hop only.
    assert!(!affected
        .total_set
        .contains("com.example.OrderController.post(Order)"));
    assert_eq!(affected.total(), 3);
}

#[test]
fn affected_summaries_are_marked_stale_in_the_same_operation() {
    let store = seeded_store();

    for fqn in [
        "com.example.OrderValidator.validate(Order)",
        "com.example.OrderService.create(Order)",
        "com.example.OrderValidator",
    ] {
        store
            .upsert_summary(&Summary::fresh(fqn, SummaryLevel::Method, "fresh"))
            .unwrap();
    }

    let tracker = DependencyTracker::new(Arc::clone(&store));
    tracker
        .get_affected_symbols(&["com.example.OrderValidator.validate(Order)".into()])
        .unwrap();

    for fqn in [
        "com.example.OrderValidator.validate(Order)",
        "com.example.OrderService.create(Order)",
        "com.example.OrderValidator",
    ] {
        assert!(
            store.get_summary(fqn, None).unwrap().unwrap().is_stale,
            "{fqn} must be stale"
        );
    }
}

#[test]
fn affected_set_is_idempotent_under_reapplication() {
    let store = seeded_store();
    let tracker = DependencyTracker::new(store);

    let first = tracker
        .get_affected_symbols(&["com.example.OrderValidator.validate(Order)".into()])
        .unwrap();
    let first_set = first.total_set.clone();

    let again_input: Vec<String> = first_set.iter().cloned().collect();
    let second = tracker.get_affected_symbols(&again_input).unwrap();

    // Re-running over the closure can only grow it.
    assert!(second.total_set.is_superset(&first_set));
}

#[test]
fn empty_change_set_is_empty() {
    let store = seeded_store();
    let tracker = DependencyTracker::new(store);
    let affected = tracker.get_affected_symbols(&[]).unwrap();
    assert_eq!(affected.total(), 0);
    assert!(affected.dependents.is_empty());
}

#[test]
fn direct_neighbours_resolve() {
    let store = seeded_store();
    let tracker = DependencyTracker::new(store);

    let callers = tracker
        .get_callers("com.example.OrderValidator.validate(Order)")
        .unwrap();
    assert_eq!(callers.len(), 1);
    assert_eq!(callers[0].symbol.fqn, "com.example.OrderService.create(Order)");

    let callees = tracker
        .get_callees("com.example.OrderService.create(Order)")
        .unwrap();
    assert_eq!(callees.len(), 1);

    let parent = tracker
        .get_parent_symbol("com.example.OrderValidator.validate(Order)")
        .unwrap()
        .unwrap();
    assert_eq!(parent.symbol.fqn, "com.example.OrderValidator");
}
