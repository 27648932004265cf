//! Recursive traversal: forward chains, reverse callers, cycles, and the
//! depth boundary.

use ariadne_core::models::{Edge, Relation, Symbol, SymbolKind};
use ariadne_storage::{Direction, GraphStore};

fn chain_store() -> GraphStore {
    let store = GraphStore::open_in_memory().unwrap();
    store
        .insert_symbols(&[
            Symbol::new("A", SymbolKind::Method, "a"),
            Symbol::new("B", SymbolKind::Method, "b"),
            Symbol::new("C", SymbolKind::Method, "c"),
            Symbol::new("D", SymbolKind::Method, "d"),
        ])
        .unwrap();
    store
        .insert_edges(&[
            Edge::new("A", "B", Relation::Calls),
            Edge::new("B", "C", Relation::Calls),
            Edge::new("C", "D", Relation::Calls),
        ])
        .unwrap();
    store
}

#[test]
fn forward_chain_depths_are_ordered() {
    let store = chain_store();
    let rows = store.get_call_chain("A", 10).unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows.iter().map(|r| r.depth).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(
        rows.iter().map(|r| r.to_fqn.as_str()).collect::<Vec<_>>(),
        vec!["B", "C", "D"]
    );
}

#[test]
fn reverse_callers_mirror_the_chain() {
    let store = chain_store();
    let rows = store.get_reverse_callers("D", 10).unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows.iter().map(|r| r.from_fqn.as_str()).collect::<Vec<_>>(),
        vec!["C", "B", "A"]
    );
}

#[test]
fn depth_zero_returns_empty_chain() {
    let store = chain_store();
    assert!(store.get_call_chain("A", 0).unwrap().is_empty());
    assert!(store.get_reverse_callers("D", 0).unwrap().is_empty());
}

#[test]
fn depth_cap_bounds_the_chain() {
    let store = chain_store();
    let rows = store.get_call_chain("A", 1).unwrap();
    // Base rows (depth 0) plus one recursion level.
    assert_eq!(rows.iter().map(|r| r.depth).max(), Some(1));
}

#[test]
fn cycles_terminate_and_deduplicate() {
    let store = GraphStore::open_in_memory().unwrap();
    store
        .insert_symbols(&[
            Symbol::new("A", SymbolKind::Method, "a"),
            Symbol::new("B", SymbolKind::Method, "b"),
        ])
        .unwrap();
    store
        .insert_edges(&[
            Edge::new("A", "B", Relation::Calls),
            Edge::new("B", "A", Relation::Calls),
        ])
        .unwrap();

    let rows = store.get_call_chain("A", 10).unwrap();
    // Distinctness is over (from, to, relation): each edge appears once,
    // at its shallowest depth.
    assert_eq!(rows.len(), 2);
    let mut pairs: Vec<(&str, &str)> = rows
        .iter()
        .map(|r| (r.from_fqn.as_str(), r.to_fqn.as_str()))
        .collect();
    pairs.sort();
    assert_eq!(pairs, vec![("A", "B"), ("B", "A")]);
}

#[test]
fn only_calls_edges_are_traversed() {
    let store = GraphStore::open_in_memory().unwrap();
    store
        .insert_symbols(&[
            Symbol::new("A", SymbolKind::Class, "a"),
            Symbol::new("B", SymbolKind::Class, "b"),
        ])
        .unwrap();
    store
        .insert_edges(&[Edge::new("A", "B", Relation::Inherits)])
        .unwrap();

    assert!(store.get_call_chain("A", 10).unwrap().is_empty());
}

#[test]
fn related_symbols_resolve_neighbours() {
    let store = chain_store();

    let outgoing = store
        .get_related_symbols("A", Some(Relation::Calls), Direction::Outgoing)
        .unwrap();
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].symbol.fqn, "B");

    let incoming = store
        .get_related_symbols("B", Some(Relation::Calls), Direction::Incoming)
        .unwrap();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].symbol.fqn, "A");

    let both = store
        .get_related_symbols("B", Some(Relation::Calls), Direction::Both)
        .unwrap();
    assert_eq!(both.len(), 2);
}
