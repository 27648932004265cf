//! Graph neighborhood queries: bounded BFS with truncation metadata.

use std::sync::Arc;

use ariadne_analysis::graph::GraphQueryService;
use ariadne_core::models::{Edge, Relation, Symbol, SymbolKind};
use ariadne_core::AriadneError;
use ariadne_storage::{Direction, GraphStore};

fn star_store() -> Arc<GraphStore> {
    // Hub calls five spokes; one spoke calls a further leaf.
    let store = Arc::new(GraphStore::open_in_memory().unwrap());

    let mut symbols = vec![Symbol::new("hub", SymbolKind::Method, "hub")];
    let mut edges = Vec::new();
    for i in 0..5 {
        let spoke = format!("spoke{i}");
        symbols.push(Symbol::new(&spoke, SymbolKind::Method, &spoke));
        edges.push(Edge::new("hub", &spoke, Relation::Calls));
    }
    symbols.push(Symbol::new("leaf", SymbolKind::Method, "leaf"));
    edges.push(Edge::new("spoke0", "leaf", Relation::Calls));

    store.insert_symbols(&symbols).unwrap();
    store.insert_edges(&edges).unwrap();
    store
}

#[test]
fn bfs_collects_nodes_and_edges_with_depth() {
    let service = GraphQueryService::new(star_store());

    let result = service
        .query("hub", Some(Relation::Calls), Direction::Outgoing, 2, 100)
        .unwrap();

    // hub + 5 spokes + leaf.
    assert_eq!(result.metadata.total_nodes, 7);
    assert_eq!(result.metadata.total_edges, 6);
    assert!(!result.metadata.truncated);
    assert_eq!(result.metadata.max_depth, 2);

    let leaf = result.nodes.iter().find(|n| n.fqn == "leaf").unwrap();
    assert_eq!(leaf.depth, 2);
}

#[test]
fn depth_limits_expansion() {
    let service = GraphQueryService::new(star_store());

    let result = service
        .query("hub", Some(Relation::Calls), Direction::Outgoing, 1, 100)
        .unwrap();

    // The leaf is two hops out and must be absent.
    assert!(result.nodes.iter().all(|n| n.fqn != "leaf"));
    assert_eq!(result.metadata.total_nodes, 6);
}

#[test]
fn max_results_truncates_and_reports_it() {
    let service = GraphQueryService::new(star_store());

    let result = service
        .query("hub", Some(Relation::Calls), Direction::Outgoing, 2, 3)
        .unwrap();

    assert!(result.metadata.truncated);
    assert!(result.metadata.total_nodes <= 3);
}

#[test]
fn incoming_direction_walks_callers() {
    let service = GraphQueryService::new(star_store());

    let result = service
        .query("leaf", Some(Relation::Calls), Direction::Incoming, 3, 100)
        .unwrap();

    let fqns: Vec<&str> = result.nodes.iter().map(|n| n.fqn.as_str()).collect();
    assert!(fqns.contains(&"leaf"));
    assert!(fqns.contains(&"spoke0"));
    assert!(fqns.contains(&"hub"));
}

#[test]
fn unknown_start_is_not_found() {
    let service = GraphQueryService::new(star_store());
    let result = service.query("missing", None, Direction::Both, 2, 100);
    assert!(matches!(result, Err(AriadneError::NotFound { .. })));
}

#[test]
fn query_time_is_reported() {
    let service = GraphQueryService::new(star_store());
    let result = service
        .query("hub", None, Direction::Both, 1, 100)
        .unwrap();
    // Milliseconds may legitimately be zero on fast machines; the field
    // just has to be present and sane.
    assert!(result.metadata.query_time_ms < 10_000);
}
