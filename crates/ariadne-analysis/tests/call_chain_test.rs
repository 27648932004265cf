//! Call-chain tracer: entry resolution, layer annotation, and dependency
//! enrichment.

use std::sync::Arc;

use ariadne_analysis::CallChainTracer;
use ariadne_core::models::{
    DependencyStrength, DependencyType, Edge, EntryPoint, EntryType, ExternalDependency,
    Relation, Symbol, SymbolKind,
};
use ariadne_core::AriadneError;
use ariadne_storage::GraphStore;

fn traced_store() -> Arc<GraphStore> {
    let store = Arc::new(GraphStore::open_in_memory().unwrap());

    store
        .insert_symbols(&[
            Symbol::new(
                "com.example.OrderController.post(Order)",
                SymbolKind::Method,
                "post",
            )
            .with_parent("com.example.OrderController"),
            Symbol::new(
                "com.example.OrderService.create(Order)",
                SymbolKind::Method,
                "create",
            )
            .with_parent("com.example.OrderService"),
            Symbol::new(
                "com.example.OrderMapper.insert(Order)",
                SymbolKind::Method,
                "insert",
            )
            .with_parent("com.example.OrderMapper"),
        ])
        .unwrap();

    store
        .insert_edges(&[
            Edge::new(
                "com.example.OrderController.post(Order)",
                "com.example.OrderService.create(Order)",
                Relation::Calls,
            ),
            Edge::new(
                "com.example.OrderService.create(Order)",
                "com.example.OrderMapper.insert(Order)",
                Relation::Calls,
            ),
        ])
        .unwrap();

    store
        .insert_entry_points(&[EntryPoint {
            symbol_fqn: "com.example.OrderController.post(Order)".into(),
            entry_type: EntryType::HttpApi,
            http_method: Some("POST".into()),
            http_path: Some("/api/orders".into()),
            cron_expression: None,
            mq_queue: None,
        }])
        .unwrap();

    store
        .insert_external_dependencies(&[ExternalDependency {
            caller_fqn: "com.example.OrderService.create(Order)".into(),
            dependency_type: DependencyType::Mysql,
            target: "com.example.OrderMapper.insert(Order)".into(),
            strength: DependencyStrength::Strong,
        }])
        .unwrap();

    store
}

#[test]
fn trace_from_fqn_walks_the_chain_with_layers() {
    let tracer = CallChainTracer::new(traced_store());

    let result = tracer
        .trace_from_fqn("com.example.OrderController.post(Order)", 10)
        .unwrap();

    assert_eq!(result.chain.len(), 2);
    assert_eq!(result.depth, 1);
    assert_eq!(result.chain[0].layer, "service");
    assert_eq!(result.chain[1].layer, "repository");
}

#[test]
fn http_descriptor_resolves_the_entry_point() {
    let tracer = CallChainTracer::new(traced_store());

    let result = tracer.trace_from_entry("POST /api/orders", 10).unwrap();
    assert_eq!(result.entry.fqn, "com.example.OrderController.post(Order)");
    assert_eq!(result.entry.http_method.as_deref(), Some("POST"));
    assert_eq!(result.chain.len(), 2);
}

#[test]
fn http_descriptor_falls_back_to_path_prefix() {
    let tracer = CallChainTracer::new(traced_store());

    // Path parameters extend past the registered base path.
    let result = tracer.trace_from_entry("POST /api/orders/42", 10).unwrap();
    assert_eq!(result.entry.fqn, "com.example.OrderController.post(Order)");
}

#[test]
fn fqn_descriptor_resolves_directly() {
    let tracer = CallChainTracer::new(traced_store());
    let result = tracer
        .trace_from_entry("com.example.OrderService.create(Order)", 10)
        .unwrap();
    assert_eq!(result.entry.fqn, "com.example.OrderService.create(Order)");
    assert_eq!(result.chain.len(), 1);
}

#[test]
fn unknown_entry_is_not_found() {
    let tracer = CallChainTracer::new(traced_store());
    assert!(matches!(
        tracer.trace_from_entry("GET /nope", 10),
        Err(AriadneError::NotFound { .. })
    ));
    assert!(matches!(
        tracer.trace_from_fqn("com.example.Missing", 10),
        Err(AriadneError::NotFound { .. })
    ));
}

#[test]
fn chain_is_enriched_with_deduplicated_dependencies() {
    let tracer = CallChainTracer::new(traced_store());

    let result = tracer
        .trace_from_fqn("com.example.OrderController.post(Order)", 10)
        .unwrap();

    assert_eq!(result.external_deps.len(), 1);
    assert_eq!(result.external_deps[0].dependency_type, DependencyType::Mysql);
    assert_eq!(
        result.external_deps[0].caller_fqn,
        "com.example.OrderService.create(Order)"
    );
}

#[test]
fn depth_zero_trace_is_empty() {
    let tracer = CallChainTracer::new(traced_store());
    let result = tracer
        .trace_from_fqn("com.example.OrderController.post(Order)", 0)
        .unwrap();
    assert!(result.chain.is_empty());
    assert_eq!(result.depth, 0);
}
