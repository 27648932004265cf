//! Impact analyzer: reverse traversal with layers, entry-point mapping,
//! and risk banding over a small layered graph.

use std::sync::Arc;

use ariadne_analysis::impact::RiskLevel;
use ariadne_analysis::ImpactAnalyzer;
use ariadne_core::models::{
    Edge, EntryPoint, EntryType, Relation, Symbol, SymbolKind,
};
use ariadne_core::AriadneError;
use ariadne_storage::GraphStore;

/// controller.post -> service.create -> repo.insert, with an HTTP entry
/// point on the controller method.
fn layered_store() -> Arc<GraphStore> {
    let store = Arc::new(GraphStore::open_in_memory().unwrap());

    store
        .insert_symbols(&[
            Symbol::new("com.example.OrderController", SymbolKind::Class, "OrderController")
                .with_annotations(vec!["@RestController".into()]),
            Symbol::new(
                "com.example.OrderController.post(Order)",
                SymbolKind::Method,
                "post",
            )
            .with_parent("com.example.OrderController")
            .with_annotations(vec!["@PostMapping".into()]),
            Symbol::new("com.example.OrderService", SymbolKind::Class, "OrderService")
                .with_annotations(vec!["@Service".into()]),
            Symbol::new(
                "com.example.OrderService.create(Order)",
                SymbolKind::Method,
                "create",
            )
            .with_parent("com.example.OrderService"),
            Symbol::new(
                "com.example.OrderRepository.insert(Order)",
                SymbolKind::Method,
                "insert",
            ),
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
                "com.example.OrderRepository.insert(Order)",
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
}

#[test]
fn callers_carry_depth_and_layer() {
    let analyzer = ImpactAnalyzer::new(layered_store());

    let result = analyzer
        .analyze_impact("com.example.OrderRepository.insert(Order)", 5, false)
        .unwrap();

    assert_eq!(result.affected_callers.len(), 2);

    let service = result
        .affected_callers
        .iter()
        .find(|c| c.fqn == "com.example.OrderService.create(Order)")
        .unwrap();
    assert_eq!(service.depth, 0);

    let controller = result
        .affected_callers
        .iter()
        .find(|c| c.fqn == "com.example.OrderController.post(Order)")
        .unwrap();
    assert_eq!(controller.depth, 1);
}

#[test]
fn entry_points_are_mapped_from_callers() {
    let analyzer = ImpactAnalyzer::new(layered_store());

    let result = analyzer
        .analyze_impact("com.example.OrderRepository.insert(Order)", 5, false)
        .unwrap();

    assert_eq!(result.affected_entry_points.len(), 1);
    let entry = &result.affected_entry_points[0];
    assert_eq!(entry.symbol_fqn, "com.example.OrderController.post(Order)");
    assert_eq!(entry.http_method.as_deref(), Some("POST"));
    assert_eq!(entry.http_path.as_deref(), Some("/api/orders"));
}

#[test]
fn entry_point_proximity_raises_risk() {
    let analyzer = ImpactAnalyzer::new(layered_store());

    // Two callers, one entry point, no coverage info: 0 + 30 + 0 = 30.
    let with_entry = analyzer
        .analyze_impact("com.example.OrderRepository.insert(Order)", 5, false)
        .unwrap();
    assert_eq!(with_entry.risk_level, RiskLevel::Medium);

    // The leaf of the chain has no callers at all: LOW.
    let store = layered_store();
    let analyzer = ImpactAnalyzer::new(Arc::clone(&store));
    let no_callers = analyzer
        .analyze_impact("com.example.OrderController.post(Order)", 5, false)
        .unwrap();
    assert!(no_callers.affected_callers.is_empty());
    assert_eq!(no_callers.risk_level, RiskLevel::Low);
}

#[test]
fn missing_coverage_contributes_when_tests_requested() {
    let analyzer = ImpactAnalyzer::new(layered_store());

    let result = analyzer
        .analyze_impact("com.example.OrderRepository.insert(Order)", 5, true)
        .unwrap();

    // No test files exist on disk, so every caller lacks coverage:
    // 0 (callers) + 30 (entry) + 10 (1-2 uncovered) = 40 -> MEDIUM.
    assert_eq!(result.missing_test_coverage.len(), 2);
    assert_eq!(result.risk_level, RiskLevel::Medium);
    assert!(result.related_tests.is_empty());
}

#[test]
fn confidence_grows_with_callers() {
    let analyzer = ImpactAnalyzer::new(layered_store());

    let result = analyzer
        .analyze_impact("com.example.OrderRepository.insert(Order)", 5, false)
        .unwrap();
    // 0.5 + 2 * 0.05 = 0.6
    assert!((result.confidence - 0.6).abs() < 1e-9);
}

#[test]
fn unknown_target_is_not_found() {
    let analyzer = ImpactAnalyzer::new(layered_store());
    let result = analyzer.analyze_impact("com.example.Missing", 5, false);
    assert!(matches!(result, Err(AriadneError::NotFound { .. })));
}

#[test]
fn depth_bounds_the_traversal() {
    let analyzer = ImpactAnalyzer::new(layered_store());

    let shallow = analyzer
        .analyze_impact("com.example.OrderRepository.insert(Order)", 0, false)
        .unwrap();
    assert!(shallow.affected_callers.is_empty());
}
