//! Rule engine: the controller-dao rule and the registry surface.

use std::sync::Arc;

use ariadne_analysis::AntiPatternDetector;
use ariadne_core::models::{Edge, Relation, Severity, Symbol, SymbolKind};
use ariadne_core::AriadneError;
use ariadne_storage::GraphStore;

fn store_with_caller(class_annotations: &[&str], class_name: &str) -> Arc<GraphStore> {
    let store = Arc::new(GraphStore::open_in_memory().unwrap());
    let class_fqn = format!("com.example.{class_name}");
    let method_fqn = format!("com.example.{class_name}.load(Long)");

    store
        .insert_symbols(&[
            Symbol::new(&class_fqn, SymbolKind::Class, class_name).with_annotations(
                class_annotations.iter().map(|s| s.to_string()).collect(),
            ),
            Symbol::new(&method_fqn, SymbolKind::Method, "load").with_parent(&class_fqn),
        ])
        .unwrap();
    store
        .insert_edges(&[Edge::new(
            method_fqn,
            "com.example.UserMapper.selectById(Long)",
            Relation::Calls,
        )])
        .unwrap();
    store
}

#[test]
fn controller_calling_mapper_is_flagged() {
    let store = store_with_caller(&["@RestController"], "UserController");
    let detector = AntiPatternDetector::new();

    let violations = detector.detect_all(&store).unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].rule_id, "controller-dao");
    assert_eq!(violations[0].severity, Severity::Error);
    assert_eq!(violations[0].from_fqn, "com.example.UserController.load(Long)");
    assert_eq!(
        violations[0].to_fqn.as_deref(),
        Some("com.example.UserMapper.selectById(Long)")
    );
}

#[test]
fn service_calling_mapper_is_allowed() {
    let store = store_with_caller(&["@Service"], "UserService");
    let detector = AntiPatternDetector::new();
    assert!(detector.detect_all(&store).unwrap().is_empty());
}

#[test]
fn controller_by_name_without_annotation_is_flagged() {
    let store = store_with_caller(&[], "OrderController");
    let detector = AntiPatternDetector::new();
    assert_eq!(detector.detect_all(&store).unwrap().len(), 1);
}

#[test]
fn base_mapper_calls_are_exempt() {
    let store = Arc::new(GraphStore::open_in_memory().unwrap());
    store
        .insert_symbols(&[
            Symbol::new("com.example.UserController", SymbolKind::Class, "UserController")
                .with_annotations(vec!["@RestController".into()]),
            Symbol::new(
                "com.example.UserController.load(Long)",
                SymbolKind::Method,
                "load",
            )
            .with_parent("com.example.UserController"),
        ])
        .unwrap();
    store
        .insert_edges(&[Edge::new(
            "com.example.UserController.load(Long)",
            "com.example.BaseMapper.selectById(Long)",
            Relation::Calls,
        )])
        .unwrap();

    let detector = AntiPatternDetector::new();
    assert!(detector.detect_all(&store).unwrap().is_empty());
}

#[test]
fn annotated_repository_class_is_flagged_regardless_of_name() {
    let store = Arc::new(GraphStore::open_in_memory().unwrap());
    store
        .insert_symbols(&[
            Symbol::new("com.example.UserController", SymbolKind::Class, "UserController")
                .with_annotations(vec!["@RestController".into()]),
            Symbol::new(
                "com.example.UserController.load(Long)",
                SymbolKind::Method,
                "load",
            )
            .with_parent("com.example.UserController"),
            // No DAO-ish suffix, but annotated @Repository.
            Symbol::new("com.example.UserStore", SymbolKind::Class, "UserStore")
                .with_annotations(vec!["@Repository".into()]),
        ])
        .unwrap();
    store
        .insert_edges(&[Edge::new(
            "com.example.UserController.load(Long)",
            "com.example.UserStore.fetch(Long)",
            Relation::Calls,
        )])
        .unwrap();

    let detector = AntiPatternDetector::new();
    assert_eq!(detector.detect_all(&store).unwrap().len(), 1);
}

#[test]
fn detect_by_rule_rejects_unknown_ids() {
    let store = GraphStore::open_in_memory().unwrap();
    let detector = AntiPatternDetector::new();

    let result = detector.detect_by_rule(&store, "no-such-rule");
    assert!(matches!(result, Err(AriadneError::InvalidArgument(_))));

    // The known rule id routes to the same detection.
    assert!(detector.detect_by_rule(&store, "controller-dao").unwrap().is_empty());
}

#[test]
fn list_rules_reports_registry() {
    let detector = AntiPatternDetector::new();
    let rules = detector.list_rules();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].rule_id, "controller-dao");
    assert_eq!(rules[0].severity, Severity::Error);
    assert!(!rules[0].description.is_empty());
}

#[test]
fn detections_persist_through_the_store() {
    let store = store_with_caller(&["@RestController"], "UserController");
    let detector = AntiPatternDetector::new();

    let violations = detector.detect_all(&store).unwrap();
    store.insert_anti_patterns(&violations).unwrap();

    let persisted = store
        .get_anti_patterns(Some("controller-dao"), Some(Severity::Error))
        .unwrap();
    assert_eq!(persisted.len(), 1);

    assert_eq!(store.clear_anti_patterns().unwrap(), 1);
    assert!(store.get_anti_patterns(None, None).unwrap().is_empty());
}
