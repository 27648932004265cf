//! Pluggable anti-pattern rule engine.
//!
//! Each rule declares its identity and severity and implements `detect`
//! over the graph store; the engine iterates a registry. Dynamic dispatch,
//! no reflection.

pub mod controller_dao;

use ariadne_core::models::{AntiPattern, Severity};
use ariadne_core::{AriadneError, AriadneResult};
use ariadne_storage::GraphStore;

pub use controller_dao::ControllerDaoRule;

/// An anti-pattern detection rule.
pub trait AntiPatternRule: Send + Sync {
    fn rule_id(&self) -> &'static str;
    fn severity(&self) -> Severity;
    fn description(&self) -> &'static str;
    fn detect(&self, store: &GraphStore) -> AriadneResult<Vec<AntiPattern>>;
}

/// Rule metadata for listings.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RuleInfo {
    pub rule_id: &'static str,
    pub severity: Severity,
    pub description: &'static str,
}

/// Runs all registered rules over the store.
pub struct AntiPatternDetector {
    rules: Vec<Box<dyn AntiPatternRule>>,
}

impl AntiPatternDetector {
    /// Registry with the built-in rule set.
    pub fn new() -> Self {
        Self {
            rules: vec![Box::new(ControllerDaoRule)],
        }
    }

    /// Registry with a caller-supplied rule set.
    pub fn with_rules(rules: Vec<Box<dyn AntiPatternRule>>) -> Self {
        Self { rules }
    }

    /// Run every rule, concatenating detections.
    pub fn detect_all(&self, store: &GraphStore) -> AriadneResult<Vec<AntiPattern>> {
        let mut results = Vec::new();
        for rule in &self.rules {
            results.extend(rule.detect(store)?);
        }
        Ok(results)
    }

    /// Run one rule by id. Unknown ids are a fatal argument error.
    pub fn detect_by_rule(
        &self,
        store: &GraphStore,
        rule_id: &str,
    ) -> AriadneResult<Vec<AntiPattern>> {
        for rule in &self.rules {
            if rule.rule_id() == rule_id {
                return rule.detect(store);
            }
        }
        Err(AriadneError::InvalidArgument(format!(
            "unknown rule: {rule_id}"
        )))
    }

    /// Metadata of every registered rule.
    pub fn list_rules(&self) -> Vec<RuleInfo> {
        self.rules
            .iter()
            .map(|rule| RuleInfo {
                rule_id: rule.rule_id(),
                severity: rule.severity(),
                description: rule.description(),
            })
            .collect()
    }
}

impl Default for AntiPatternDetector {
    fn default() -> Self {
        Self::new()
    }
}
