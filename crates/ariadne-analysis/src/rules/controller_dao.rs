//! Controller-to-DAO rule: controllers must reach the data layer through a
//! service, never call a Mapper/Dao/Repository directly.

use ariadne_core::models::{AntiPattern, Relation, Severity, SymbolKind, SymbolRecord};
use ariadne_core::AriadneResult;
use ariadne_storage::GraphStore;

use super::AntiPatternRule;

pub struct ControllerDaoRule;

impl AntiPatternRule for ControllerDaoRule {
    fn rule_id(&self) -> &'static str {
        "controller-dao"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn description(&self) -> &'static str {
        "Controllers must not call DAO/Mapper classes directly; route data access through the service layer"
    }

    fn detect(&self, store: &GraphStore) -> AriadneResult<Vec<AntiPattern>> {
        let mut results = Vec::new();

        let controllers: Vec<SymbolRecord> = store
            .get_symbols_by_kind(SymbolKind::Class)?
            .into_iter()
            .filter(is_controller)
            .collect();

        for controller in controllers {
            let methods = store.get_symbols_by_parent(&controller.symbol.fqn)?;
            for method in methods {
                if method.symbol.kind != SymbolKind::Method {
                    continue;
                }

                let calls = store.get_edges_from(&method.symbol.fqn, Some(Relation::Calls))?;
                for call in calls {
                    if is_dao_call(&call.to_fqn, store)? {
                        results.push(AntiPattern {
                            rule_id: self.rule_id().to_string(),
                            from_fqn: method.symbol.fqn.clone(),
                            to_fqn: Some(call.to_fqn),
                            severity: self.severity(),
                            message: self.description().to_string(),
                        });
                    }
                }
            }
        }

        Ok(results)
    }
}

fn is_controller(record: &SymbolRecord) -> bool {
    let annotated = record
        .symbol
        .annotations
        .iter()
        .any(|a| a.contains("RestController") || a.contains("Controller"));
    annotated || record.symbol.name.contains("Controller")
}

/// Does `fqn` resolve to a call on a DAO-layer class?
///
/// Name check first (Mapper/Dao/Repository suffix, `Base` prefix exempted
/// for framework bases), then the resolved class's annotations.
fn is_dao_call(fqn: &str, store: &GraphStore) -> AriadneResult<bool> {
    if fqn.is_empty() {
        return Ok(false);
    }

    // Drop any parameter list, then split off the method segment.
    let without_params = fqn.split('(').next().unwrap_or(fqn);
    let Some((class_fqn, _method)) = without_params.rsplit_once('.') else {
        return Ok(false);
    };
    let class_name = class_fqn.rsplit('.').next().unwrap_or(class_fqn);

    if class_name.ends_with("Mapper")
        || class_name.ends_with("Dao")
        || class_name.ends_with("Repository")
    {
        return Ok(!class_name.starts_with("Base"));
    }

    if let Some(class_record) = store.get_symbol(class_fqn)? {
        let annotated = class_record
            .symbol
            .annotations
            .iter()
            .any(|a| a.contains("Repository") || a.contains("Mapper"));
        if annotated {
            return Ok(true);
        }
    }

    Ok(false)
}
