//! Impact analysis: depth-bounded reverse traversal, entry-point mapping,
//! test coverage, and risk scoring for a proposed change.

use std::collections::HashSet;
use std::sync::Arc;

use rusqlite::params;
use serde::Serialize;

use ariadne_core::layer::{determine_layer, Layer};
use ariadne_core::models::EntryPoint;
use ariadne_core::{AriadneError, AriadneResult, StorageError};
use ariadne_storage::GraphStore;

use crate::test_mapper::{TestMapper, TestMapping};

/// One caller reached by the reverse traversal.
#[derive(Debug, Clone, Serialize)]
pub struct AffectedCaller {
    pub fqn: String,
    pub kind: String,
    pub name: String,
    pub depth: i64,
    pub layer: &'static str,
}

/// Risk classification for a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

/// Full impact analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactResult {
    pub target_fqn: String,
    pub affected_callers: Vec<AffectedCaller>,
    pub affected_entry_points: Vec<EntryPoint>,
    pub related_tests: Vec<TestMapping>,
    pub missing_test_coverage: Vec<AffectedCaller>,
    pub risk_level: RiskLevel,
    pub confidence: f64,
}

pub struct ImpactAnalyzer {
    store: Arc<GraphStore>,
    test_mapper: TestMapper,
}

impl ImpactAnalyzer {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self {
            test_mapper: TestMapper::new(Arc::clone(&store)),
            store,
        }
    }

    /// Analyze the impact of changing `target_fqn`.
    pub fn analyze_impact(
        &self,
        target_fqn: &str,
        depth: i64,
        include_tests: bool,
    ) -> AriadneResult<ImpactResult> {
        if self.store.get_symbol(target_fqn)?.is_none() {
            return Err(AriadneError::NotFound {
                kind: "symbol",
                id: target_fqn.to_string(),
            });
        }

        let callers = self.find_callers(target_fqn, depth)?;

        let caller_fqns: Vec<String> = callers.iter().map(|c| c.fqn.clone()).collect();
        let entry_points = self.store.get_entry_points_for_fqns(&caller_fqns)?;

        let (tests, missing_coverage) = if include_tests {
            let tests = self.find_related_tests(&callers)?;
            let missing = detect_missing_coverage(&callers, &tests);
            (tests, missing)
        } else {
            (Vec::new(), Vec::new())
        };

        let risk_level = calculate_risk(callers.len(), entry_points.len(), missing_coverage.len());
        let confidence = calculate_confidence(callers.len(), tests.len());

        Ok(ImpactResult {
            target_fqn: target_fqn.to_string(),
            affected_callers: callers,
            affected_entry_points: entry_points,
            related_tests: tests,
            missing_test_coverage: missing_coverage,
            risk_level,
            confidence,
        })
    }

    /// Depth-bounded reverse traversal joined to symbols so each caller
    /// carries kind, name, and derived layer.
    fn find_callers(&self, target_fqn: &str, max_depth: i64) -> AriadneResult<Vec<AffectedCaller>> {
        if max_depth <= 0 {
            return Ok(Vec::new());
        }

        let rows: Vec<(i64, String, String, String)> = self
            .store
            .with_reader(|conn| {
                let mut stmt = conn
                    .prepare_cached(
                        "
                        WITH RECURSIVE callers(depth, from_fqn, to_fqn, from_kind, from_name) AS (
                            SELECT 0, e.from_fqn, e.to_fqn, s.kind, s.name
                            FROM edges e
                            JOIN symbols s ON e.from_fqn = s.fqn
                            WHERE e.to_fqn = ?1 AND e.relation = 'calls'

                            UNION

                            SELECT c.depth + 1, e.from_fqn, e.to_fqn, s.kind, s.name
                            FROM edges e
                            JOIN callers c ON e.to_fqn = c.from_fqn
                            JOIN symbols s ON e.from_fqn = s.fqn
                            WHERE c.depth < ?2 AND e.relation = 'calls'
                        )
                        SELECT DISTINCT depth, from_fqn, from_kind, from_name
                        FROM callers ORDER BY depth
                        ",
                    )
                    .map_err(StorageError::sqlite)?;
                let rows = stmt
                    .query_map(params![target_fqn, max_depth], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                    })
                    .map_err(StorageError::sqlite)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row.map_err(StorageError::sqlite)?);
                }
                Ok(out)
            })?;

        // Deduplicate over caller FQN, keeping the shallowest depth (rows
        // arrive depth-ordered).
        let mut seen = HashSet::new();
        let mut callers = Vec::new();
        for (depth, fqn, kind, name) in rows {
            if !seen.insert(fqn.clone()) {
                continue;
            }
            let layer = self
                .store
                .get_symbol(&fqn)?
                .map(|record| determine_layer(&record.symbol))
                .unwrap_or(Layer::Unknown);
            callers.push(AffectedCaller {
                fqn,
                kind,
                name,
                depth,
                layer: layer.as_str(),
            });
        }
        Ok(callers)
    }

    fn find_related_tests(&self, callers: &[AffectedCaller]) -> AriadneResult<Vec<TestMapping>> {
        let mut tests = Vec::new();
        for caller in callers {
            if let Some(mapping) = self.test_mapper.find_tests_for_symbol(&caller.fqn)? {
                tests.push(mapping);
            }
        }
        Ok(tests)
    }
}

fn detect_missing_coverage(
    callers: &[AffectedCaller],
    tests: &[TestMapping],
) -> Vec<AffectedCaller> {
    let covered: HashSet<&str> = tests
        .iter()
        .flat_map(|t| t.covers.iter().map(String::as_str))
        .collect();
    callers
        .iter()
        .filter(|c| !covered.contains(c.fqn.as_str()))
        .cloned()
        .collect()
}

/// Banded risk score from three bounded components; the sum maps onto the
/// level thresholds.
fn calculate_risk(
    caller_count: usize,
    entry_point_count: usize,
    missing_coverage_count: usize,
) -> RiskLevel {
    let mut score = 0u32;

    // Caller-count band (0-30 pts).
    if caller_count > 20 {
        score += 30;
    } else if caller_count > 10 {
        score += 20;
    } else if caller_count > 5 {
        score += 10;
    }

    // Entry-point proximity (0-50 pts).
    if entry_point_count > 5 {
        score += 50;
    } else if entry_point_count > 2 {
        score += 40;
    } else if entry_point_count > 0 {
        score += 30;
    }

    // Missing-coverage band (0-20 pts).
    if missing_coverage_count > 5 {
        score += 20;
    } else if missing_coverage_count > 2 {
        score += 15;
    } else if missing_coverage_count > 0 {
        score += 10;
    }

    if score >= 70 {
        RiskLevel::Critical
    } else if score >= 50 {
        RiskLevel::High
    } else if score >= 30 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// `0.5 + min(0.05 × callers, 0.3) + min(0.1 × tests, 0.2)`, clamped to 1.
fn calculate_confidence(caller_count: usize, test_count: usize) -> f64 {
    let caller_bonus = (caller_count as f64 * 0.05).min(0.3);
    let test_bonus = (test_count as f64 * 0.1).min(0.2);
    (0.5 + caller_bonus + test_bonus).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_bands() {
        assert_eq!(calculate_risk(0, 0, 0), RiskLevel::Low);
        assert_eq!(calculate_risk(6, 0, 0), RiskLevel::Low);
        assert_eq!(calculate_risk(0, 1, 0), RiskLevel::Medium);
        assert_eq!(calculate_risk(11, 1, 0), RiskLevel::High);
        assert_eq!(calculate_risk(21, 6, 6), RiskLevel::Critical);
        assert_eq!(calculate_risk(21, 3, 3), RiskLevel::Critical);
    }

    #[test]
    fn confidence_bounds() {
        assert_eq!(calculate_confidence(0, 0), 0.5);
        assert!((calculate_confidence(2, 1) - 0.7).abs() < 1e-9);
        // Both bonuses cap out.
        assert_eq!(calculate_confidence(100, 100), 1.0);
    }
}
