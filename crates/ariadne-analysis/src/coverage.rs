//! Caller-level test coverage analysis for a target symbol.

use std::sync::Arc;

use rusqlite::params;
use serde::Serialize;

use ariadne_core::{AriadneResult, StorageError};
use ariadne_storage::GraphStore;

use crate::test_mapper::is_test_file;

#[derive(Debug, Clone, Serialize)]
pub struct CallerCoverage {
    pub caller_fqn: String,
    pub caller_kind: String,
    pub caller_name: String,
    pub caller_file: String,
    pub is_test_file: bool,
    pub is_covered: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageWarning {
    pub warning_type: &'static str,
    pub severity: &'static str,
    pub message: String,
    pub caller_fqn: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    pub target_fqn: String,
    pub total_callers: usize,
    pub tested_callers: usize,
    pub coverage_percentage: f64,
    pub callers: Vec<CallerCoverage>,
    pub warnings: Vec<CoverageWarning>,
}

pub struct CoverageAnalyzer {
    store: Arc<GraphStore>,
}

impl CoverageAnalyzer {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    /// Analyze which direct callers of `target_fqn` come from test code.
    /// One join query; per-caller coverage is a path heuristic.
    pub fn analyze_coverage(&self, target_fqn: &str) -> AriadneResult<CoverageReport> {
        let rows: Vec<(String, String, String, Option<String>)> =
            self.store.with_reader(|conn| {
                let mut stmt = conn
                    .prepare_cached(
                        "SELECT DISTINCT e.from_fqn, s.kind, s.name, s.file_path
                         FROM edges e
                         JOIN symbols s ON e.from_fqn = s.fqn
                         WHERE e.to_fqn = ?1",
                    )
                    .map_err(StorageError::sqlite)?;
                let rows = stmt
                    .query_map(params![target_fqn], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                    })
                    .map_err(StorageError::sqlite)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row.map_err(StorageError::sqlite)?);
                }
                Ok(out)
            })?;

        let mut callers = Vec::with_capacity(rows.len());
        let mut warnings = Vec::new();
        let mut tested_callers = 0;

        for (caller_fqn, kind, name, file_path) in rows {
            let caller_file = file_path.unwrap_or_default();
            let from_test = is_test_file(&caller_file);

            if from_test {
                tested_callers += 1;
            } else {
                warnings.push(CoverageWarning {
                    warning_type: "untested_caller",
                    severity: "medium",
                    message: format!("{name} calls {target_fqn} but has no test coverage"),
                    caller_fqn: caller_fqn.clone(),
                });
            }

            callers.push(CallerCoverage {
                caller_fqn,
                caller_kind: kind,
                caller_name: name,
                caller_file,
                is_test_file: from_test,
                is_covered: from_test,
            });
        }

        let total_callers = callers.len();
        let coverage_percentage = if total_callers > 0 {
            (tested_callers as f64 / total_callers as f64 * 10_000.0).round() / 100.0
        } else {
            0.0
        };

        Ok(CoverageReport {
            target_fqn: target_fqn.to_string(),
            total_callers,
            tested_callers,
            coverage_percentage,
            callers,
            warnings,
        })
    }
}
