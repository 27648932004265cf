//! Forward call-chain tracing from an entry point or a raw FQN, with layer
//! annotation and external-dependency enrichment.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use ariadne_core::layer::{determine_layer, layer_from_name, Layer};
use ariadne_core::models::{EntryType, ExternalDependency};
use ariadne_core::{AriadneError, AriadneResult};
use ariadne_storage::GraphStore;

/// One annotated hop of the chain.
#[derive(Debug, Clone, Serialize)]
pub struct ChainHop {
    pub depth: i64,
    pub from_fqn: String,
    pub to_fqn: String,
    pub relation: String,
    pub layer: &'static str,
}

/// The resolved entry the trace started from.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedEntry {
    pub fqn: String,
    pub entry_type: Option<String>,
    pub http_method: Option<String>,
    pub http_path: Option<String>,
}

/// Full trace result.
#[derive(Debug, Clone, Serialize)]
pub struct CallChainResult {
    pub entry: ResolvedEntry,
    pub chain: Vec<ChainHop>,
    pub external_deps: Vec<ExternalDependency>,
    pub depth: i64,
}

pub struct CallChainTracer {
    store: Arc<GraphStore>,
}

impl CallChainTracer {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    /// Trace from an entry descriptor: `"POST /api/orders"` (HTTP method +
    /// path, prefix fallback) or a symbol FQN.
    pub fn trace_from_entry(
        &self,
        entry_pattern: &str,
        max_depth: i64,
    ) -> AriadneResult<CallChainResult> {
        let entry = self
            .resolve_entry(entry_pattern)?
            .ok_or_else(|| AriadneError::NotFound {
                kind: "entry",
                id: entry_pattern.to_string(),
            })?;

        self.trace(entry, max_depth)
    }

    /// Trace directly from a FQN (no entry-point table lookup).
    pub fn trace_from_fqn(&self, fqn: &str, max_depth: i64) -> AriadneResult<CallChainResult> {
        if self.store.get_symbol(fqn)?.is_none() {
            return Err(AriadneError::NotFound {
                kind: "symbol",
                id: fqn.to_string(),
            });
        }
        self.trace(
            ResolvedEntry {
                fqn: fqn.to_string(),
                entry_type: None,
                http_method: None,
                http_path: None,
            },
            max_depth,
        )
    }

    fn trace(&self, entry: ResolvedEntry, max_depth: i64) -> AriadneResult<CallChainResult> {
        let rows = self.store.get_call_chain(&entry.fqn, max_depth)?;

        let chain: Vec<ChainHop> = rows
            .iter()
            .map(|row| ChainHop {
                depth: row.depth,
                from_fqn: row.from_fqn.clone(),
                to_fqn: row.to_fqn.clone(),
                relation: row.relation.clone(),
                layer: self.detect_layer(&row.to_fqn).as_str(),
            })
            .collect();

        let external_deps = self.extract_dependencies(&chain)?;
        let depth = chain.iter().map(|hop| hop.depth).max().unwrap_or(0);

        Ok(CallChainResult {
            entry,
            chain,
            external_deps,
            depth,
        })
    }

    fn resolve_entry(&self, pattern: &str) -> AriadneResult<Option<ResolvedEntry>> {
        // HTTP descriptor: "METHOD /path".
        const HTTP_METHODS: [&str; 7] =
            ["GET ", "POST ", "PUT ", "DELETE ", "PATCH ", "HEAD ", "OPTIONS "];
        if HTTP_METHODS.iter().any(|m| pattern.starts_with(m)) {
            let Some((method, path)) = pattern.split_once(' ') else {
                return Ok(None);
            };
            let entries = self.store.get_entry_points(Some(EntryType::HttpApi))?;

            // Exact match first.
            for entry in &entries {
                if entry.http_method.as_deref() == Some(method)
                    && entry.http_path.as_deref() == Some(path)
                {
                    return Ok(Some(resolved_from_entry(entry)));
                }
            }
            // Then path-prefix match (path parameters).
            for entry in &entries {
                let Some(base) = entry.http_path.as_deref() else {
                    continue;
                };
                if entry.http_method.as_deref() == Some(method)
                    && path.starts_with(base.trim_end_matches('/'))
                {
                    return Ok(Some(resolved_from_entry(entry)));
                }
            }
            return Ok(None);
        }

        // FQN descriptor: a known symbol wins.
        if self.store.get_symbol(pattern)?.is_some() {
            return Ok(Some(ResolvedEntry {
                fqn: pattern.to_string(),
                entry_type: None,
                http_method: None,
                http_path: None,
            }));
        }

        // Fall back to the entry-point table keyed by FQN.
        let entries = self.store.get_entry_points(None)?;
        Ok(entries
            .iter()
            .find(|e| e.symbol_fqn == pattern)
            .map(resolved_from_entry))
    }

    /// Annotation-based derivation for resolvable symbols, name heuristics
    /// for external FQNs.
    fn detect_layer(&self, fqn: &str) -> Layer {
        match self.store.get_symbol(fqn) {
            Ok(Some(record)) => {
                let layer = determine_layer(&record.symbol);
                if layer == Layer::Domain || layer == Layer::Unknown {
                    // Unannotated symbols: try name heuristics before
                    // settling for the default.
                    let by_name = layer_from_name(fqn);
                    if by_name != Layer::Unknown {
                        return by_name;
                    }
                }
                layer
            }
            _ => layer_from_name(fqn),
        }
    }

    /// External dependencies of every method in the chain, deduplicated by
    /// target.
    fn extract_dependencies(
        &self,
        chain: &[ChainHop],
    ) -> AriadneResult<Vec<ExternalDependency>> {
        let mut method_fqns: HashSet<&str> = HashSet::new();
        for hop in chain {
            method_fqns.insert(hop.from_fqn.as_str());
            method_fqns.insert(hop.to_fqn.as_str());
        }

        let mut seen_targets: HashSet<String> = HashSet::new();
        let mut deps = Vec::new();
        for fqn in method_fqns {
            for dep in self.store.get_external_dependencies(Some(fqn), None)? {
                if seen_targets.insert(dep.target.clone()) {
                    deps.push(dep);
                }
            }
        }
        Ok(deps)
    }
}

fn resolved_from_entry(entry: &ariadne_core::models::EntryPoint) -> ResolvedEntry {
    ResolvedEntry {
        fqn: entry.symbol_fqn.clone(),
        entry_type: Some(entry.entry_type.as_str().to_string()),
        http_method: entry.http_method.clone(),
        http_path: entry.http_path.clone(),
    }
}
