//! Bounded graph neighborhood queries for the graph/query surface.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use ariadne_core::models::{Relation, SymbolRecord};
use ariadne_core::{AriadneError, AriadneResult};
use ariadne_storage::{Direction, GraphStore};

/// A node of the result graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub fqn: String,
    pub kind: String,
    pub name: String,
    pub depth: i64,
}

/// An edge of the result graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub from_fqn: String,
    pub to_fqn: String,
    pub relation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphMetadata {
    pub max_depth: i64,
    pub total_nodes: usize,
    pub total_edges: usize,
    pub truncated: bool,
    pub query_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphQueryResult {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub metadata: GraphMetadata,
}

pub struct GraphQueryService {
    store: Arc<GraphStore>,
}

impl GraphQueryService {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    /// Breadth-first neighborhood of `start`, bounded by `depth` and
    /// `max_results` nodes; `truncated` reports whether the node cap cut
    /// the expansion short.
    pub fn query(
        &self,
        start: &str,
        relation: Option<Relation>,
        direction: Direction,
        depth: i64,
        max_results: usize,
    ) -> AriadneResult<GraphQueryResult> {
        let started = Instant::now();

        let Some(start_record) = self.store.get_symbol(start)? else {
            return Err(AriadneError::NotFound {
                kind: "symbol",
                id: start.to_string(),
            });
        };

        let mut nodes: Vec<GraphNode> = vec![node_from(&start_record, 0)];
        let mut edges: Vec<GraphEdge> = Vec::new();
        let mut visited: HashSet<String> = HashSet::from([start.to_string()]);
        let mut seen_edges: HashSet<(String, String, String)> = HashSet::new();
        let mut queue: VecDeque<(String, i64)> = VecDeque::from([(start.to_string(), 0)]);
        let mut truncated = false;

        'expansion: while let Some((fqn, current_depth)) = queue.pop_front() {
            if current_depth >= depth {
                continue;
            }

            if matches!(direction, Direction::Outgoing | Direction::Both) {
                for edge in self.store.get_edges_from(&fqn, relation)? {
                    if seen_edges.insert((
                        edge.from_fqn.clone(),
                        edge.to_fqn.clone(),
                        edge.relation.clone(),
                    )) {
                        edges.push(GraphEdge {
                            from_fqn: edge.from_fqn,
                            to_fqn: edge.to_fqn.clone(),
                            relation: edge.relation,
                        });
                    }
                    if visited.insert(edge.to_fqn.clone()) {
                        if nodes.len() >= max_results {
                            truncated = true;
                            break 'expansion;
                        }
                        if let Some(record) = self.store.get_symbol(&edge.to_fqn)? {
                            nodes.push(node_from(&record, current_depth + 1));
                            queue.push_back((edge.to_fqn, current_depth + 1));
                        }
                    }
                }
            }

            if matches!(direction, Direction::Incoming | Direction::Both) {
                for edge in self.store.get_edges_to(&fqn, relation)? {
                    if seen_edges.insert((
                        edge.from_fqn.clone(),
                        edge.to_fqn.clone(),
                        edge.relation.clone(),
                    )) {
                        edges.push(GraphEdge {
                            from_fqn: edge.from_fqn.clone(),
                            to_fqn: edge.to_fqn,
                            relation: edge.relation,
                        });
                    }
                    if visited.insert(edge.from_fqn.clone()) {
                        if nodes.len() >= max_results {
                            truncated = true;
                            break 'expansion;
                        }
                        if let Some(record) = self.store.get_symbol(&edge.from_fqn)? {
                            nodes.push(node_from(&record, current_depth + 1));
                            queue.push_back((edge.from_fqn, current_depth + 1));
                        }
                    }
                }
            }
        }

        let metadata = GraphMetadata {
            max_depth: depth,
            total_nodes: nodes.len(),
            total_edges: edges.len(),
            truncated,
            query_time_ms: started.elapsed().as_millis() as u64,
        };

        Ok(GraphQueryResult {
            nodes,
            edges,
            metadata,
        })
    }
}

fn node_from(record: &SymbolRecord, depth: i64) -> GraphNode {
    GraphNode {
        fqn: record.symbol.fqn.clone(),
        kind: record.symbol.kind.as_str().to_string(),
        name: record.symbol.name.clone(),
        depth,
    }
}
