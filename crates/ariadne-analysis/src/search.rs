//! Knowledge search: vector similarity over summaries, glossary, and
//! constraints, with substring fallback when no embedder is available.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use ariadne_core::AriadneResult;
use ariadne_llm::EmbeddingProvider;
use ariadne_storage::{Collection, GraphStore, VectorStore};

/// One ranked search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub collection: &'static str,
    pub id: String,
    pub title: String,
    pub text: String,
    /// Cosine distance for vector hits; None for substring-fallback hits.
    pub distance: Option<f32>,
}

pub struct SearchService {
    store: Arc<GraphStore>,
}

impl SearchService {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    /// Ranked semantic search across the three collections, hydrated from
    /// SQL by id. Falls back to substring search when the embedder is
    /// absent or fails.
    pub fn search(
        &self,
        query: &str,
        num_results: usize,
        embedder: Option<&dyn EmbeddingProvider>,
        vector_store: Option<&VectorStore>,
    ) -> AriadneResult<Vec<SearchHit>> {
        if let (Some(embedder), Some(vector_store)) = (embedder, vector_store) {
            match embedder.embed(query) {
                Ok(embedding) => {
                    return self.vector_search(&embedding, num_results, vector_store);
                }
                Err(e) => {
                    warn!(error = %e, "Embedding failed, falling back to substring search");
                }
            }
        }
        self.substring_search(query, num_results)
    }

    fn vector_search(
        &self,
        embedding: &[f32],
        num_results: usize,
        vector_store: &VectorStore,
    ) -> AriadneResult<Vec<SearchHit>> {
        let mut hits = Vec::new();

        for collection in Collection::ALL {
            for m in vector_store.search(collection, embedding, num_results, None)? {
                let hit = match collection {
                    Collection::Summaries => SearchHit {
                        collection: collection.as_str(),
                        title: m
                            .metadata
                            .as_ref()
                            .and_then(|meta| meta.get("fqn"))
                            .and_then(|f| f.as_str())
                            .unwrap_or(&m.id)
                            .to_string(),
                        id: m.id,
                        text: m.document,
                        distance: Some(m.distance),
                    },
                    Collection::Glossary => {
                        let record = m
                            .id
                            .parse::<i64>()
                            .ok()
                            .and_then(|id| self.store.get_glossary_by_id(id).ok().flatten());
                        match record {
                            Some(record) => SearchHit {
                                collection: collection.as_str(),
                                id: m.id,
                                title: record.entry.code_term,
                                text: record.entry.business_meaning,
                                distance: Some(m.distance),
                            },
                            None => {
                                debug!(id = %m.id, "Glossary hit with no SQL row");
                                continue;
                            }
                        }
                    }
                    Collection::Constraints => {
                        let record = m
                            .id
                            .parse::<i64>()
                            .ok()
                            .and_then(|id| self.store.get_constraint_by_id(id).ok().flatten());
                        match record {
                            Some(record) => SearchHit {
                                collection: collection.as_str(),
                                id: m.id,
                                title: record.entry.name,
                                text: record.entry.description,
                                distance: Some(m.distance),
                            },
                            None => {
                                debug!(id = %m.id, "Constraint hit with no SQL row");
                                continue;
                            }
                        }
                    }
                };
                hits.push(hit);
            }
        }

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(num_results);
        Ok(hits)
    }

    /// LIKE-based fallback over symbols, glossary, and constraints.
    fn substring_search(&self, query: &str, num_results: usize) -> AriadneResult<Vec<SearchHit>> {
        let mut hits = Vec::new();

        for record in self.store.search_symbols(query, None)? {
            hits.push(SearchHit {
                collection: "symbols",
                id: record.symbol.fqn.clone(),
                title: record.symbol.name.clone(),
                text: record.symbol.fqn,
                distance: None,
            });
        }
        for record in self.store.search_glossary(query)? {
            hits.push(SearchHit {
                collection: "glossary",
                id: record.id.to_string(),
                title: record.entry.code_term,
                text: record.entry.business_meaning,
                distance: None,
            });
        }
        for record in self.store.search_constraints(query)? {
            hits.push(SearchHit {
                collection: "constraints",
                id: record.id.to_string(),
                title: record.entry.name,
                text: record.entry.description,
                distance: None,
            });
        }

        hits.truncate(num_results);
        Ok(hits)
    }
}
