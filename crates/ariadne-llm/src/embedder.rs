//! Embedding provider over the OpenAI-compatible embeddings API.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ariadne_core::{AriadneError, AriadneResult};

use crate::config::LlmConfig;

const MAX_RETRIES: u32 = 3;
const MIN_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const DEFAULT_DIMENSION: usize = 768;

/// Known embedding dimensions by model.
const EMBEDDING_DIMENSIONS: [(&str, usize); 6] = [
    ("text-embedding-3-small", 1536),
    ("text-embedding-3-large", 3072),
    ("text-embedding-ada-002", 1536),
    ("nomic-embed-text", 768),
    ("mxbai-embed-large", 1024),
    ("all-minilm", 384),
];

/// The `embed(text) -> vector` contract the core consumes.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> AriadneResult<Vec<f32>>;
    fn dimension(&self) -> usize;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

/// HTTP embedder for OpenAI, DeepSeek, and Ollama.
pub struct Embedder {
    config: LlmConfig,
    http: reqwest::blocking::Client,
}

impl Embedder {
    pub fn new(config: LlmConfig) -> AriadneResult<Self> {
        if !config.is_valid() {
            return Err(AriadneError::InvalidArgument(format!(
                "invalid embedder configuration: {}",
                config.validation_errors().join(", ")
            )));
        }
        let http = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AriadneError::Unavailable {
                service: "embedder",
                reason: e.to_string(),
            })?;

        debug!(model = %config.embedding_model, "Initialized embedder");
        Ok(Self { config, http })
    }

    fn embeddings_url(&self) -> String {
        format!(
            "{}/v1/embeddings",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn call_embedding_api(&self, texts: &[&str]) -> AriadneResult<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: texts.to_vec(),
        };

        let mut backoff = MIN_BACKOFF;
        let mut last_error = String::new();

        for attempt in 1..=MAX_RETRIES {
            let response = self
                .http
                .post(self.embeddings_url())
                .bearer_auth(&self.config.api_key)
                .json(&request)
                .send();

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: EmbeddingResponse =
                            resp.json().map_err(|e| AriadneError::Unavailable {
                                service: "embedder",
                                reason: format!("malformed embedding response: {e}"),
                            })?;
                        return Ok(parsed.data.into_iter().map(|i| i.embedding).collect());
                    }
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_error = format!("HTTP {status}");
                    } else {
                        return Err(AriadneError::Unavailable {
                            service: "embedder",
                            reason: format!("HTTP {status}"),
                        });
                    }
                }
                Err(e) => last_error = e.to_string(),
            }

            if attempt < MAX_RETRIES {
                warn!(attempt, error = %last_error, "Embedding call failed, backing off");
                std::thread::sleep(backoff);
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }

        Err(AriadneError::Transient {
            attempts: MAX_RETRIES,
            reason: last_error,
        })
    }

    /// Embed a batch, preserving input order. Empty texts get zero vectors
    /// without an API call.
    pub fn embed_texts(&self, texts: &[String], batch_size: usize) -> AriadneResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let dimension = self.dimension();
        let non_empty: Vec<(usize, &str)> = texts
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.trim().is_empty())
            .map(|(i, t)| (i, t.as_str()))
            .collect();

        let mut results: Vec<Vec<f32>> = vec![vec![0.0; dimension]; texts.len()];
        for chunk in non_empty.chunks(batch_size.max(1)) {
            let batch: Vec<&str> = chunk.iter().map(|(_, t)| *t).collect();
            let embeddings = self.call_embedding_api(&batch)?;
            for ((index, _), embedding) in chunk.iter().zip(embeddings) {
                results[*index] = embedding;
            }
        }
        Ok(results)
    }
}

impl EmbeddingProvider for Embedder {
    fn embed(&self, text: &str) -> AriadneResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimension()]);
        }
        let mut embeddings = self.call_embedding_api(&[text])?;
        embeddings.pop().ok_or_else(|| AriadneError::Unavailable {
            service: "embedder",
            reason: "empty embedding response".to_string(),
        })
    }

    fn dimension(&self) -> usize {
        dimension_for_model(&self.config.embedding_model)
    }
}

/// Known-model table lookup with substring fallback, defaulting to 768.
pub fn dimension_for_model(model: &str) -> usize {
    let model_lower = model.to_ascii_lowercase();
    for (known, dim) in EMBEDDING_DIMENSIONS {
        if model_lower == known || model_lower.contains(known) {
            return dim;
        }
    }
    DEFAULT_DIMENSION
}
