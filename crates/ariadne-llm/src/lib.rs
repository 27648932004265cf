//! # ariadne-llm
//!
//! Clients for the two external model providers the knowledge graph
//! consumes: a `summarize(code, ctx) -> String` chat contract and an
//! `embed(text) -> vector` embedding contract, both over OpenAI-compatible
//! HTTP APIs (OpenAI, DeepSeek, Ollama). Transient failures retry with
//! bounded exponential backoff; per-call timeouts come from config.

pub mod client;
pub mod config;
pub mod cost;
pub mod embedder;
pub mod prompts;

pub use client::{LlmClient, SummaryContext, SummaryProvider};
pub use config::{LlmConfig, LlmProvider};
pub use cost::CostTracker;
pub use embedder::{Embedder, EmbeddingProvider};
