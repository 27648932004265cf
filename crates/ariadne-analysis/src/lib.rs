//! # ariadne-analysis
//!
//! The analysis layer over the graph store: ingestion from the bytecode
//! analysis service, dependency-driven incremental summarization, impact
//! analysis, call-chain tracing, the anti-pattern rule engine, test
//! mapping, semantic search, and rebuild orchestration.

pub mod call_chain;
pub mod constraints;
pub mod coverage;
pub mod dependency_tracker;
pub mod extractor;
pub mod glossary;
pub mod graph;
pub mod impact;
pub mod incremental;
pub mod rebuild;
pub mod rules;
pub mod search;
pub mod summarizer;
pub mod test_mapper;

pub use call_chain::CallChainTracer;
pub use dependency_tracker::{AffectedSymbols, DependencyTracker};
pub use impact::{ImpactAnalyzer, ImpactResult};
pub use incremental::{IncrementalCoordinator, IncrementalResult};
pub use rebuild::RebuildService;
pub use rules::AntiPatternDetector;
pub use summarizer::ParallelSummarizer;
pub use test_mapper::TestMapper;
