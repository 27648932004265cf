//! # ariadne-core
//!
//! Foundation crate for the Ariadne code knowledge graph service.
//! Defines the entity model, error taxonomy, configuration, layer
//! derivation, and the small pieces of shared in-process state
//! (rate limiter, metrics accumulator).
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod errors;
pub mod layer;
pub mod metrics;
pub mod models;
pub mod problem;
pub mod rate_limit;

pub use config::AriadneConfig;
pub use errors::{AriadneError, AriadneResult, StorageError};
pub use layer::Layer;
