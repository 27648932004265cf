//! Service configuration from environment variables.

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Top-level service configuration.
///
/// All values come from `ARIADNE_*` environment variables with sensible
/// defaults; the LLM-provider sub-config lives in the `ariadne-llm` crate.
#[derive(Debug, Clone)]
pub struct AriadneConfig {
    /// Path of the graph database file.
    pub db_path: PathBuf,
    /// Directory of the companion vector store.
    pub vector_path: PathBuf,
    /// Root of the project being indexed.
    pub project_root: PathBuf,
    /// URL of the bytecode analysis service.
    pub asm_service_url: String,
    /// Whether the in-memory rate limiter is active.
    pub rate_limit_enabled: bool,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for AriadneConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("ariadne.db"),
            vector_path: PathBuf::from("ariadne_vectors"),
            project_root: PathBuf::from("."),
            asm_service_url: "http://localhost:8766".to_string(),
            rate_limit_enabled: false,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl AriadneConfig {
    /// Build configuration from `ARIADNE_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            db_path: env_path("ARIADNE_DB_PATH", defaults.db_path),
            vector_path: env_path("ARIADNE_VECTOR_PATH", defaults.vector_path),
            project_root: env_path("ARIADNE_PROJECT_ROOT", defaults.project_root),
            asm_service_url: env_string("ARIADNE_ASM_SERVICE_URL", defaults.asm_service_url),
            rate_limit_enabled: env_bool("ARIADNE_RATE_LIMIT_ENABLED", false),
            log_level: env_string("ARIADNE_LOG_LEVEL", defaults.log_level),
            log_format: LogFormat::parse(&env_string("ARIADNE_LOG_FORMAT", "text".into())),
        }
    }
}

fn env_string(key: &str, default: String) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Install the global tracing subscriber according to config.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(config: &AriadneConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let result = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init(),
    };
    // Already-set subscriber is fine (tests, embedded use).
    let _ = result;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AriadneConfig::default();
        assert_eq!(config.db_path, PathBuf::from("ariadne.db"));
        assert_eq!(config.vector_path, PathBuf::from("ariadne_vectors"));
        assert_eq!(config.asm_service_url, "http://localhost:8766");
        assert!(!config.rate_limit_enabled);
    }

    #[test]
    fn log_format_parses() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("text"), LogFormat::Text);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Text);
    }
}
