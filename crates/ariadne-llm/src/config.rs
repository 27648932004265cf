//! LLM provider configuration from `ARIADNE_*` environment variables.

use std::time::Duration;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_DEEPSEEK_MODEL: &str = "deepseek-chat";
pub const DEFAULT_DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "deepseek-r1:7b";
pub const DEFAULT_OLLAMA_EMBEDDING_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    DeepSeek,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::DeepSeek => "deepseek",
            Self::Ollama => "ollama",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "deepseek" => Some(Self::DeepSeek),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }
}

/// Configuration for the LLM client and the embedder.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Per-request timeout; also the per-item timeout in batch fan-out.
    pub request_timeout: Duration,
    /// Bounded concurrency for batch summarization.
    pub max_workers: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            api_key: String::new(),
            base_url: String::new(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            embedding_model: DEFAULT_OPENAI_EMBEDDING_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            request_timeout: Duration::from_secs(30),
            max_workers: 10,
        }
    }
}

impl LlmConfig {
    /// Build configuration from environment variables.
    ///
    /// `ARIADNE_LLM_PROVIDER` selects the provider; per-provider
    /// `*_API_KEY`, `*_BASE_URL`, `*_MODEL`, `*_EMBEDDING_MODEL` variables
    /// fill the rest.
    pub fn from_env() -> Self {
        let provider = std::env::var("ARIADNE_LLM_PROVIDER")
            .ok()
            .as_deref()
            .and_then(LlmProvider::parse)
            .unwrap_or(LlmProvider::OpenAi);

        let mut config = Self {
            provider,
            ..Default::default()
        };

        match provider {
            LlmProvider::OpenAi => {
                config.api_key = env_or("ARIADNE_OPENAI_API_KEY", "");
                config.model = env_or("ARIADNE_OPENAI_MODEL", DEFAULT_OPENAI_MODEL);
                config.embedding_model =
                    env_or("ARIADNE_OPENAI_EMBEDDING_MODEL", DEFAULT_OPENAI_EMBEDDING_MODEL);
                config.base_url = env_or("ARIADNE_OPENAI_BASE_URL", "https://api.openai.com");
            }
            LlmProvider::DeepSeek => {
                config.api_key = env_or("ARIADNE_DEEPSEEK_API_KEY", "");
                config.base_url = env_or("ARIADNE_DEEPSEEK_BASE_URL", DEFAULT_DEEPSEEK_BASE_URL);
                config.model = env_or("ARIADNE_DEEPSEEK_MODEL", DEFAULT_DEEPSEEK_MODEL);
                // DeepSeek serves embeddings through the same
                // OpenAI-compatible endpoint and model.
                config.embedding_model = config.model.clone();
            }
            LlmProvider::Ollama => {
                config.base_url = env_or("ARIADNE_OLLAMA_BASE_URL", DEFAULT_OLLAMA_BASE_URL);
                config.model = env_or("ARIADNE_OLLAMA_MODEL", DEFAULT_OLLAMA_MODEL);
                config.embedding_model =
                    env_or("ARIADNE_OLLAMA_EMBEDDING_MODEL", DEFAULT_OLLAMA_EMBEDDING_MODEL);
                // Ollama ignores the key but the wire format requires one.
                config.api_key = "ollama".to_string();
            }
        }

        config
    }

    /// Minimum requirements for operation.
    pub fn is_valid(&self) -> bool {
        match self.provider {
            LlmProvider::Ollama => !self.base_url.is_empty() && !self.model.is_empty(),
            _ => !self.api_key.is_empty(),
        }
    }

    /// Human-readable reasons `is_valid` is false.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        match self.provider {
            LlmProvider::OpenAi => {
                if self.api_key.is_empty() {
                    errors.push("openai provider requires ARIADNE_OPENAI_API_KEY".to_string());
                }
            }
            LlmProvider::DeepSeek => {
                if self.api_key.is_empty() {
                    errors.push("deepseek provider requires ARIADNE_DEEPSEEK_API_KEY".to_string());
                }
            }
            LlmProvider::Ollama => {
                if self.base_url.is_empty() {
                    errors.push("ollama provider requires ARIADNE_OLLAMA_BASE_URL".to_string());
                }
                if self.model.is_empty() {
                    errors.push("ollama provider requires ARIADNE_OLLAMA_MODEL".to_string());
                }
            }
        }
        errors
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_round_trips() {
        for provider in [LlmProvider::OpenAi, LlmProvider::DeepSeek, LlmProvider::Ollama] {
            assert_eq!(LlmProvider::parse(provider.as_str()), Some(provider));
        }
        assert_eq!(LlmProvider::parse("OPENAI"), Some(LlmProvider::OpenAi));
        assert_eq!(LlmProvider::parse("unknown"), None);
    }

    #[test]
    fn openai_without_key_is_invalid() {
        let config = LlmConfig::default();
        assert!(!config.is_valid());
        assert!(!config.validation_errors().is_empty());
    }

    #[test]
    fn ollama_needs_no_key() {
        let config = LlmConfig {
            provider: LlmProvider::Ollama,
            base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            api_key: String::new(),
            ..Default::default()
        };
        assert!(config.is_valid());
    }
}
