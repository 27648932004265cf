//! OpenAI-compatible chat-completions client with retry.
//!
//! The `SummaryProvider` trait is the seam the summarization pipeline
//! depends on; tests substitute closures or stubs for the HTTP client.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ariadne_core::{AriadneError, AriadneResult};

use crate::config::{LlmConfig, LlmProvider};
use crate::prompts::SUMMARY_SYSTEM_PROMPT;

/// Retry budget for rate limits and transient network failures.
const MAX_RETRIES: u32 = 3;
const MIN_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Code longer than this is truncated before prompting.
const MAX_CODE_LENGTH: usize = 50_000;

/// Context handed to the summarizer alongside the source text.
#[derive(Debug, Clone, Default)]
pub struct SummaryContext {
    pub class_name: String,
    pub method_name: String,
    pub signature: String,
    pub modifiers: Vec<String>,
    pub annotations: Vec<String>,
}

/// The `summarize(code, ctx) -> String` contract the core consumes.
pub trait SummaryProvider: Send + Sync {
    fn generate_summary(&self, code: &str, context: &SummaryContext) -> AriadneResult<String>;

    /// Per-call timeout; batch fan-out uses this as the per-item budget.
    fn request_timeout(&self) -> Duration;
}

// ─── Wire types ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

// ─── Client ─────────────────────────────────────────────────────────────────

/// Chat client over the OpenAI-compatible completions API.
pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::blocking::Client,
}

impl LlmClient {
    /// Build a client; rejects invalid configuration up front.
    pub fn new(config: LlmConfig) -> AriadneResult<Self> {
        if !config.is_valid() {
            return Err(AriadneError::InvalidArgument(format!(
                "invalid LLM configuration: {}",
                config.validation_errors().join(", ")
            )));
        }

        let http = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AriadneError::Unavailable {
                service: "llm",
                reason: e.to_string(),
            })?;

        debug!(
            provider = config.provider.as_str(),
            model = %config.model,
            "Initialized LLM client"
        );
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        match self.config.provider {
            LlmProvider::Ollama => format!("{}/v1/chat/completions", self.config.base_url),
            _ => format!(
                "{}/v1/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ),
        }
    }

    /// One chat call with bounded exponential backoff on transient
    /// failures (connection errors, timeouts, 429, 5xx).
    fn call_llm(&self, prompt: &str, system_prompt: &str) -> AriadneResult<(String, ChatUsage)> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let mut backoff = MIN_BACKOFF;
        let mut last_error = String::new();

        for attempt in 1..=MAX_RETRIES {
            let response = self
                .http
                .post(self.completions_url())
                .bearer_auth(&self.config.api_key)
                .json(&request)
                .send();

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: ChatResponse =
                            resp.json().map_err(|e| AriadneError::Unavailable {
                                service: "llm",
                                reason: format!("malformed completion response: {e}"),
                            })?;
                        let content = parsed
                            .choices
                            .first()
                            .and_then(|c| c.message.content.clone())
                            .unwrap_or_default();
                        return Ok((content, parsed.usage.unwrap_or_default()));
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        last_error = format!("HTTP {status}");
                    } else {
                        // Client errors are not retryable.
                        return Err(AriadneError::Unavailable {
                            service: "llm",
                            reason: format!("HTTP {status}"),
                        });
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            if attempt < MAX_RETRIES {
                warn!(attempt, error = %last_error, "LLM call failed, backing off");
                std::thread::sleep(backoff);
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }

        Err(AriadneError::Transient {
            attempts: MAX_RETRIES,
            reason: last_error,
        })
    }

    /// Ask for a structured JSON response and parse it.
    pub fn generate_structured_response(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> AriadneResult<serde_json::Value> {
        let json_system = match system_prompt {
            Some(s) => format!(
                "{s}\n\nYou must respond with valid JSON only, no additional text or explanation."
            ),
            None => {
                "You must respond with valid JSON only, no additional text or explanation."
                    .to_string()
            }
        };

        let (response, _) = self.call_llm(prompt, &json_system)?;
        let trimmed = strip_code_fences(&response);
        serde_json::from_str(trimmed).map_err(|_| {
            AriadneError::InvalidArgument(format!("LLM did not return valid JSON: {response}"))
        })
    }

    /// Raw chat access for callers that track usage (cost reporting).
    pub fn chat(&self, prompt: &str, system_prompt: &str) -> AriadneResult<(String, ChatUsage)> {
        self.call_llm(prompt, system_prompt)
    }
}

impl SummaryProvider for LlmClient {
    fn generate_summary(&self, code: &str, context: &SummaryContext) -> AriadneResult<String> {
        let mut prompt_parts: Vec<String> = Vec::new();
        if !context.class_name.is_empty() {
            prompt_parts.push(format!("Class: {}", context.class_name));
        }
        if !context.method_name.is_empty() {
            prompt_parts.push(format!("Method: {}", context.method_name));
        }
        if !context.signature.is_empty() {
            prompt_parts.push(format!("Signature: {}", context.signature));
        }
        if !context.modifiers.is_empty() {
            prompt_parts.push(format!("Modifiers: {}", context.modifiers.join(", ")));
        }
        if !context.annotations.is_empty() {
            prompt_parts.push(format!("Annotations: {}", context.annotations.join(", ")));
        }

        let sanitized = sanitize_code_for_llm(code, MAX_CODE_LENGTH);
        prompt_parts.push(format!("\nSource code:\n```java\n{sanitized}\n```"));

        let (raw, _) = self.call_llm(&prompt_parts.join("\n"), SUMMARY_SYSTEM_PROMPT)?;
        Ok(clean_summary(&raw))
    }

    fn request_timeout(&self) -> Duration {
        self.config.request_timeout
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Strip comment patterns that read as prompt-injection attempts, and cap
/// the length. Code logic is untouched; only suspicious comments go.
pub fn sanitize_code_for_llm(code: &str, max_length: usize) -> String {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        let keywords = [
            "IGNORE", "INSTRUCTIONS", "OUTPUT", "PRINT", "TRANSLATE", "SHOW", "REVEAL",
            "SYSTEM", "SECRET", "PASSWORD", "KEY",
        ];
        let mut patterns = Vec::new();
        for keyword in keywords {
            patterns.push(
                Regex::new(&format!(r"(?is)/\*.*?{keyword}.*?\*/")).expect("static regex"),
            );
            patterns.push(Regex::new(&format!(r"(?i)//.*{keyword}.*")).expect("static regex"));
        }
        patterns
    });

    let mut code: String = code.chars().take(max_length).collect();
    for pattern in patterns {
        code = pattern.replace_all(&code, "").into_owned();
    }
    code.trim().to_string()
}

/// Trim the model's response and drop boilerplate prefixes.
fn clean_summary(raw: &str) -> String {
    let mut summary = raw.trim().to_string();
    for prefix in ["Summary:", "summary:", "This method", "The method"] {
        if let Some(stripped) = summary.strip_prefix(prefix) {
            summary = stripped.trim().to_string();
        }
    }
    summary
}

/// Models often wrap JSON answers in markdown fences.
fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}
