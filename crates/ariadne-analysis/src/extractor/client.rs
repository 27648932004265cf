//! HTTP client for the bytecode analysis service (the ingestor).

use std::time::Duration;

use tracing::debug;

use ariadne_core::models::ingest::{AnalyzeRequest, AnalyzeResponse, HealthResponse};
use ariadne_core::{AriadneError, AriadneResult};

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// Bulk analysis runs much longer than ordinary requests.
const ANALYZE_TIMEOUT: Duration = Duration::from_secs(600);

pub struct AsmClient {
    service_url: String,
    http: reqwest::blocking::Client,
}

impl AsmClient {
    pub fn new(service_url: &str) -> AriadneResult<Self> {
        Self::with_timeout(service_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(service_url: &str, timeout: Duration) -> AriadneResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AriadneError::Unavailable {
                service: "asm",
                reason: e.to_string(),
            })?;
        Ok(Self {
            service_url: service_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// `GET /health` — is the analysis service up?
    pub fn health_check(&self) -> AriadneResult<HealthResponse> {
        let resp = self
            .http
            .get(format!("{}/health", self.service_url))
            .send()
            .map_err(|e| AriadneError::Unavailable {
                service: "asm",
                reason: e.to_string(),
            })?;
        if !resp.status().is_success() {
            return Err(AriadneError::Unavailable {
                service: "asm",
                reason: format!("health check returned HTTP {}", resp.status()),
            });
        }
        resp.json().map_err(|e| AriadneError::Unavailable {
            service: "asm",
            reason: format!("malformed health response: {e}"),
        })
    }

    /// `POST /analyze` — analyze a batch of compiled class files for
    /// symbols and call relationships. Uses the long bulk timeout.
    pub fn analyze_classes(
        &self,
        class_files: Vec<String>,
        domains: Option<Vec<String>>,
    ) -> AriadneResult<AnalyzeResponse> {
        debug!(files = class_files.len(), "Requesting bytecode analysis");

        let request = AnalyzeRequest {
            class_files,
            domains,
            enhanced: true,
            spring_analysis: true,
            include_attributes: true,
        };

        let resp = self
            .http
            .post(format!("{}/analyze", self.service_url))
            .timeout(ANALYZE_TIMEOUT)
            .json(&request)
            .send()
            .map_err(|e| AriadneError::Unavailable {
                service: "asm",
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(AriadneError::Unavailable {
                service: "asm",
                reason: format!("analyze returned HTTP {}", resp.status()),
            });
        }

        resp.json().map_err(|e| AriadneError::Unavailable {
            service: "asm",
            reason: format!("malformed analyze response: {e}"),
        })
    }
}
