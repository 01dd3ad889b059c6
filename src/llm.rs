//! Local language model access.
//!
//! Responses are generated through a local Ollama server. Everything that
//! needs a completion goes through the [`LlmClient`] trait so tests can
//! substitute a canned backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{LlmError, Result};

const OLLAMA_TIMEOUT: Duration = Duration::from_secs(30);

/// Text generation backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for the prompt. Empty output is returned as an
    /// empty string, not an error.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Client for a local Ollama server's `/api/generate` endpoint.
pub struct OllamaClient {
    http: reqwest::Client,
    model: String,
    endpoint: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Self {
        Self::with_model(config, config.model.clone())
    }

    /// Use a different model than the configured default against the same
    /// server.
    pub fn with_model(config: &LlmConfig, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            model: model.into(),
            endpoint: format!("{}/api/generate", config.base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let payload = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        debug!(model = %self.model, "requesting completion");
        let response = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .timeout(OLLAMA_TIMEOUT)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(LlmError::RequestFailed {
                endpoint: self.endpoint.clone(),
                reason: format!("status {}", response.status()),
            }
            .into());
        }
        let body: GenerateResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;
        Ok(body.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_built_from_base_url() {
        let config = LlmConfig {
            model: "llama3.1:8b".to_string(),
            base_url: "http://localhost:11434/".to_string(),
        };
        let client = OllamaClient::new(&config);
        assert_eq!(client.endpoint, "http://localhost:11434/api/generate");
    }

    #[tokio::test]
    async fn generate_fails_when_server_is_down() {
        let config = LlmConfig {
            model: "llama3.1:8b".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
        };
        let client = OllamaClient::new(&config);
        let err = client.generate("hello").await.unwrap_err();
        assert!(err.to_string().contains("/api/generate"), "was {err}");
    }

    #[test]
    fn response_field_defaults_to_empty() {
        let body: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(body.response, "");
    }
}
