//! Configuration types.
//!
//! Each process reads its configuration from the environment once at startup;
//! nothing here is global or mutable after construction.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ConfigError;

/// Configuration for a single agent HTTP service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Socket address the service binds to.
    pub bind_addr: SocketAddr,
}

impl ServiceConfig {
    /// Read the service configuration from the environment.
    ///
    /// `PORT` overrides the default port; the bind host is always `0.0.0.0`.
    pub fn from_env(default_port: u16) -> Result<Self, ConfigError> {
        let port = match env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                message: e.to_string(),
            })?,
            Err(_) => default_port,
        };
        let bind_addr =
            format!("0.0.0.0:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                    key: "PORT".to_string(),
                    message: e.to_string(),
                })?;
        Ok(Self { bind_addr })
    }

    /// Public base URL advertised in the agent card.
    pub fn public_url(&self) -> String {
        format!("http://{}/", self.bind_addr)
    }
}

/// Configuration for the local LLM endpoint.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model identifier passed to the generation endpoint.
    pub model: String,
    /// Base URL of the Ollama server.
    pub base_url: String,
}

impl LlmConfig {
    /// Read the LLM configuration from `OLLAMA_MODEL` / `OLLAMA_BASE_URL`.
    pub fn from_env() -> Self {
        Self {
            model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.1:8b".to_string()),
            base_url: env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "llama3.1:8b".to_string(),
            base_url: "http://localhost:11434".to_string(),
        }
    }
}

/// Configuration for the orchestrator process.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Base URL of the safety agent.
    pub safety_url: String,
    /// Base URL of the memory agent.
    pub memory_url: String,
    /// Base URL of the companion agent.
    pub companion_url: String,
    /// User the orchestrator acts for.
    pub user_id: String,
    /// Deadline applied to every cross-agent call.
    pub task_timeout: Duration,
}

impl OrchestratorConfig {
    /// Read the orchestrator configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let task_timeout = match env::var("CARE_TASK_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs = raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                    key: "CARE_TASK_TIMEOUT_SECS".to_string(),
                    message: e.to_string(),
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(15),
        };
        Ok(Self {
            safety_url: env::var("SAFETY_AGENT_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            memory_url: env::var("MEMORY_AGENT_URL")
                .unwrap_or_else(|_| "http://localhost:8082".to_string()),
            companion_url: env::var("COMPANION_AGENT_URL")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            user_id: env::var("CARE_USER_ID").unwrap_or_else(|_| "default_user".to_string()),
            task_timeout,
        })
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            safety_url: "http://localhost:8080".to_string(),
            memory_url: "http://localhost:8082".to_string(),
            companion_url: "http://localhost:8081".to_string(),
            user_id: "default_user".to_string(),
            task_timeout: Duration::from_secs(15),
        }
    }
}
