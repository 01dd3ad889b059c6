//! Error types for Care Assist.

use std::time::Duration;

/// Top-level error type for the agent system.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error("Safety error: {0}")]
    Safety(#[from] SafetyError),

    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Agent discovery errors.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Agent at {url} is unreachable: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("Agent card from {url} is malformed: {reason}")]
    MalformedCard { url: String, reason: String },
}

/// Errors surfaced by the agent client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("No terminal task event within {}ms", elapsed.as_millis())]
    Timeout { elapsed: Duration },

    #[error("Remote task failed: {reason}")]
    TaskFailed { reason: String },

    #[error("Remote task was canceled")]
    TaskCanceled,

    #[error("RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Event stream error: {0}")]
    Stream(String),
}

/// Errors raised while serving agent requests.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Operation {method} is not supported by this agent")]
    UnsupportedOperation { method: String },

    #[error("Task {id} not found")]
    TaskNotFound { id: String },

    #[error("Task {id} is terminal and cannot be modified")]
    TerminalTaskImmutable { id: String },

    #[error("Task {id} cannot transition from {from} to {to}")]
    InvalidTransition { id: String, from: String, to: String },

    #[error("Service failed to start: {0}")]
    Startup(String),

    #[error("Executor error: {0}")]
    Executor(String),
}

/// Safety engine errors.
#[derive(Debug, thiserror::Error)]
pub enum SafetyError {
    #[error("Emergency context unavailable for user {user_id}: {reason}")]
    ContextUnavailable { user_id: String, reason: String },
}

/// Structured payload decoding errors.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Malformed payload: {0}")]
    Malformed(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

/// Result type alias for the agent system.
pub type Result<T> = std::result::Result<T, Error>;
