//! Client side of the agent protocol.
//!
//! [`CardResolver`] fetches agent cards from the well-known discovery path.
//! [`AgentClient`] submits messages over `message/stream` and collects the
//! event stream until the first terminal event or the configured timeout.
//! The client never retries a turn; a failure is reported to the caller as
//! the error it was.

use std::time::Duration;

use tracing::debug;

use crate::error::{ClientError, DiscoveryError, Result};
use crate::protocol::{
    AGENT_CARD_PATH, AgentCard, JsonRpcRequest, JsonRpcResponse, Message, Task, TaskEvent,
    TaskState, TaskStatus,
    rpc::{METHOD_MESSAGE_STREAM, METHOD_TASKS_GET},
};

/// Default per-turn timeout when the caller does not set one.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(15);

/// The terminal result of one task turn.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    /// Terminal task snapshot.
    pub task: Task,
    /// Text of every artifact produced for the task, concatenated in the
    /// order it was received.
    pub text: String,
}

// ── Discovery ───────────────────────────────────────────────────────────

/// Fetches agent cards from their well-known location.
pub struct CardResolver {
    http: reqwest::Client,
}

impl CardResolver {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Fetch and decode the agent card published under `base_url`.
    pub async fn resolve(&self, base_url: &str) -> Result<AgentCard> {
        let url = card_url(base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| DiscoveryError::Unreachable {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(DiscoveryError::Unreachable {
                url,
                reason: format!("status {}", response.status()),
            }
            .into());
        }
        let card: AgentCard = response
            .json()
            .await
            .map_err(|e| DiscoveryError::MalformedCard {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        debug!(agent = %card.name, %url, "resolved agent card");
        Ok(card)
    }
}

impl Default for CardResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn card_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), AGENT_CARD_PATH)
}

// ── Client ──────────────────────────────────────────────────────────────

/// Submits messages to one agent and collects the resulting task events.
pub struct AgentClient {
    http: reqwest::Client,
    card: AgentCard,
    endpoint: String,
    timeout: Duration,
}

impl AgentClient {
    /// Resolve the agent card at `base_url` and build a client for it.
    pub async fn connect(base_url: &str) -> Result<Self> {
        let card = CardResolver::new().resolve(base_url).await?;
        Ok(Self::from_card(card))
    }

    /// Build a client from an already resolved card.
    pub fn from_card(card: AgentCard) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: card.url.clone(),
            card,
            timeout: DEFAULT_TASK_TIMEOUT,
        }
    }

    /// Replace the per-turn timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The card this client was built from.
    pub fn card(&self) -> &AgentCard {
        &self.card
    }

    /// Send a plain text user message.
    pub async fn send_text(&self, text: &str, context_id: Option<String>) -> Result<TaskOutcome> {
        self.send_message(Message::user_text(text, context_id)).await
    }

    /// Send a message over `message/stream` and collect events until the
    /// first terminal one. Returns the terminal snapshot and its artifact
    /// text, or the failure the stream reported. Times out if no terminal
    /// event arrives within the configured window.
    pub async fn send_message(&self, message: Message) -> Result<TaskOutcome> {
        let request = JsonRpcRequest::new(
            METHOD_MESSAGE_STREAM,
            serde_json::json!({ "message": message }),
        );
        match tokio::time::timeout(self.timeout, self.exchange(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ClientError::Timeout {
                elapsed: self.timeout,
            }
            .into()),
        }
    }

    /// Fetch the stored snapshot of a task.
    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        let request = JsonRpcRequest::new(METHOD_TASKS_GET, serde_json::json!({ "id": task_id }));
        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;
        let envelope: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;
        if let Some(error) = envelope.error {
            return Err(ClientError::Rpc {
                code: error.code,
                message: error.message,
            }
            .into());
        }
        let result = envelope
            .result
            .ok_or_else(|| ClientError::Stream("response carried neither result nor error".to_string()))?;
        let task =
            serde_json::from_value(result).map_err(|e| ClientError::Stream(e.to_string()))?;
        Ok(task)
    }

    async fn exchange(&self, request: JsonRpcRequest) -> Result<TaskOutcome> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ClientError::Http(format!("agent returned {}", response.status())).into());
        }
        self.collect(response).await
    }

    /// Read server-sent events off the response body until a terminal event.
    async fn collect(&self, mut response: reqwest::Response) -> Result<TaskOutcome> {
        let mut buffer = String::new();
        let mut streamed_text: Vec<String> = Vec::new();

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ClientError::Stream(e.to_string()))?
        {
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(end) = buffer.find("\n\n") {
                let frame: String = buffer.drain(..end + 2).collect();
                let Some(data) = sse_data(&frame) else {
                    continue;
                };
                match decode_event(&data)? {
                    TaskEvent::Task(task) => {
                        if task.is_terminal() {
                            return outcome_from_snapshot(task, streamed_text);
                        }
                    }
                    TaskEvent::StatusUpdate(update) => match update.status.state {
                        TaskState::Failed => {
                            return Err(ClientError::TaskFailed {
                                reason: failure_reason(&update.status),
                            }
                            .into());
                        }
                        TaskState::Canceled => return Err(ClientError::TaskCanceled.into()),
                        TaskState::Completed => {
                            // Completion announced without a snapshot; fetch
                            // the stored one so the caller still gets a task.
                            let task = self.get_task(&update.task_id).await?;
                            return outcome_from_snapshot(task, streamed_text);
                        }
                        TaskState::Submitted | TaskState::Working => {}
                    },
                    TaskEvent::ArtifactUpdate(update) => {
                        streamed_text.push(update.artifact.content());
                    }
                }
            }
        }
        Err(ClientError::Stream("stream ended before a terminal event".to_string()).into())
    }
}

// ── Stream decoding ─────────────────────────────────────────────────────

/// Joined `data:` payload of one SSE frame. Comment frames such as
/// keep-alives yield `None`.
fn sse_data(frame: &str) -> Option<String> {
    let mut data = String::new();
    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.trim_start());
        }
    }
    if data.is_empty() { None } else { Some(data) }
}

/// Decode one JSON-RPC stream frame into a task event.
fn decode_event(data: &str) -> Result<TaskEvent> {
    let envelope: JsonRpcResponse = serde_json::from_str(data)
        .map_err(|e| ClientError::Stream(format!("malformed stream frame: {e}")))?;
    if let Some(error) = envelope.error {
        return Err(ClientError::Rpc {
            code: error.code,
            message: error.message,
        }
        .into());
    }
    let result = envelope
        .result
        .ok_or_else(|| ClientError::Stream("stream frame carried neither result nor error".to_string()))?;
    let event = serde_json::from_value(result)
        .map_err(|e| ClientError::Stream(format!("unrecognized task event: {e}")))?;
    Ok(event)
}

fn outcome_from_snapshot(task: Task, streamed_text: Vec<String>) -> Result<TaskOutcome> {
    match task.status.state {
        TaskState::Completed => {
            // Snapshot artifacts repeat anything already streamed, so prefer
            // the streamed order when updates were seen.
            let text = if streamed_text.is_empty() {
                task.artifact_text()
            } else {
                streamed_text.join("\n")
            };
            Ok(TaskOutcome { task, text })
        }
        TaskState::Failed => Err(ClientError::TaskFailed {
            reason: failure_reason(&task.status),
        }
        .into()),
        TaskState::Canceled => Err(ClientError::TaskCanceled.into()),
        TaskState::Submitted | TaskState::Working => Err(ClientError::Stream(
            "non-terminal snapshot where a terminal one was expected".to_string(),
        )
        .into()),
    }
}

fn failure_reason(status: &TaskStatus) -> String {
    status
        .message
        .as_ref()
        .map(Message::text)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "task failed without a reason".to_string())
}
