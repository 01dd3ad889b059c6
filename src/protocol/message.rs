//! Protocol messages and content parts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies the sender of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Messages sent by the client on behalf of the user.
    User,
    /// Messages sent by the agent.
    Agent,
}

/// A single content segment of a message or artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    /// A plain text segment.
    Text { text: String },
    /// A structured JSON segment.
    Data { data: serde_json::Value },
}

impl Part {
    /// Text content of this part, if it is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            Part::Data { .. } => None,
        }
    }

    /// Structured content of this part, if it is a data part.
    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            Part::Data { data } => Some(data),
            Part::Text { .. } => None,
        }
    }
}

/// A single message exchanged between a user and an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Wire discriminator, always `"message"`.
    #[serde(default = "default_message_kind")]
    pub kind: String,
    /// Unique identifier assigned by the sender.
    #[serde(rename = "messageId")]
    pub message_id: String,
    /// Who authored the message.
    pub role: Role,
    /// Ordered content segments forming the message body.
    pub parts: Vec<Part>,
    /// Conversation grouping key, stable across turns.
    #[serde(skip_serializing_if = "Option::is_none", rename = "contextId")]
    pub context_id: Option<String>,
    /// Task this message belongs to. Omitted on the first message of a new task.
    #[serde(skip_serializing_if = "Option::is_none", rename = "taskId")]
    pub task_id: Option<String>,
}

fn default_message_kind() -> String {
    "message".to_string()
}

impl Message {
    /// Create a user message with a single text part.
    pub fn user_text(text: impl Into<String>, context_id: Option<String>) -> Self {
        Self {
            kind: default_message_kind(),
            message_id: Uuid::new_v4().to_string(),
            role: Role::User,
            parts: vec![Part::Text { text: text.into() }],
            context_id,
            task_id: None,
        }
    }

    /// Create an agent message with a single text part, bound to a task.
    pub fn agent_text(
        text: impl Into<String>,
        context_id: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Self {
        Self {
            kind: default_message_kind(),
            message_id: Uuid::new_v4().to_string(),
            role: Role::Agent,
            parts: vec![Part::Text { text: text.into() }],
            context_id: Some(context_id.into()),
            task_id: Some(task_id.into()),
        }
    }

    /// Concatenated text content of all text parts, joined with newlines.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
