//! Task lifecycle model.
//!
//! A task is the unit of work exchanged between agents. It is created in
//! `submitted`, moves to `working` while an executor processes it, and ends in
//! exactly one terminal state. Terminal snapshots are never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::{Message, Part};

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// The task has been received and is awaiting execution.
    Submitted,
    /// The agent is actively working on the task.
    Working,
    /// The task finished successfully; artifacts carry the result.
    Completed,
    /// The task ended with an error; the status message carries the reason.
    Failed,
    /// The task was canceled before completion.
    Canceled,
}

impl TaskState {
    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: TaskState) -> bool {
        use TaskState::*;

        matches!(
            (self, target),
            // From Submitted (failing before work starts is allowed)
            (Submitted, Working) | (Submitted, Failed) | (Submitted, Canceled) |
            // From Working
            (Working, Completed) | (Working, Failed) | (Working, Canceled)
        )
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Submitted => "submitted",
            Self::Working => "working",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        };
        write!(f, "{s}")
    }
}

/// Status of a task at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    /// Current lifecycle state.
    pub state: TaskState,
    /// When this status was recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Optional agent message with detail, carries the reason on `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

impl TaskStatus {
    /// Status in the given state, stamped with the current time.
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            timestamp: Some(Utc::now()),
            message: None,
        }
    }

    /// Status in the given state carrying a detail message.
    pub fn with_message(state: TaskState, message: Message) -> Self {
        Self {
            state,
            timestamp: Some(Utc::now()),
            message: Some(message),
        }
    }
}

/// A named result payload attached to a completed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique identifier within the scope of the task.
    #[serde(rename = "artifactId")]
    pub artifact_id: String,
    /// Ordered content segments making up the artifact.
    pub parts: Vec<Part>,
    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Artifact {
    /// Create a named artifact with a single text part.
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            artifact_id: Uuid::new_v4().to_string(),
            parts: vec![Part::Text { text: text.into() }],
            name: Some(name.into()),
            description: None,
        }
    }

    /// Concatenated text content of all text parts, joined with newlines.
    pub fn content(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A unit of work exchanged between agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Wire discriminator, always `"task"`.
    #[serde(default = "default_task_kind")]
    pub kind: String,
    /// Unique task identifier, assigned by the receiving agent.
    pub id: String,
    /// Conversation grouping key, stable across related tasks.
    #[serde(rename = "contextId")]
    pub context_id: String,
    /// Current status.
    pub status: TaskStatus,
    /// Messages exchanged during the task, oldest first.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub history: Vec<Message>,
    /// Results produced by the agent, attached only on completion.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub artifacts: Vec<Artifact>,
}

fn default_task_kind() -> String {
    "task".to_string()
}

impl Task {
    /// Create a new task in `submitted` for the given triggering message.
    ///
    /// The context id is inherited from the message, or freshly generated if
    /// the message carries none.
    pub fn submitted(message: &Message) -> Self {
        let context_id = message
            .context_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            kind: default_task_kind(),
            id: Uuid::new_v4().to_string(),
            context_id,
            status: TaskStatus::new(TaskState::Submitted),
            history: vec![message.clone()],
            artifacts: Vec::new(),
        }
    }

    /// Construct a terminal `completed` snapshot carrying the given artifacts.
    ///
    /// Pure constructor: it represents the terminal event to be emitted and
    /// never mutates a prior task object.
    pub fn completed(
        id: impl Into<String>,
        context_id: impl Into<String>,
        artifacts: Vec<Artifact>,
        history: Vec<Message>,
    ) -> Self {
        Self {
            kind: default_task_kind(),
            id: id.into(),
            context_id: context_id.into(),
            status: TaskStatus::new(TaskState::Completed),
            history,
            artifacts,
        }
    }

    /// Construct a terminal `failed` snapshot carrying a human-readable reason.
    pub fn failed(
        id: impl Into<String>,
        context_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let context_id = context_id.into();
        let message = Message::agent_text(reason, context_id.clone(), id.clone());
        Self {
            kind: default_task_kind(),
            id,
            context_id,
            status: TaskStatus::with_message(TaskState::Failed, message),
            history: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.state.is_terminal()
    }

    /// Concatenated text of every artifact, in artifact order.
    pub fn artifact_text(&self) -> String {
        self.artifacts
            .iter()
            .map(Artifact::content)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
