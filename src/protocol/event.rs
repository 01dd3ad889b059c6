//! Streaming task events.
//!
//! An executor reports progress as a sequence of events: a task snapshot when
//! a new task is created, status updates as the lifecycle advances, and
//! artifact updates as results are produced. Exactly one terminal event ends
//! the sequence.

use serde::{Deserialize, Serialize};

use super::message::Message;
use super::task::{Artifact, Task, TaskState, TaskStatus};

/// Notifies the client of a change in a task's lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusUpdateEvent {
    /// Wire discriminator, always `"status-update"`.
    #[serde(default = "default_status_update_kind")]
    pub kind: String,
    /// The task that was updated.
    #[serde(rename = "taskId")]
    pub task_id: String,
    /// Context the task belongs to.
    #[serde(rename = "contextId")]
    pub context_id: String,
    /// The new status.
    pub status: TaskStatus,
    /// True on the last event of the stream for this request.
    #[serde(rename = "final")]
    pub is_final: bool,
}

fn default_status_update_kind() -> String {
    "status-update".to_string()
}

impl TaskStatusUpdateEvent {
    /// Non-final update announcing the task has started being processed.
    pub fn working(task_id: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            kind: default_status_update_kind(),
            task_id: task_id.into(),
            context_id: context_id.into(),
            status: TaskStatus::new(TaskState::Working),
            is_final: false,
        }
    }

    /// Final update marking the task failed with a reason message.
    pub fn failed(
        task_id: impl Into<String>,
        context_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let task_id = task_id.into();
        let context_id = context_id.into();
        let message = Message::agent_text(reason, context_id.clone(), task_id.clone());
        Self {
            kind: default_status_update_kind(),
            task_id,
            context_id,
            status: TaskStatus::with_message(TaskState::Failed, message),
            is_final: true,
        }
    }
}

/// Notifies the client that an artifact has been produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskArtifactUpdateEvent {
    /// Wire discriminator, always `"artifact-update"`.
    #[serde(default = "default_artifact_update_kind")]
    pub kind: String,
    /// The task the artifact belongs to.
    #[serde(rename = "taskId")]
    pub task_id: String,
    /// Context the task belongs to.
    #[serde(rename = "contextId")]
    pub context_id: String,
    /// The artifact that was produced.
    pub artifact: Artifact,
    /// True if this content extends a previously sent artifact with the same id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append: Option<bool>,
    /// True on the last chunk of this artifact.
    #[serde(skip_serializing_if = "Option::is_none", rename = "lastChunk")]
    pub last_chunk: Option<bool>,
}

fn default_artifact_update_kind() -> String {
    "artifact-update".to_string()
}

impl TaskArtifactUpdateEvent {
    /// Single-chunk artifact update.
    pub fn complete(
        task_id: impl Into<String>,
        context_id: impl Into<String>,
        artifact: Artifact,
    ) -> Self {
        Self {
            kind: default_artifact_update_kind(),
            task_id: task_id.into(),
            context_id: context_id.into(),
            artifact,
            append: None,
            last_chunk: Some(true),
        }
    }
}

/// Any event an executor can emit while driving a task.
///
/// Variants are distinguished on the wire by their required fields, so the
/// enum is untagged; each payload carries its own `kind` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskEvent {
    /// Full task snapshot, emitted when a task is created or completed.
    Task(Task),
    /// Lifecycle status change.
    StatusUpdate(TaskStatusUpdateEvent),
    /// Artifact produced during execution.
    ArtifactUpdate(TaskArtifactUpdateEvent),
}

impl TaskEvent {
    /// Id of the task this event concerns.
    pub fn task_id(&self) -> &str {
        match self {
            TaskEvent::Task(t) => &t.id,
            TaskEvent::StatusUpdate(e) => &e.task_id,
            TaskEvent::ArtifactUpdate(e) => &e.task_id,
        }
    }

    /// Terminal state announced by this event, if it ends the stream.
    ///
    /// A task snapshot in a terminal state and a final status update both
    /// count; artifact updates never do.
    pub fn terminal_state(&self) -> Option<TaskState> {
        match self {
            TaskEvent::Task(t) if t.is_terminal() => Some(t.status.state),
            TaskEvent::StatusUpdate(e) if e.is_final && e.status.state.is_terminal() => {
                Some(e.status.state)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::Message;

    #[test]
    fn working_update_is_not_terminal() {
        let event = TaskEvent::StatusUpdate(TaskStatusUpdateEvent::working("t-1", "ctx-1"));
        assert_eq!(event.terminal_state(), None);
        assert_eq!(event.task_id(), "t-1");
    }

    #[test]
    fn failed_update_is_terminal() {
        let event = TaskEvent::StatusUpdate(TaskStatusUpdateEvent::failed("t-1", "ctx-1", "boom"));
        assert_eq!(event.terminal_state(), Some(TaskState::Failed));
    }

    #[test]
    fn completed_snapshot_is_terminal() {
        let task = Task::completed("t-1", "ctx-1", vec![Artifact::text("r", "ok")], Vec::new());
        let event = TaskEvent::Task(task);
        assert_eq!(event.terminal_state(), Some(TaskState::Completed));
    }

    #[test]
    fn submitted_snapshot_is_not_terminal() {
        let msg = Message::user_text("hi", None);
        let event = TaskEvent::Task(Task::submitted(&msg));
        assert_eq!(event.terminal_state(), None);
    }

    #[test]
    fn status_update_wire_shape() {
        let event = TaskStatusUpdateEvent::failed("t-1", "ctx-1", "boom");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "status-update");
        assert_eq!(json["taskId"], "t-1");
        assert_eq!(json["final"], true);
        assert_eq!(json["status"]["state"], "failed");
    }

    #[test]
    fn untagged_decode_discriminates_by_fields() {
        let status = serde_json::json!({
            "kind": "status-update",
            "taskId": "t-1",
            "contextId": "ctx-1",
            "status": {"state": "working"},
            "final": false
        });
        let event: TaskEvent = serde_json::from_value(status).unwrap();
        assert!(matches!(event, TaskEvent::StatusUpdate(_)));

        let artifact = serde_json::json!({
            "kind": "artifact-update",
            "taskId": "t-1",
            "contextId": "ctx-1",
            "artifact": {
                "artifactId": "a-1",
                "parts": [{"kind": "text", "text": "hello"}]
            },
            "lastChunk": true
        });
        let event: TaskEvent = serde_json::from_value(artifact).unwrap();
        assert!(matches!(event, TaskEvent::ArtifactUpdate(_)));

        let task = serde_json::json!({
            "kind": "task",
            "id": "t-1",
            "contextId": "ctx-1",
            "status": {"state": "submitted"}
        });
        let event: TaskEvent = serde_json::from_value(task).unwrap();
        assert!(matches!(event, TaskEvent::Task(_)));
    }

    #[test]
    fn event_roundtrip() {
        let event = TaskEvent::ArtifactUpdate(TaskArtifactUpdateEvent::complete(
            "t-1",
            "ctx-1",
            Artifact::text("result", "payload"),
        ));
        let json = serde_json::to_string(&event).unwrap();
        let parsed: TaskEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
