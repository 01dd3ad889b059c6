//! Agent executor trait and per-request context.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, ServerError};
use crate::protocol::{Message, Task, TaskEvent, TaskStatusUpdateEvent};

/// Everything an executor needs to know about one inbound request.
///
/// The context is the authority on task and context ids: when the request
/// references no existing task, fresh ids are assigned here and every event
/// the executor emits must use them.
#[derive(Debug, Clone)]
pub struct RequestContext {
    message: Message,
    task_id: String,
    context_id: String,
    current_task: Option<Task>,
}

impl RequestContext {
    /// Build a context for an inbound message and the stored task it
    /// references, if any.
    pub fn new(message: Message, current_task: Option<Task>) -> Self {
        let task_id = current_task
            .as_ref()
            .map(|t| t.id.clone())
            .or_else(|| message.task_id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let context_id = current_task
            .as_ref()
            .map(|t| t.context_id.clone())
            .or_else(|| message.context_id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            message,
            task_id,
            context_id,
            current_task,
        }
    }

    /// Context for an operation on an already stored task.
    pub fn for_task(task: &Task) -> Self {
        let message = task
            .history
            .first()
            .cloned()
            .unwrap_or_else(|| Message::user_text(String::new(), Some(task.context_id.clone())));
        Self {
            message,
            task_id: task.id.clone(),
            context_id: task.context_id.clone(),
            current_task: Some(task.clone()),
        }
    }

    /// The triggering message.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Id of the task this request drives.
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Conversation grouping key for this request.
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// The stored task this request references, if one exists.
    pub fn current_task(&self) -> Option<&Task> {
        self.current_task.as_ref()
    }

    /// Concatenated text of the triggering message.
    pub fn user_input(&self) -> String {
        self.message.text()
    }

    /// Fresh `submitted` task snapshot bound to this request's ids.
    pub fn new_task(&self) -> Task {
        let mut task = Task::submitted(&self.message);
        task.id = self.task_id.clone();
        task.context_id = self.context_id.clone();
        task
    }
}

/// Ordered outlet for the events an executor emits while driving a task.
///
/// Sending never blocks; if the receiving side is gone the event is dropped,
/// since a disconnected client has no use for it.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<TaskEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<TaskEvent>) -> Self {
        Self { tx }
    }

    /// Emit a protocol event.
    pub fn send(&self, event: TaskEvent) {
        if self.tx.send(event).is_err() {
            debug!("event receiver dropped, discarding event");
        }
    }

    /// Emit a full task snapshot.
    pub fn task(&self, task: Task) {
        self.send(TaskEvent::Task(task));
    }

    /// Emit a non-final `working` status update for the given task.
    pub fn working(&self, task: &Task) {
        self.send(TaskEvent::StatusUpdate(TaskStatusUpdateEvent::working(
            task.id.clone(),
            task.context_id.clone(),
        )));
    }

    /// Emit a final `failed` status update.
    pub fn fail(
        &self,
        task_id: impl Into<String>,
        context_id: impl Into<String>,
        reason: impl Into<String>,
    ) {
        self.send(TaskEvent::StatusUpdate(TaskStatusUpdateEvent::failed(
            task_id, context_id, reason,
        )));
    }
}

/// Server-side processing for one agent.
///
/// Implementations receive each inbound request as a [`RequestContext`] and
/// report progress through the [`EventSink`].
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Process one inbound request.
    ///
    /// The request handler guarantees the client always sees a terminal
    /// event: if this method returns, errors, or panics without emitting
    /// one, a `failed` status update is synthesized on its behalf.
    async fn execute(&self, ctx: RequestContext, sink: EventSink) -> Result<()>;

    /// Handle a cancellation request.
    ///
    /// No agent in this system supports cancellation; the default signals
    /// `UnsupportedOperation` rather than silently accepting.
    async fn cancel(&self, _ctx: RequestContext, _sink: EventSink) -> Result<()> {
        Err(ServerError::UnsupportedOperation {
            method: "tasks/cancel".to_string(),
        }
        .into())
    }
}
