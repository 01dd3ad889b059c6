//! Request dispatch shared by every agent service.
//!
//! The handler drives one executor per inbound request and enforces the
//! protocol contract the clients rely on: every request ends in exactly one
//! terminal event. Events after the terminal one are discarded, and an
//! executor that finishes without one gets a `failed` update synthesized in
//! its place so callers never block without a diagnostic.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Error, ServerError};
use crate::protocol::{
    JsonRpcError, Message, MessageSendParams, Task, TaskEvent, TaskIdParams,
    TaskStatusUpdateEvent,
};
use crate::server::executor::{AgentExecutor, EventSink, RequestContext};
use crate::server::store::TaskStore;

/// Dispatches protocol operations onto an executor and its task store.
pub struct RequestHandler {
    executor: Arc<dyn AgentExecutor>,
    store: Arc<TaskStore>,
}

impl RequestHandler {
    pub fn new(executor: Arc<dyn AgentExecutor>, store: Arc<TaskStore>) -> Self {
        Self { executor, store }
    }

    /// Handle `message/send`: drive the task to its terminal state and
    /// return the final stored snapshot.
    pub async fn message_send(&self, params: MessageSendParams) -> Result<Task, JsonRpcError> {
        let (task_id, mut events) = self.drive(params.message).await;
        while events.recv().await.is_some() {}
        self.store
            .get(&task_id)
            .await
            .ok_or_else(|| JsonRpcError::internal("task missing after execution"))
    }

    /// Handle `message/stream`: return the ordered event stream for the
    /// request. The stream ends after the terminal event.
    pub async fn message_stream(
        &self,
        params: MessageSendParams,
    ) -> mpsc::UnboundedReceiver<TaskEvent> {
        self.drive(params.message).await.1
    }

    /// Handle `tasks/get`.
    pub async fn tasks_get(&self, params: TaskIdParams) -> Result<Task, JsonRpcError> {
        self.store
            .get(&params.id)
            .await
            .ok_or_else(|| JsonRpcError::task_not_found(&params.id))
    }

    /// Handle `tasks/cancel`.
    pub async fn tasks_cancel(&self, params: TaskIdParams) -> Result<Task, JsonRpcError> {
        let task = self
            .store
            .get(&params.id)
            .await
            .ok_or_else(|| JsonRpcError::task_not_found(&params.id))?;
        let ctx = RequestContext::for_task(&task);
        let (tx, _rx) = mpsc::unbounded_channel();
        match self.executor.cancel(ctx, EventSink::new(tx)).await {
            Ok(()) => self
                .store
                .get(&params.id)
                .await
                .ok_or_else(|| JsonRpcError::task_not_found(&params.id)),
            Err(Error::Server(ServerError::UnsupportedOperation { method })) => {
                Err(JsonRpcError::unsupported_operation(&method))
            }
            Err(e) => Err(JsonRpcError::internal(e.to_string())),
        }
    }

    /// Spawn the executor for one inbound message and relay its events.
    ///
    /// Each event is folded into the store before being forwarded, so a
    /// `tasks/get` after the stream ends observes the same terminal snapshot
    /// the stream reported. Returns the task id the request was assigned and
    /// the outgoing event stream.
    async fn drive(&self, mut message: Message) -> (String, mpsc::UnboundedReceiver<TaskEvent>) {
        let mut current_task = match &message.task_id {
            Some(id) => self.store.get(id).await,
            None => None,
        };
        // A terminal task cannot be driven further; a message referencing one
        // starts a fresh task in the same context.
        if let Some(task) = &current_task {
            if task.is_terminal() {
                message.task_id = None;
                message.context_id = Some(task.context_id.clone());
                current_task = None;
            }
        }
        let ctx = RequestContext::new(message, current_task);
        let task_id = ctx.task_id().to_string();
        let context_id = ctx.context_id().to_string();
        let fallback_task = ctx.new_task();

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        let executor = Arc::clone(&self.executor);
        let exec_handle =
            tokio::spawn(async move { executor.execute(ctx, EventSink::new(event_tx)).await });

        let store = Arc::clone(&self.store);
        let relay_task_id = task_id.clone();
        tokio::spawn(async move {
            let mut terminal_seen = false;
            while let Some(event) = event_rx.recv().await {
                if terminal_seen {
                    warn!(
                        task_id = %relay_task_id,
                        "executor emitted an event after the terminal one, discarding"
                    );
                    continue;
                }
                if let Err(e) = store.apply(&event).await {
                    warn!(task_id = %relay_task_id, error = %e, "discarding invalid event");
                    continue;
                }
                terminal_seen = event.terminal_state().is_some();
                let _ = out_tx.send(event);
                if terminal_seen {
                    break;
                }
            }

            if !terminal_seen {
                // The executor is done (its sender is dropped) but never
                // reached a terminal state. Synthesize the failure so the
                // client gets a diagnostic instead of a hang.
                let reason = match exec_handle.await {
                    Ok(Ok(())) => "executor finished without a terminal event".to_string(),
                    Ok(Err(e)) => e.to_string(),
                    Err(e) => format!("executor panicked: {e}"),
                };
                warn!(task_id = %relay_task_id, %reason, "synthesizing failed terminal event");

                if store.get(&relay_task_id).await.is_none() {
                    if let Err(e) = store.save(fallback_task).await {
                        debug!(task_id = %relay_task_id, error = %e, "could not record fallback task");
                    }
                }
                let event = TaskEvent::StatusUpdate(TaskStatusUpdateEvent::failed(
                    relay_task_id.clone(),
                    context_id,
                    reason,
                ));
                if let Err(e) = store.apply(&event).await {
                    debug!(task_id = %relay_task_id, error = %e, "could not record synthesized failure");
                }
                let _ = out_tx.send(event);
            }
        });

        (task_id, out_rx)
    }
}
