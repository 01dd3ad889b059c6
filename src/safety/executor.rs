//! Safety agent executor.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::protocol::{Artifact, Task};
use crate::server::{AgentExecutor, EventSink, RequestContext};

use super::engine::RiskEngine;

/// Artifact name the safety agent attaches its verdict under.
pub const SAFETY_ARTIFACT: &str = "safety_analysis_result";

/// Structured form of a safety request payload.
///
/// The orchestrator sends `{"user_text": ..., "user_id": ...}`; anything that
/// does not parse as that object is treated as the raw utterance itself.
#[derive(Debug, Deserialize)]
struct SafetyRequest {
    user_text: String,
    #[serde(default)]
    user_id: Option<String>,
}

fn decode_request(raw: &str) -> (String, Option<String>) {
    match serde_json::from_str::<SafetyRequest>(raw) {
        Ok(request) => (request.user_text, request.user_id),
        Err(e) => {
            debug!(error = %e, "payload is not a safety request object, using raw text");
            (raw.to_string(), None)
        }
    }
}

/// Runs the risk engine for each inbound task.
///
/// The task's context id doubles as the session id, so every turn of one
/// conversation hits the same escalation state.
pub struct SafetyExecutor {
    engine: Arc<RiskEngine>,
    default_user_id: String,
}

impl SafetyExecutor {
    pub fn new(engine: Arc<RiskEngine>, default_user_id: impl Into<String>) -> Self {
        Self {
            engine,
            default_user_id: default_user_id.into(),
        }
    }
}

#[async_trait]
impl AgentExecutor for SafetyExecutor {
    async fn execute(&self, ctx: RequestContext, sink: EventSink) -> Result<()> {
        let task = match ctx.current_task() {
            Some(task) => task.clone(),
            None => {
                let task = ctx.new_task();
                sink.task(task.clone());
                task
            }
        };
        sink.working(&task);

        let (utterance, user_id) = decode_request(&ctx.user_input());
        let user_id = user_id.unwrap_or_else(|| self.default_user_id.clone());
        info!(%user_id, session_id = %task.context_id, "assessing utterance");

        match self.engine.assess(&user_id, &task.context_id, &utterance).await {
            Ok(assessment) => {
                let verdict = serde_json::to_string(&assessment)
                    .unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"));
                sink.task(Task::completed(
                    &task.id,
                    &task.context_id,
                    vec![Artifact::text(SAFETY_ARTIFACT, verdict)],
                    vec![ctx.message().clone()],
                ));
            }
            Err(e) => {
                // A missing context must fail the turn, never read as safe.
                sink.fail(&task.id, &task.context_id, e.to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::protocol::{Message, TaskEvent, TaskState};
    use crate::safety::context::{StaticContextProvider, UnavailableContextProvider};
    use crate::safety::engine::{RiskAssessment, SafetyAction};
    use crate::session::SessionStore;

    fn executor(engine: RiskEngine) -> SafetyExecutor {
        SafetyExecutor::new(Arc::new(engine), "default_user")
    }

    fn working_engine() -> RiskEngine {
        RiskEngine::new(Arc::new(StaticContextProvider), Arc::new(SessionStore::new()))
    }

    async fn run(executor: &SafetyExecutor, text: &str) -> Vec<TaskEvent> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let message = Message::user_text(text, Some("ctx-safety".to_string()));
        executor
            .execute(RequestContext::new(message, None), EventSink::new(tx))
            .await
            .unwrap();
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn decode_accepts_json_and_raw_text() {
        let (text, user) = decode_request(r#"{"user_text": "I fell", "user_id": "joe"}"#);
        assert_eq!(text, "I fell");
        assert_eq!(user.as_deref(), Some("joe"));

        let (text, user) = decode_request("just plain words");
        assert_eq!(text, "just plain words");
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn crisis_utterance_completes_with_verdict_artifact() {
        let executor = executor(working_engine());
        let events = run(&executor, "I think I fell down and I am in a lot of pain.").await;

        let TaskEvent::Task(last) = events.last().unwrap() else {
            panic!("expected a task snapshot");
        };
        assert_eq!(last.status.state, TaskState::Completed);
        assert_eq!(last.artifacts[0].name.as_deref(), Some(SAFETY_ARTIFACT));

        let verdict: RiskAssessment = serde_json::from_str(&last.artifact_text()).unwrap();
        assert_eq!(verdict.action, SafetyAction::ConfirmEmergency);
    }

    #[tokio::test]
    async fn context_failure_emits_failed_never_completed() {
        let engine = RiskEngine::new(
            Arc::new(UnavailableContextProvider {
                reason: "record store offline".to_string(),
            }),
            Arc::new(SessionStore::new()),
        );
        let events = run(&executor(engine), "hello").await;

        let terminal = events.iter().filter_map(TaskEvent::terminal_state).collect::<Vec<_>>();
        assert_eq!(terminal, vec![TaskState::Failed]);
    }
}
