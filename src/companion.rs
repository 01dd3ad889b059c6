//! Conversational companion agent.
//!
//! Generates warm, brief replies for the user. The orchestrator sends a JSON
//! payload carrying the user's words plus whatever memory context it found;
//! a payload that fails to parse is treated as the raw utterance. The agent
//! never fails a task over the language model: any generation problem falls
//! back to a fixed reassuring line.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::llm::LlmClient;
use crate::protocol::{Artifact, Task};
use crate::server::{AgentExecutor, EventSink, RequestContext};

/// Artifact name the companion attaches its reply under.
pub const RESPONSE_ARTIFACT: &str = "response";

/// Line returned when the language model is unreachable or errors out.
pub const FALLBACK_REPLY: &str = "I'm here with you. Tell me more, dear.";

/// Line returned when the model produces an empty completion.
const EMPTY_REPLY: &str = "I'm here with you.";

/// Structured companion request, as the orchestrator sends it.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CompanionRequest {
    /// What the user said this turn.
    #[serde(default)]
    pub user_text: String,
    /// Personal details retrieved from the memory agent, if any.
    #[serde(default)]
    pub memory_context: String,
    /// Mood hint derived from the safety verdict.
    #[serde(default)]
    pub mood: String,
}

impl CompanionRequest {
    /// Decode a payload, falling back to raw text when it is not the
    /// expected JSON object.
    pub fn decode(raw: &str) -> Self {
        match serde_json::from_str::<CompanionRequest>(raw) {
            Ok(request) if !request.user_text.is_empty() => request,
            Ok(_) | Err(_) => {
                debug!("payload is not a companion request object, using raw text");
                Self {
                    user_text: raw.to_string(),
                    ..Self::default()
                }
            }
        }
    }
}

fn build_prompt(request: &CompanionRequest) -> String {
    format!(
        "You are a warm, empathetic companion for an older adult. \
         Reply gently, briefly, and encouragingly.\n\n\
         User: {}\n\
         Memory context: {}\n\
         Mood: {}\n\
         Assistant:",
        request.user_text, request.memory_context, request.mood
    )
}

/// Produces the companion reply for one task.
pub struct CompanionExecutor {
    llm: Arc<dyn LlmClient>,
}

impl CompanionExecutor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    async fn reply(&self, request: &CompanionRequest) -> String {
        match self.llm.generate(&build_prompt(request)).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => EMPTY_REPLY.to_string(),
            Err(e) => {
                warn!(error = %e, "companion generation failed, using fallback reply");
                FALLBACK_REPLY.to_string()
            }
        }
    }
}

#[async_trait]
impl AgentExecutor for CompanionExecutor {
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

        let request = CompanionRequest::decode(&ctx.user_input());
        info!(user_text = %request.user_text, "generating companion reply");
        let reply = self.reply(&request).await;

        sink.task(Task::completed(
            &task.id,
            &task.context_id,
            vec![Artifact::text(RESPONSE_ARTIFACT, reply)],
            vec![ctx.message().clone()],
        ));
        Ok(())
    }
}
