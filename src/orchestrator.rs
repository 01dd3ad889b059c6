//! Turn sequencing across the agents.
//!
//! Every user turn goes to the safety agent first, and nothing else runs
//! until its verdict is in. High-risk verdicts short-circuit the turn: the
//! serialized assessment is the output and neither memory nor companion is
//! consulted. Otherwise memory is queried best-effort and the companion
//! produces the visible reply; the turn is recorded back into memory without
//! blocking the response.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::client::AgentClient;
use crate::config::OrchestratorConfig;
use crate::error::Result;
use crate::memory::NO_MEMORY_FOUND;
use crate::safety::{RiskAssessment, RiskLevel, SafetyAction};

/// Reply when the turn cannot be completed.
pub const APOLOGY_REPLY: &str = "I'm having trouble thinking right now, dear.";

/// The orchestrator's verdict-dependent outcome for one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Text to show the user.
    pub reply: String,
    /// The safety verdict the turn was sequenced under, when one was
    /// obtained.
    pub assessment: Option<RiskAssessment>,
}

/// Sequences safety, memory and companion calls for each user turn.
pub struct Orchestrator {
    safety: Arc<AgentClient>,
    memory: Arc<AgentClient>,
    companion: Arc<AgentClient>,
    user_id: String,
}

impl Orchestrator {
    /// Resolve all three agent cards and build the orchestrator.
    pub async fn connect(config: &OrchestratorConfig) -> Result<Self> {
        let safety = AgentClient::connect(&config.safety_url)
            .await?
            .with_timeout(config.task_timeout);
        let memory = AgentClient::connect(&config.memory_url)
            .await?
            .with_timeout(config.task_timeout);
        let companion = AgentClient::connect(&config.companion_url)
            .await?
            .with_timeout(config.task_timeout);
        Ok(Self::new(safety, memory, companion, config.user_id.clone()))
    }

    pub fn new(
        safety: AgentClient,
        memory: AgentClient,
        companion: AgentClient,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            safety: Arc::new(safety),
            memory: Arc::new(memory),
            companion: Arc::new(companion),
            user_id: user_id.into(),
        }
    }

    /// Run one user turn to its user-visible reply.
    pub async fn handle_turn(&self, context_id: &str, user_text: &str) -> TurnOutcome {
        // Safety gates everything; a verdict failure fails the whole turn.
        let assessment = match self.check_safety(context_id, user_text).await {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(error = %e, "safety check failed, ending the turn");
                return TurnOutcome {
                    reply: APOLOGY_REPLY.to_string(),
                    assessment: None,
                };
            }
        };

        if assessment.risk_level == RiskLevel::High {
            info!(action = ?assessment.action, "high risk verdict, surfacing assessment");
            let reply = serde_json::to_string(&assessment)
                .unwrap_or_else(|_| APOLOGY_REPLY.to_string());
            return TurnOutcome {
                reply,
                assessment: Some(assessment),
            };
        }

        let memory_context = self.consult_memory(context_id, user_text).await;
        let reply = self
            .companion_reply(context_id, user_text, &memory_context, &assessment)
            .await;
        self.save_memory(context_id, user_text);

        TurnOutcome {
            reply,
            assessment: Some(assessment),
        }
    }

    /// Ask the safety agent for a verdict on this utterance.
    async fn check_safety(&self, context_id: &str, user_text: &str) -> Result<RiskAssessment> {
        let payload = json!({
            "user_text": user_text,
            "user_id": self.user_id,
        })
        .to_string();
        let outcome = self
            .safety
            .send_text(&payload, Some(context_id.to_string()))
            .await?;
        // An unreadable verdict is as fatal as no verdict: never guess safe.
        let assessment = serde_json::from_str(&outcome.text).map_err(|e| {
            crate::error::ClientError::Stream(format!("unreadable safety verdict: {e}"))
        })?;
        Ok(assessment)
    }

    /// Best-effort memory lookup; every failure reads as nothing found.
    async fn consult_memory(&self, context_id: &str, user_text: &str) -> String {
        let payload = json!({
            "action": "retrieve",
            "user_id": self.user_id,
            "query": user_text,
        })
        .to_string();
        match self.memory.send_text(&payload, Some(context_id.to_string())).await {
            Ok(outcome) => outcome.text,
            Err(e) => {
                debug!(error = %e, "memory lookup failed, continuing without context");
                NO_MEMORY_FOUND.to_string()
            }
        }
    }

    /// Required companion call; failure yields the apologetic fallback.
    async fn companion_reply(
        &self,
        context_id: &str,
        user_text: &str,
        memory_context: &str,
        assessment: &RiskAssessment,
    ) -> String {
        let payload = json!({
            "user_text": user_text,
            "memory_context": memory_context,
            "mood": mood_for(assessment),
        })
        .to_string();
        match self.companion.send_text(&payload, Some(context_id.to_string())).await {
            Ok(outcome) => outcome.text,
            Err(e) => {
                warn!(error = %e, "companion call failed, using apology reply");
                APOLOGY_REPLY.to_string()
            }
        }
    }

    /// Fire-and-forget write of the turn into memory.
    fn save_memory(&self, context_id: &str, user_text: &str) {
        let memory = Arc::clone(&self.memory);
        let payload = json!({
            "action": "store",
            "user_id": self.user_id,
            "data": user_text,
        })
        .to_string();
        let context_id = context_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = memory.send_text(&payload, Some(context_id)).await {
                debug!(error = %e, "background memory write failed");
            }
        });
    }
}

/// Mood hint the companion receives alongside the user's words.
fn mood_for(assessment: &RiskAssessment) -> &'static str {
    match assessment.action {
        SafetyAction::OfferSupport => "supportive",
        _ => "calm",
    }
}
