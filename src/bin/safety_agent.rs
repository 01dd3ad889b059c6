//! Safety agent service.

use std::sync::Arc;
use std::time::Duration;

use care_assist::config::{LlmConfig, ServiceConfig};
use care_assist::llm::OllamaClient;
use care_assist::protocol::{AgentCard, AgentSkill};
use care_assist::safety::engine::LlmRiskRefiner;
use care_assist::safety::{RiskEngine, SafetyExecutor, StaticContextProvider};
use care_assist::server;
use care_assist::session::SessionStore;

/// How often idle sessions are swept, and how long one may sit idle.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);
const SESSION_IDLE_LIMIT: Duration = Duration::from_secs(24 * 60 * 60);

fn agent_card(url: String) -> AgentCard {
    AgentCard::new(
        "Safety Guardian Agent",
        "Monitors conversations for signs of crisis or distress and decides \
         when to escalate to an emergency contact.",
        url,
    )
    .with_skill(AgentSkill {
        id: "risk_assessment".to_string(),
        name: "Risk Assessment".to_string(),
        description: "Classifies an utterance into a risk level and chooses \
                      the next escalation step."
            .to_string(),
        examples: vec![
            "I think I fell down and I am in a lot of pain.".to_string(),
            "I feel so lonely tonight.".to_string(),
        ],
        tags: vec!["safety".to_string(), "escalation".to_string(), "monitoring".to_string()],
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServiceConfig::from_env(8080)?;
    let sessions = Arc::new(SessionStore::new());
    let mut engine = RiskEngine::new(Arc::new(StaticContextProvider), Arc::clone(&sessions));
    // Optional wording pass over the deterministic verdict.
    if std::env::var("SAFETY_LLM_REFINER").map(|v| v == "1").unwrap_or(false) {
        let llm = Arc::new(OllamaClient::new(&LlmConfig::from_env()));
        engine = engine.with_refiner(Arc::new(LlmRiskRefiner::new(llm)));
    }
    let executor = Arc::new(SafetyExecutor::new(Arc::new(engine), "default_user"));

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(SESSION_SWEEP_INTERVAL).await;
            let removed = sessions.prune_stale(SESSION_IDLE_LIMIT).await;
            if removed > 0 {
                tracing::debug!(removed, "pruned idle sessions");
            }
        }
    });

    eprintln!("Safety agent listening on {}", config.bind_addr);
    server::serve(agent_card(config.public_url()), executor, config.bind_addr).await?;
    Ok(())
}
