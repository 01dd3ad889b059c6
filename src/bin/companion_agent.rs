//! Conversational companion agent service.

use std::sync::Arc;

use care_assist::companion::CompanionExecutor;
use care_assist::config::{LlmConfig, ServiceConfig};
use care_assist::llm::OllamaClient;
use care_assist::protocol::{AgentCard, AgentSkill};
use care_assist::server;

fn agent_card(url: String) -> AgentCard {
    AgentCard::new(
        "Warm Conversation Agent",
        "A conversational companion focused on empathetic, supportive \
         dialogue. Reflects user input, keeps a warm tone, and incorporates \
         prior memory context when provided.",
        url,
    )
    .with_skill(AgentSkill {
        id: "empathetic_chat".to_string(),
        name: "Empathetic Chat".to_string(),
        description: "Engages users in warm, emotionally supportive \
                      conversation with gentle prompts and compassionate \
                      language."
            .to_string(),
        examples: vec![
            "User shares a personal thought and expects a warm response".to_string(),
            "User wants casual, friendly conversation without advice".to_string(),
        ],
        tags: vec!["conversation".to_string(), "empathy".to_string(), "memory-aware".to_string()],
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

    let config = ServiceConfig::from_env(8081)?;
    let llm = Arc::new(OllamaClient::new(&LlmConfig::from_env()));
    let executor = Arc::new(CompanionExecutor::new(llm));

    eprintln!("Companion agent listening on {}", config.bind_addr);
    server::serve(agent_card(config.public_url()), executor, config.bind_addr).await?;
    Ok(())
}
