//! Memory agent service.

use std::sync::Arc;

use care_assist::config::ServiceConfig;
use care_assist::memory::{MemoryBank, MemoryExecutor};
use care_assist::protocol::{AgentCard, AgentSkill};
use care_assist::server;

fn agent_card(url: String) -> AgentCard {
    AgentCard::new(
        "Memory Agent",
        "Remembers personal details, anecdotes and preferences, and recalls \
         the ones relevant to the current conversation.",
        url,
    )
    .with_skill(AgentSkill {
        id: "recall".to_string(),
        name: "Recall Memories".to_string(),
        description: "Retrieves stored details relevant to a query.".to_string(),
        examples: vec!["What did I say about Tommy?".to_string()],
        tags: vec!["memory".to_string(), "retrieval".to_string()],
    })
    .with_skill(AgentSkill {
        id: "store".to_string(),
        name: "Store Memories".to_string(),
        description: "Saves important details (names, events, preferences) \
                      for later recall."
            .to_string(),
        examples: vec!["Remember that Tommy visits on Sundays.".to_string()],
        tags: vec!["memory".to_string(), "storage".to_string()],
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

    let config = ServiceConfig::from_env(8082)?;
    let executor = Arc::new(MemoryExecutor::new(Arc::new(MemoryBank::new()), "default_user"));

    eprintln!("Memory agent listening on {}", config.bind_addr);
    server::serve(agent_card(config.public_url()), executor, config.bind_addr).await?;
    Ok(())
}
