//! Onboarding UI agent service.

use std::sync::Arc;

use care_assist::config::ServiceConfig;
use care_assist::onboarding::OnboardingExecutor;
use care_assist::protocol::{AgentCard, AgentSkill};
use care_assist::server;

fn agent_card(url: String) -> AgentCard {
    AgentCard::new(
        "Onboarding Agent",
        "Guides new users through account setup with interactive screens \
         described as declarative component trees.",
        url,
    )
    .with_skill(AgentSkill {
        id: "onboarding_flow".to_string(),
        name: "Onboarding Flow".to_string(),
        description: "Walks the user through welcome, name, and interest \
                      screens, ending on a personalized dashboard."
            .to_string(),
        examples: vec!["Start onboarding".to_string()],
        tags: vec!["ui".to_string(), "onboarding".to_string()],
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

    let config = ServiceConfig::from_env(8083)?;
    let executor = Arc::new(OnboardingExecutor::new());

    eprintln!("Onboarding agent listening on {}", config.bind_addr);
    server::serve(agent_card(config.public_url()), executor, config.bind_addr).await?;
    Ok(())
}
