//! Orchestrator REPL.
//!
//! Reads user turns from stdin and runs each one through the safety →
//! memory → companion sequence against the running agent services.

use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use care_assist::config::OrchestratorConfig;
use care_assist::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = OrchestratorConfig::from_env()?;
    eprintln!("Connecting to agents...");
    eprintln!("  safety:    {}", config.safety_url);
    eprintln!("  memory:    {}", config.memory_url);
    eprintln!("  companion: {}", config.companion_url);

    let orchestrator = Orchestrator::connect(&config).await?;
    // One conversation per process run.
    let context_id = Uuid::new_v4().to_string();
    eprintln!("Ready. Type a message (Ctrl-D to quit).");

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    eprint!("> ");
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            eprint!("> ");
            continue;
        }
        let outcome = orchestrator.handle_turn(&context_id, line).await;
        println!("{}", outcome.reply);
        eprint!("> ");
    }
    Ok(())
}
