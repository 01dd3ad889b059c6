//! End-to-end escalation scenarios.
//!
//! Spins up real safety, memory and companion agent services on random ports
//! and drives whole turns through the orchestrator: calm chat, distress,
//! crisis confirmation, context outages and agent timeouts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::time::timeout;

use care_assist::client::AgentClient;
use care_assist::companion::CompanionExecutor;
use care_assist::error::{ClientError, Error, Result};
use care_assist::llm::LlmClient;
use care_assist::memory::{MemoryBank, MemoryExecutor};
use care_assist::orchestrator::{APOLOGY_REPLY, Orchestrator};
use care_assist::protocol::AgentCard;
use care_assist::safety::{
    ContactMethod, RiskAssessment, RiskEngine, RiskLevel, SafetyAction, SafetyExecutor,
    StaticContextProvider,
};
use care_assist::safety::context::UnavailableContextProvider;
use care_assist::server::{self, AgentExecutor, EventSink, RequestContext};
use care_assist::session::SessionStore;

const TEST_TIMEOUT: Duration = Duration::from_secs(10);
const STUB_REPLY: &str = "That sounds lovely, dear.";

/// Canned LLM so companion turns need no model server.
struct StubLlm;

#[async_trait]
impl LlmClient for StubLlm {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(STUB_REPLY.to_string())
    }
}

/// Never reaches a terminal event; used to exercise client timeouts.
struct StallingExecutor;

#[async_trait]
impl AgentExecutor for StallingExecutor {
    async fn execute(&self, ctx: RequestContext, sink: EventSink) -> Result<()> {
        let task = ctx.new_task();
        sink.task(task.clone());
        sink.working(&task);
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

async fn start_agent(name: &str, executor: Arc<dyn AgentExecutor>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());
    let card = AgentCard::new(name, "test agent", url.clone());
    let app = server::app(card, executor);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    url
}

fn safety_executor() -> Arc<SafetyExecutor> {
    let engine = RiskEngine::new(Arc::new(StaticContextProvider), Arc::new(SessionStore::new()));
    Arc::new(SafetyExecutor::new(Arc::new(engine), "default_user"))
}

/// Full agent fleet plus a handle on the memory bank.
async fn start_fleet() -> (Orchestrator, Arc<MemoryBank>) {
    let bank = Arc::new(MemoryBank::new());
    let safety_url = start_agent("Safety", safety_executor()).await;
    let memory_url = start_agent(
        "Memory",
        Arc::new(MemoryExecutor::new(Arc::clone(&bank), "default_user")),
    )
    .await;
    let companion_url = start_agent(
        "Companion",
        Arc::new(CompanionExecutor::new(Arc::new(StubLlm))),
    )
    .await;

    let orchestrator = Orchestrator::new(
        AgentClient::connect(&safety_url).await.unwrap(),
        AgentClient::connect(&memory_url).await.unwrap(),
        AgentClient::connect(&companion_url).await.unwrap(),
        "default_user",
    );
    (orchestrator, bank)
}

#[tokio::test]
async fn calm_turn_flows_through_companion() {
    timeout(TEST_TIMEOUT, async {
        let (orchestrator, bank) = start_fleet().await;

        let outcome = orchestrator
            .handle_turn("ctx-calm", "I am planning to visit my grandson tomorrow.")
            .await;

        let assessment = outcome.assessment.unwrap();
        assert_eq!(assessment.risk_level, RiskLevel::Low);
        assert_eq!(assessment.action, SafetyAction::ContinueCalm);
        assert_eq!(outcome.reply, STUB_REPLY);

        // The turn is written back to memory without blocking the reply.
        let mut saved = bank.len("default_user").await;
        for _ in 0..50 {
            if saved > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            saved = bank.len("default_user").await;
        }
        assert_eq!(saved, 1);
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn crisis_turn_surfaces_the_assessment() {
    timeout(TEST_TIMEOUT, async {
        let (orchestrator, _bank) = start_fleet().await;

        let outcome = orchestrator
            .handle_turn("ctx-crisis", "I think I fell down and I am in a lot of pain.")
            .await;

        let assessment = outcome.assessment.unwrap();
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert_eq!(assessment.action, SafetyAction::ConfirmEmergency);

        // The reply is the verdict itself, not a companion line.
        let surfaced: RiskAssessment = serde_json::from_str(&outcome.reply).unwrap();
        assert_eq!(surfaced.action, SafetyAction::ConfirmEmergency);
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn confirmed_emergency_escalates_to_first_contact() {
    timeout(TEST_TIMEOUT, async {
        let (orchestrator, _bank) = start_fleet().await;
        let context = "ctx-escalate";

        let first = orchestrator.handle_turn(context, "I fell and it hurts").await;
        assert_eq!(first.assessment.unwrap().action, SafetyAction::ConfirmEmergency);

        let second = orchestrator.handle_turn(context, "yes please help").await;
        let assessment = second.assessment.unwrap();
        assert_eq!(assessment.action, SafetyAction::ExecuteAction);
        assert_eq!(assessment.method, Some(ContactMethod::Call));
        assert_eq!(assessment.contact.unwrap().name, "Tommy");
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn declined_emergency_stays_present() {
    timeout(TEST_TIMEOUT, async {
        let (orchestrator, _bank) = start_fleet().await;
        let context = "ctx-decline";

        orchestrator.handle_turn(context, "there is blood").await;
        let outcome = orchestrator.handle_turn(context, "no, I'm fine").await;

        let assessment = outcome.assessment.unwrap();
        assert_eq!(assessment.action, SafetyAction::StayPresentMonitor);
        assert_eq!(assessment.risk_level, RiskLevel::High);
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn context_outage_fails_the_turn_never_reads_safe() {
    timeout(TEST_TIMEOUT, async {
        let engine = RiskEngine::new(
            Arc::new(UnavailableContextProvider {
                reason: "record store offline".to_string(),
            }),
            Arc::new(SessionStore::new()),
        );
        let safety_url = start_agent(
            "Safety",
            Arc::new(SafetyExecutor::new(Arc::new(engine), "default_user")),
        )
        .await;

        // The raw client sees a failed task carrying the reason.
        let client = AgentClient::connect(&safety_url).await.unwrap();
        let err = client.send_text("hello", None).await.unwrap_err();
        match err {
            Error::Client(ClientError::TaskFailed { reason }) => {
                assert!(reason.contains("record store offline"), "reason was {reason:?}");
            }
            other => panic!("expected task failure, got {other:?}"),
        }

        // Through the orchestrator the turn ends with the apology, with no
        // verdict claimed.
        let bank = Arc::new(MemoryBank::new());
        let memory_url =
            start_agent("Memory", Arc::new(MemoryExecutor::new(bank, "default_user"))).await;
        let companion_url = start_agent(
            "Companion",
            Arc::new(CompanionExecutor::new(Arc::new(StubLlm))),
        )
        .await;
        let orchestrator = Orchestrator::new(
            AgentClient::connect(&safety_url).await.unwrap(),
            AgentClient::connect(&memory_url).await.unwrap(),
            AgentClient::connect(&companion_url).await.unwrap(),
            "default_user",
        );
        let outcome = orchestrator.handle_turn("ctx-outage", "hello").await;
        assert_eq!(outcome.reply, APOLOGY_REPLY);
        assert!(outcome.assessment.is_none());
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn safety_timeout_ends_the_turn() {
    timeout(TEST_TIMEOUT, async {
        let safety_url = start_agent("Safety", Arc::new(StallingExecutor)).await;
        let memory_url = start_agent(
            "Memory",
            Arc::new(MemoryExecutor::new(Arc::new(MemoryBank::new()), "default_user")),
        )
        .await;
        let companion_url = start_agent(
            "Companion",
            Arc::new(CompanionExecutor::new(Arc::new(StubLlm))),
        )
        .await;

        let orchestrator = Orchestrator::new(
            AgentClient::connect(&safety_url)
                .await
                .unwrap()
                .with_timeout(Duration::from_millis(300)),
            AgentClient::connect(&memory_url).await.unwrap(),
            AgentClient::connect(&companion_url).await.unwrap(),
            "default_user",
        );

        let outcome = orchestrator.handle_turn("ctx-stall", "hello").await;
        assert_eq!(outcome.reply, APOLOGY_REPLY);
        assert!(outcome.assessment.is_none());
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn memory_timeout_is_swallowed() {
    timeout(TEST_TIMEOUT, async {
        let safety_url = start_agent("Safety", safety_executor()).await;
        let memory_url = start_agent("Memory", Arc::new(StallingExecutor)).await;
        let companion_url = start_agent(
            "Companion",
            Arc::new(CompanionExecutor::new(Arc::new(StubLlm))),
        )
        .await;

        let orchestrator = Orchestrator::new(
            AgentClient::connect(&safety_url).await.unwrap(),
            AgentClient::connect(&memory_url)
                .await
                .unwrap()
                .with_timeout(Duration::from_millis(300)),
            AgentClient::connect(&companion_url).await.unwrap(),
            "default_user",
        );

        // The visible reply still comes from the companion.
        let outcome = orchestrator.handle_turn("ctx-slow-mem", "good morning").await;
        assert_eq!(outcome.reply, STUB_REPLY);
        assert_eq!(outcome.assessment.unwrap().action, SafetyAction::ContinueCalm);
    })
    .await
    .unwrap();
}
