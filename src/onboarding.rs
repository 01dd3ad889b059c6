//! Onboarding UI agent.
//!
//! Walks a new user through a four-screen setup flow (welcome → name →
//! interests → done) ending on a dashboard. Each user action advances a
//! per-conversation state machine; the resulting screen is emitted as an
//! ordered sequence of [`UiOp`]s inside a single `screen` artifact.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Result;
use crate::protocol::{Artifact, Part, Task};
use crate::server::{AgentExecutor, EventSink, RequestContext};
use crate::ui::{
    DataEntry, UiOp, body, button, card, column, row, submit_button, text, text_field,
};

/// Artifact name the onboarding agent attaches screens under.
pub const SCREEN_ARTIFACT: &str = "screen";

/// Action names the screens' buttons report.
pub const ACTION_START: &str = "start_onboarding";
pub const ACTION_SUBMIT_NAME: &str = "submit_name";
pub const ACTION_SUBMIT_INTERESTS: &str = "submit_interests";
pub const ACTION_FINISH: &str = "finish_onboarding";
pub const ACTION_RESTART: &str = "restart_onboarding";

/// A button press relayed by the renderer.
#[derive(Debug, Clone, Deserialize)]
pub struct UserAction {
    pub action: String,
    /// Data captured from the screen, shaped by the button's context path.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl UserAction {
    /// Decode a payload; anything that is not an action object restarts the
    /// flow from the welcome screen.
    pub fn decode(raw: &str) -> Self {
        match serde_json::from_str::<UserAction>(raw) {
            Ok(action) => action,
            Err(e) => {
                debug!(error = %e, "payload is not a user action, showing welcome screen");
                Self {
                    action: ACTION_RESTART.to_string(),
                    data: serde_json::Value::Null,
                }
            }
        }
    }

    fn submitted_name(&self) -> Option<String> {
        self.data
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

/// Where one conversation is in the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Welcome,
    NameInput,
    Interests,
    Complete,
    Dashboard,
}

/// The onboarding state machine for one conversation.
#[derive(Debug, Clone)]
pub struct OnboardingFlow {
    screen: Screen,
    user_name: String,
}

impl OnboardingFlow {
    pub fn new() -> Self {
        Self {
            screen: Screen::Welcome,
            user_name: "friend".to_string(),
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Advance on a user action and return the next screen's op sequence.
    ///
    /// Unrecognized actions re-render the current screen rather than losing
    /// the user's place.
    pub fn advance(&mut self, action: &UserAction) -> Vec<UiOp> {
        match action.action.as_str() {
            ACTION_START => self.screen = Screen::NameInput,
            ACTION_SUBMIT_NAME => {
                if let Some(name) = action.submitted_name() {
                    self.user_name = name;
                }
                self.screen = Screen::Interests;
            }
            ACTION_SUBMIT_INTERESTS => self.screen = Screen::Complete,
            ACTION_FINISH => self.screen = Screen::Dashboard,
            ACTION_RESTART => *self = Self::new(),
            other => {
                debug!(action = %other, "unrecognized action, re-rendering current screen");
            }
        }
        self.render()
    }

    /// Op sequence for the current screen.
    pub fn render(&self) -> Vec<UiOp> {
        match self.screen {
            Screen::Welcome => welcome_screen(),
            Screen::NameInput => name_input_screen(),
            Screen::Interests => interests_screen(&self.user_name),
            Screen::Complete => completion_screen(&self.user_name),
            Screen::Dashboard => dashboard_screen(&self.user_name),
        }
    }
}

impl Default for OnboardingFlow {
    fn default() -> Self {
        Self::new()
    }
}

// ── Screen builders ─────────────────────────────────────────────────────

fn welcome_screen() -> Vec<UiOp> {
    let components = vec![
        column("root", &["welcome-card"]),
        card("welcome-card", "welcome-content"),
        column("welcome-content", &["title", "subtitle", "description", "start-btn"]),
        text("title", "Welcome!", "h1"),
        text("subtitle", "Let's get you set up", "h2"),
        body(
            "description",
            "This quick onboarding will help us personalize your experience. It only takes a minute!",
        ),
        body("start-btn-text", "Get Started"),
        button("start-btn", "start-btn-text", ACTION_START),
    ];
    vec![UiOp::surface_update(components), UiOp::begin_rendering("root")]
}

fn name_input_screen() -> Vec<UiOp> {
    let components = vec![
        column("root", &["name-card"]),
        card("name-card", "name-content"),
        column("name-content", &["step-indicator", "title", "name-field", "next-btn"]),
        text("step-indicator", "Step 1 of 3", "caption"),
        text("title", "What's your name?", "h2"),
        text_field("name-field", "Your name", "/user/name", Some("Enter your full name")),
        body("next-btn-text", "Continue"),
        submit_button("next-btn", "next-btn-text", ACTION_SUBMIT_NAME, "/user"),
    ];
    vec![
        UiOp::surface_update(components),
        UiOp::data_model_update(vec![DataEntry::map("user", vec![DataEntry::string("name", "")])]),
        UiOp::begin_rendering("root"),
    ]
}

fn interests_screen(user_name: &str) -> Vec<UiOp> {
    let components = vec![
        column("root", &["interests-card"]),
        card("interests-card", "interests-content"),
        column(
            "interests-content",
            &[
                "step-indicator",
                "greeting",
                "title",
                "desc",
                "interests-row-1",
                "interests-row-2",
                "next-btn",
            ],
        ),
        text("step-indicator", "Step 2 of 3", "caption"),
        text("greeting", &format!("Nice to meet you, {user_name}!"), "h3"),
        text("title", "What interests you?", "h2"),
        body("desc", "Select topics you'd like to explore:"),
        row("interests-row-1", &["tech-btn", "design-btn"]),
        body("tech-text", "Technology"),
        submit_button("tech-btn", "tech-text", "toggle_interest", "/interests/technology"),
        body("design-text", "Design"),
        submit_button("design-btn", "design-text", "toggle_interest", "/interests/design"),
        row("interests-row-2", &["business-btn", "science-btn"]),
        body("business-text", "Business"),
        submit_button("business-btn", "business-text", "toggle_interest", "/interests/business"),
        body("science-text", "Science"),
        submit_button("science-btn", "science-text", "toggle_interest", "/interests/science"),
        body("next-btn-text", "Continue"),
        submit_button("next-btn", "next-btn-text", ACTION_SUBMIT_INTERESTS, "/interests"),
    ];
    vec![
        UiOp::surface_update(components),
        UiOp::data_model_update(vec![DataEntry::map(
            "interests",
            vec![
                DataEntry::boolean("technology", false),
                DataEntry::boolean("design", false),
                DataEntry::boolean("business", false),
                DataEntry::boolean("science", false),
            ],
        )]),
        UiOp::begin_rendering("root"),
    ]
}

fn completion_screen(user_name: &str) -> Vec<UiOp> {
    let components = vec![
        column("root", &["complete-card"]),
        card("complete-card", "complete-content"),
        column("complete-content", &["step-indicator", "title", "message", "finish-btn"]),
        text("step-indicator", "Step 3 of 3", "caption"),
        text("title", "You're all set!", "h1"),
        body(
            "message",
            &format!(
                "Welcome aboard, {user_name}! Your personalized experience is ready. \
                 We've tailored everything based on your interests."
            ),
        ),
        body("finish-btn-text", "Start Exploring"),
        button("finish-btn", "finish-btn-text", ACTION_FINISH),
    ];
    vec![UiOp::surface_update(components), UiOp::begin_rendering("root")]
}

fn dashboard_screen(user_name: &str) -> Vec<UiOp> {
    let components = vec![
        column("root", &["header", "content"]),
        text("header", &format!("Hello, {user_name}!"), "h1"),
        card("content", "content-inner"),
        column("content-inner", &["welcome-msg", "restart-btn"]),
        body(
            "welcome-msg",
            "This is your personalized dashboard. Explore and discover content tailored just for you!",
        ),
        body("restart-btn-text", "Restart Onboarding"),
        button("restart-btn", "restart-btn-text", ACTION_RESTART),
    ];
    vec![UiOp::surface_update(components), UiOp::begin_rendering("root")]
}

// ── Executor ────────────────────────────────────────────────────────────

/// Drives one [`OnboardingFlow`] per conversation.
pub struct OnboardingExecutor {
    flows: Arc<RwLock<HashMap<String, OnboardingFlow>>>,
}

impl OnboardingExecutor {
    pub fn new() -> Self {
        Self {
            flows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn screen_artifact(ops: &[UiOp]) -> Artifact {
        let parts = ops
            .iter()
            .map(|op| Part::Data {
                data: serde_json::to_value(op).unwrap_or(serde_json::Value::Null),
            })
            .collect();
        Artifact {
            artifact_id: Uuid::new_v4().to_string(),
            parts,
            name: Some(SCREEN_ARTIFACT.to_string()),
            description: None,
        }
    }
}

impl Default for OnboardingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentExecutor for OnboardingExecutor {
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

        let action = UserAction::decode(&ctx.user_input());
        let ops = {
            let mut flows = self.flows.write().await;
            let flow = flows.entry(task.context_id.clone()).or_default();
            let ops = flow.advance(&action);
            info!(action = %action.action, screen = ?flow.screen(), "onboarding advanced");
            ops
        };

        sink.task(Task::completed(
            &task.id,
            &task.context_id,
            vec![Self::screen_artifact(&ops)],
            vec![ctx.message().clone()],
        ));
        Ok(())
    }
}
