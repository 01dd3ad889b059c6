//! Risk classification and escalation.
//!
//! The engine runs a deterministic lexicon scan layered with a per-session
//! escalation overlay: once a turn asks the user to confirm an emergency,
//! the next turn is interpreted against the affirmative and negative reply
//! lexicons before any fresh classification happens. A language-model
//! refiner can reword the verdict's text but never change the verdict.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PayloadError, Result, SafetyError};
use crate::llm::LlmClient;
use crate::safety::context::{Contact, ContactMethod, EmergencyContext, EmergencyContextProvider};
use crate::safety::lexicon;
use crate::session::SessionStore;

/// Urgency classification of one utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Next step chosen by the escalation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyAction {
    ContinueCalm,
    OfferSupport,
    ConfirmEmergency,
    ExecuteAction,
    StayPresentMonitor,
}

/// Verdict produced for one user utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub action: SafetyAction,
    pub reason: String,
    /// Present only when `action` is `execute_action`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ContactMethod>,
    /// The contact chosen for `execute_action`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_suggestion: Option<String>,
}

impl RiskAssessment {
    /// No keyword matched.
    pub fn stable() -> Self {
        Self {
            risk_level: RiskLevel::Low,
            action: SafetyAction::ContinueCalm,
            reason: "User appears stable.".to_string(),
            method: None,
            contact: None,
            response_suggestion: None,
        }
    }

    /// A distress keyword matched without any crisis keyword.
    pub fn distress(keyword: &str) -> Self {
        Self {
            risk_level: RiskLevel::Medium,
            action: SafetyAction::OfferSupport,
            reason: format!("Detected distress keyword: {keyword}."),
            method: None,
            contact: None,
            response_suggestion: Some(
                "I'm sorry you're feeling this way. I'm right here with you.".to_string(),
            ),
        }
    }

    /// First crisis signal in this session; ask before escalating.
    pub fn confirm_emergency(keyword: &str) -> Self {
        Self {
            risk_level: RiskLevel::High,
            action: SafetyAction::ConfirmEmergency,
            reason: format!("Detected crisis keyword: {keyword}. Seeking confirmation."),
            method: None,
            contact: None,
            response_suggestion: Some(
                "I am concerned about what you just said. Do you need help right now?".to_string(),
            ),
        }
    }

    /// The confirmation question is still unanswered; ask again.
    pub fn reassert_confirmation() -> Self {
        Self {
            risk_level: RiskLevel::High,
            action: SafetyAction::ConfirmEmergency,
            reason: "Awaiting emergency confirmation. Asking again.".to_string(),
            method: None,
            contact: None,
            response_suggestion: Some(
                "I still need to know you are safe. Do you need help right now?".to_string(),
            ),
        }
    }

    /// The user confirmed; escalate to the chosen contact.
    pub fn execute(contact: &Contact) -> Self {
        Self {
            risk_level: RiskLevel::High,
            action: SafetyAction::ExecuteAction,
            reason: format!(
                "User confirmed emergency. Contacting {} via {}.",
                contact.name, contact.preferred_method
            ),
            method: Some(contact.preferred_method),
            contact: Some(contact.clone()),
            response_suggestion: Some(
                "I am concerned about what you just said. I am notifying your emergency \
                 contact immediately. Please stay on the line."
                    .to_string(),
            ),
        }
    }

    /// The user declined; keep watching without escalating.
    pub fn stay_present() -> Self {
        Self {
            risk_level: RiskLevel::High,
            action: SafetyAction::StayPresentMonitor,
            reason: "User declined escalation. Staying present and monitoring.".to_string(),
            method: None,
            contact: None,
            response_suggestion: Some(
                "Alright, I will stay right here with you. Tell me if anything changes."
                    .to_string(),
            ),
        }
    }
}

/// Deterministic classification of one utterance.
///
/// Pure in its inputs: the same utterance against the same context and
/// pending flag always yields the same assessment and next flag value.
/// Returns the assessment plus the pending-confirmation flag the session
/// should carry into the next turn.
pub fn classify(
    user_id: &str,
    utterance: &str,
    context: &EmergencyContext,
    pending_confirmation: bool,
) -> Result<(RiskAssessment, bool)> {
    if pending_confirmation {
        if lexicon::is_affirmative(utterance) {
            // First contact in declared order wins; its preferred method is
            // used verbatim.
            let contact = context.emergency_contacts.first().ok_or_else(|| {
                SafetyError::ContextUnavailable {
                    user_id: user_id.to_string(),
                    reason: "no emergency contacts on record".to_string(),
                }
            })?;
            return Ok((RiskAssessment::execute(contact), false));
        }
        if lexicon::is_negative(utterance) {
            return Ok((RiskAssessment::stay_present(), false));
        }
        // Neither lexicon matched. Never fall back to calm while the
        // question is open; ask again and keep the flag set.
        return Ok((RiskAssessment::reassert_confirmation(), true));
    }

    if let Some(keyword) = lexicon::crisis_match(utterance) {
        return Ok((RiskAssessment::confirm_emergency(keyword), true));
    }
    if let Some(keyword) = lexicon::distress_match(utterance) {
        return Ok((RiskAssessment::distress(keyword), false));
    }
    Ok((RiskAssessment::stable(), false))
}

// ── Refinement ──────────────────────────────────────────────────────────

/// Optional wording pass layered over the deterministic verdict.
///
/// A refiner may rewrite `reason` and `response_suggestion` only. The engine
/// discards any result that changes `risk_level` or `action`.
#[async_trait]
pub trait RiskRefiner: Send + Sync {
    async fn refine(
        &self,
        utterance: &str,
        history: &[String],
        assessment: &RiskAssessment,
    ) -> Result<RiskAssessment>;
}

#[derive(Deserialize)]
struct RefinedWording {
    reason: Option<String>,
    response_suggestion: Option<String>,
}

/// Refiner that asks a language model to reword the assessment text.
pub struct LlmRiskRefiner {
    llm: Arc<dyn LlmClient>,
}

impl LlmRiskRefiner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl RiskRefiner for LlmRiskRefiner {
    async fn refine(
        &self,
        utterance: &str,
        history: &[String],
        assessment: &RiskAssessment,
    ) -> Result<RiskAssessment> {
        let assessment_json = serde_json::to_string(assessment)
            .map_err(|e| PayloadError::Malformed(e.to_string()))?;
        let prompt = format!(
            "You support a safety monitor for an older adult. The risk verdict \
             below is already decided and must not change. Reword only the text \
             so it is clear and calm. Output JSON ONLY with exactly the keys \
             \"reason\" and \"response_suggestion\".\n\n\
             Utterance: {utterance}\n\
             Recent turns: {}\n\
             Verdict: {assessment_json}\n",
            history.join(" | "),
        );
        let output = self.llm.generate(&prompt).await?;
        let json = extract_json(&output).ok_or_else(|| {
            PayloadError::Malformed("refiner output contained no JSON object".to_string())
        })?;
        let wording: RefinedWording = serde_json::from_str(json)
            .map_err(|e| PayloadError::Malformed(format!("refiner output: {e}")))?;

        let mut refined = assessment.clone();
        if let Some(reason) = wording.reason {
            refined.reason = reason;
        }
        if let Some(suggestion) = wording.response_suggestion {
            refined.response_suggestion = Some(suggestion);
        }
        Ok(refined)
    }
}

/// Slice covering the first JSON object in a model's output, if any.
fn extract_json(output: &str) -> Option<&str> {
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&output[start..=end])
}

// ── Engine ──────────────────────────────────────────────────────────────

/// The safety decision core.
///
/// Fetches the user's emergency context, runs the classification under the
/// session lock, and applies the resulting pending-confirmation flag. Context
/// retrieval failures propagate; they are never downgraded to a safe verdict.
pub struct RiskEngine {
    contexts: Arc<dyn EmergencyContextProvider>,
    sessions: Arc<SessionStore>,
    refiner: Option<Arc<dyn RiskRefiner>>,
}

impl RiskEngine {
    pub fn new(contexts: Arc<dyn EmergencyContextProvider>, sessions: Arc<SessionStore>) -> Self {
        Self {
            contexts,
            sessions,
            refiner: None,
        }
    }

    /// Attach a wording refiner.
    pub fn with_refiner(mut self, refiner: Arc<dyn RiskRefiner>) -> Self {
        self.refiner = Some(refiner);
        self
    }

    /// Assess one utterance for one session.
    pub async fn assess(
        &self,
        user_id: &str,
        session_id: &str,
        utterance: &str,
    ) -> Result<RiskAssessment> {
        let context = self.contexts.emergency_context(user_id).await?;
        let session = self.sessions.get_or_create(user_id, session_id).await;
        let mut session = session.lock().await;

        let (mut assessment, pending_next) =
            classify(user_id, utterance, &context, session.pending_confirmation())?;

        if let Some(refiner) = &self.refiner {
            match refiner.refine(utterance, session.history(), &assessment).await {
                Ok(refined)
                    if refined.risk_level == assessment.risk_level
                        && refined.action == assessment.action =>
                {
                    assessment = refined;
                }
                Ok(_) => {
                    warn!(%user_id, %session_id, "refiner altered the verdict, keeping the deterministic one");
                }
                Err(e) => {
                    warn!(%user_id, %session_id, error = %e, "risk refinement failed, keeping the deterministic assessment");
                }
            }
        }

        session.set_pending_confirmation(pending_next);
        session.record_turn(utterance);

        if assessment.risk_level == RiskLevel::High {
            warn!(%user_id, %session_id, reason = %assessment.reason, "high risk detected");
        } else {
            debug!(%user_id, %session_id, reason = %assessment.reason, "utterance assessed");
        }
        Ok(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::safety::context::{StaticContextProvider, UnavailableContextProvider};

    async fn test_context() -> EmergencyContext {
        StaticContextProvider
            .emergency_context("default_user")
            .await
            .unwrap()
    }

    fn engine() -> RiskEngine {
        RiskEngine::new(Arc::new(StaticContextProvider), Arc::new(SessionStore::new()))
    }

    // ── Classification layer ────────────────────────────────────────────

    #[tokio::test]
    async fn fall_report_asks_for_confirmation() {
        let context = test_context().await;
        let (assessment, pending) = classify(
            "joe",
            "I think I fell down and I am in a lot of pain.",
            &context,
            false,
        )
        .unwrap();
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert_eq!(assessment.action, SafetyAction::ConfirmEmergency);
        assert!(assessment.reason.contains("fell"));
        assert!(pending);
    }

    #[tokio::test]
    async fn casual_chat_stays_calm() {
        let context = test_context().await;
        let (assessment, pending) = classify(
            "joe",
            "I am planning to visit my grandson tomorrow.",
            &context,
            false,
        )
        .unwrap();
        assert_eq!(assessment.risk_level, RiskLevel::Low);
        assert_eq!(assessment.action, SafetyAction::ContinueCalm);
        assert_eq!(assessment.reason, "User appears stable.");
        assert!(!pending);
    }

    #[tokio::test]
    async fn distress_without_crisis_offers_support() {
        let context = test_context().await;
        let (assessment, pending) =
            classify("joe", "I feel so lonely tonight", &context, false).unwrap();
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
        assert_eq!(assessment.action, SafetyAction::OfferSupport);
        assert!(!pending);
    }

    #[tokio::test]
    async fn affirmative_reply_executes_with_first_contact() {
        let context = test_context().await;
        let (assessment, pending) = classify("joe", "yes please help", &context, true).unwrap();
        assert_eq!(assessment.action, SafetyAction::ExecuteAction);
        assert_eq!(assessment.method, Some(ContactMethod::Call));
        assert_eq!(assessment.contact.as_ref().unwrap().name, "Tommy");
        assert!(!pending);
    }

    #[tokio::test]
    async fn negative_reply_stays_present() {
        let context = test_context().await;
        let (assessment, pending) = classify("joe", "no, I'm fine", &context, true).unwrap();
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert_eq!(assessment.action, SafetyAction::StayPresentMonitor);
        assert!(!pending);
    }

    #[tokio::test]
    async fn unrelated_reply_reasserts_confirmation() {
        let context = test_context().await;
        let (assessment, pending) =
            classify("joe", "what is the weather like", &context, true).unwrap();
        assert_eq!(assessment.action, SafetyAction::ConfirmEmergency);
        assert!(pending, "flag must stay set until the question is answered");
    }

    #[tokio::test]
    async fn classification_is_idempotent() {
        let context = test_context().await;
        let first = classify("joe", "I fell in the kitchen", &context, false).unwrap();
        let second = classify("joe", "I fell in the kitchen", &context, false).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn affirmative_without_contacts_fails_loud() {
        let mut context = test_context().await;
        context.emergency_contacts.clear();
        let err = classify("joe", "yes", &context, true).unwrap_err();
        match err {
            Error::Safety(SafetyError::ContextUnavailable { reason, .. }) => {
                assert!(reason.contains("no emergency contacts"));
            }
            other => panic!("expected context unavailable, got {other:?}"),
        }
    }

    #[test]
    fn assessment_wire_shape() {
        let contact = Contact {
            name: "Tommy".to_string(),
            phone: "555-0199".to_string(),
            relation: "Grandson".to_string(),
            preferred_method: ContactMethod::Call,
        };
        let json = serde_json::to_value(RiskAssessment::execute(&contact)).unwrap();
        assert_eq!(json["risk_level"], "HIGH");
        assert_eq!(json["action"], "execute_action");
        assert_eq!(json["method"], "call");
        assert_eq!(json["contact"]["name"], "Tommy");

        let calm = serde_json::to_value(RiskAssessment::stable()).unwrap();
        assert_eq!(calm["risk_level"], "LOW");
        assert_eq!(calm["action"], "continue_calm");
        assert!(calm.get("method").is_none());
    }

    // ── Engine ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn escalation_flow_across_turns() {
        let engine = engine();

        let first = engine.assess("joe", "s-1", "I fell and it hurts").await.unwrap();
        assert_eq!(first.action, SafetyAction::ConfirmEmergency);

        let second = engine.assess("joe", "s-1", "yes please help").await.unwrap();
        assert_eq!(second.action, SafetyAction::ExecuteAction);
        assert_eq!(second.method, Some(ContactMethod::Call));

        // Flag was cleared by the resolution.
        let third = engine.assess("joe", "s-1", "thank you dear").await.unwrap();
        assert_eq!(third.action, SafetyAction::ContinueCalm);
    }

    #[tokio::test]
    async fn sessions_do_not_share_pending_state() {
        let engine = engine();
        engine.assess("joe", "s-1", "I fell").await.unwrap();

        // A different session sees no pending confirmation.
        let other = engine.assess("joe", "s-2", "yes").await.unwrap();
        assert_eq!(other.action, SafetyAction::ContinueCalm);
    }

    #[tokio::test]
    async fn context_failure_propagates() {
        let engine = RiskEngine::new(
            Arc::new(UnavailableContextProvider {
                reason: "record store offline".to_string(),
            }),
            Arc::new(SessionStore::new()),
        );
        let err = engine.assess("joe", "s-1", "hello").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Safety(SafetyError::ContextUnavailable { .. })
        ));
    }

    // ── Refinement ──────────────────────────────────────────────────────

    struct RewordingRefiner;

    #[async_trait]
    impl RiskRefiner for RewordingRefiner {
        async fn refine(
            &self,
            _utterance: &str,
            _history: &[String],
            assessment: &RiskAssessment,
        ) -> Result<RiskAssessment> {
            let mut refined = assessment.clone();
            refined.reason = "reworded".to_string();
            Ok(refined)
        }
    }

    struct SofteningRefiner;

    #[async_trait]
    impl RiskRefiner for SofteningRefiner {
        async fn refine(
            &self,
            _utterance: &str,
            _history: &[String],
            _assessment: &RiskAssessment,
        ) -> Result<RiskAssessment> {
            Ok(RiskAssessment::stable())
        }
    }

    struct BrokenRefiner;

    #[async_trait]
    impl RiskRefiner for BrokenRefiner {
        async fn refine(
            &self,
            _utterance: &str,
            _history: &[String],
            _assessment: &RiskAssessment,
        ) -> Result<RiskAssessment> {
            Err(PayloadError::Malformed("model said nothing useful".to_string()).into())
        }
    }

    #[tokio::test]
    async fn refiner_may_reword_but_not_soften() {
        let reworded = engine()
            .with_refiner(Arc::new(RewordingRefiner))
            .assess("joe", "s-1", "I fell")
            .await
            .unwrap();
        assert_eq!(reworded.reason, "reworded");
        assert_eq!(reworded.action, SafetyAction::ConfirmEmergency);

        let kept = engine()
            .with_refiner(Arc::new(SofteningRefiner))
            .assess("joe", "s-1", "I fell")
            .await
            .unwrap();
        assert_eq!(kept.action, SafetyAction::ConfirmEmergency);
        assert_eq!(kept.risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn refiner_failure_keeps_deterministic_assessment() {
        let assessment = engine()
            .with_refiner(Arc::new(BrokenRefiner))
            .assess("joe", "s-1", "I fell")
            .await
            .unwrap();
        assert_eq!(assessment.action, SafetyAction::ConfirmEmergency);
    }

    #[test]
    fn extract_json_finds_embedded_object() {
        assert_eq!(
            extract_json("Sure! {\"reason\": \"ok\"} there you go"),
            Some("{\"reason\": \"ok\"}")
        );
        assert_eq!(extract_json("no json here"), None);
    }
}
