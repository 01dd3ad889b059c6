//! Safety monitoring.
//!
//! The risk engine classifies each user utterance against fixed lexicons and
//! an escalation state machine kept per session. [`executor::SafetyExecutor`]
//! mounts the engine behind the shared agent service skeleton.

pub mod context;
pub mod engine;
pub mod executor;
pub mod lexicon;

pub use context::{
    Contact, ContactMethod, EmergencyContext, EmergencyContextProvider, StaticContextProvider,
};
pub use engine::{RiskAssessment, RiskEngine, RiskLevel, RiskRefiner, SafetyAction};
pub use executor::SafetyExecutor;
