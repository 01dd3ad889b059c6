//! Emergency context lookup.
//!
//! The risk engine reads a static-per-user record of who to contact and how.
//! Retrieval failures surface as [`SafetyError::ContextUnavailable`]; the
//! engine never substitutes a default record.

use async_trait::async_trait;
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SafetyError};

/// How an emergency contact prefers to be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactMethod {
    Call,
    Message,
}

impl std::fmt::Display for ContactMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContactMethod::Call => write!(f, "call"),
            ContactMethod::Message => write!(f, "message"),
        }
    }
}

/// One emergency contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone: String,
    pub relation: String,
    pub preferred_method: ContactMethod,
}

/// Static-per-user record consumed by the risk engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContext {
    pub user_name: String,
    /// Local wall-clock time at retrieval, formatted `HH:MM`.
    pub current_time: String,
    pub location: String,
    /// Contacts in escalation order; the first one is called first.
    pub emergency_contacts: Vec<Contact>,
    pub medical_notes: String,
}

/// Source of emergency context records.
#[async_trait]
pub trait EmergencyContextProvider: Send + Sync {
    async fn emergency_context(&self, user_id: &str) -> Result<EmergencyContext>;
}

/// Serves one built-in household record for every user id.
pub struct StaticContextProvider;

#[async_trait]
impl EmergencyContextProvider for StaticContextProvider {
    async fn emergency_context(&self, _user_id: &str) -> Result<EmergencyContext> {
        Ok(EmergencyContext {
            user_name: "Grandpa Joe".to_string(),
            current_time: Local::now().format("%H:%M").to_string(),
            location: "Home - 123 Maple St".to_string(),
            emergency_contacts: vec![
                Contact {
                    name: "Tommy".to_string(),
                    phone: "555-0199".to_string(),
                    relation: "Grandson".to_string(),
                    preferred_method: ContactMethod::Call,
                },
                Contact {
                    name: "Dr. Smith".to_string(),
                    phone: "555-0900".to_string(),
                    relation: "Doctor".to_string(),
                    preferred_method: ContactMethod::Message,
                },
            ],
            medical_notes: "History of heart arrhythmia.".to_string(),
        })
    }
}

/// Provider that always fails, for exercising the fail-loud path.
pub struct UnavailableContextProvider {
    pub reason: String,
}

#[async_trait]
impl EmergencyContextProvider for UnavailableContextProvider {
    async fn emergency_context(&self, user_id: &str) -> Result<EmergencyContext> {
        Err(SafetyError::ContextUnavailable {
            user_id: user_id.to_string(),
            reason: self.reason.clone(),
        }
        .into())
    }
}
