//! Agent discovery descriptors.

use serde::{Deserialize, Serialize};

/// Well-known path an agent serves its card under.
pub const AGENT_CARD_PATH: &str = "/.well-known/agent-card.json";

/// A discrete capability an agent advertises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSkill {
    /// Stable identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// What the skill does.
    pub description: String,
    /// Example utterances that exercise the skill.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub examples: Vec<String>,
    /// Free-form classification tags.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
}

/// Protocol capabilities an agent supports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentCapabilities {
    /// Whether the agent supports streaming task events.
    #[serde(default)]
    pub streaming: bool,
}

/// Static descriptor published by every agent for discovery.
///
/// Immutable after construction; clients fetch it from the well-known path
/// before sending any task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// Agent display name.
    pub name: String,
    /// What the agent does.
    pub description: String,
    /// Base URL tasks should be sent to.
    pub url: String,
    /// Agent version string.
    pub version: String,
    /// Input modalities accepted by default.
    pub default_input_modes: Vec<String>,
    /// Output modalities produced by default.
    pub default_output_modes: Vec<String>,
    /// Supported protocol capabilities.
    pub capabilities: AgentCapabilities,
    /// Skills the agent advertises.
    pub skills: Vec<AgentSkill>,
}

impl AgentCard {
    /// Card with text-only modalities and streaming enabled.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            url: url.into(),
            version: "1.0.0".to_string(),
            default_input_modes: vec!["text".to_string()],
            default_output_modes: vec!["text".to_string()],
            capabilities: AgentCapabilities { streaming: true },
            skills: Vec::new(),
        }
    }

    /// Add a skill to the card.
    pub fn with_skill(mut self, skill: AgentSkill) -> Self {
        self.skills.push(skill);
        self
    }
}
