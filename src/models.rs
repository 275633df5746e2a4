//! Data models for agents, swarms and the results handed back to callers.
//!
//! Field names serialize in camelCase so the JSON files stay readable by
//! the web front-end that shares the same storage directory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Maximum length of an agent name, in characters.
pub const AGENT_NAME_MAX: usize = 50;
/// Minimum length of an agent description, in characters.
pub const AGENT_DESCRIPTION_MIN: usize = 10;
/// Minimum length of an agent system prompt, in characters.
pub const SYSTEM_PROMPT_MIN: usize = 50;
/// Minimum length of a swarm's supervisor prompt, in characters.
pub const MAIN_PROMPT_MIN: usize = 20;

/// Kind of input an agent expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Text,
    File,
    Json,
    None,
}

/// Kind of output an agent produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    #[default]
    Text,
    File,
    Json,
    Display,
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputType::Text => write!(f, "text"),
            InputType::File => write!(f, "file"),
            InputType::Json => write!(f, "json"),
            InputType::None => write!(f, "none"),
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputType::Text => write!(f, "text"),
            OutputType::File => write!(f, "file"),
            OutputType::Json => write!(f, "json"),
            OutputType::Display => write!(f, "display"),
        }
    }
}

/// Expected input/output shape of an agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IoSpec {
    #[serde(default)]
    pub input_type: InputType,
    #[serde(default)]
    pub output_type: OutputType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_description: Option<String>,
    /// Accepted file extensions including the dot, e.g. `.csv`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_file_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_input: Option<String>,
}

impl IoSpec {
    /// Whether a file with the given name may be handed to the agent.
    ///
    /// Without an extension list every file is accepted.
    pub fn accepts_file(&self, file_name: &str) -> bool {
        let Some(ref accepted) = self.accepted_file_types else {
            return true;
        };

        let ext = match file_name.rsplit_once('.') {
            Some((_, ext)) => format!(".{}", ext.to_lowercase()),
            None => return false,
        };

        accepted.iter().any(|a| a.to_lowercase() == ext)
    }
}

/// A named, reusable capability profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub name: String,
    pub description: String,
    /// Capability identifiers in the order they were picked.
    #[serde(default)]
    pub tools: Vec<String>,
    pub system_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub io_spec: Option<IoSpec>,
}

impl Agent {
    /// Check the schema-level field rules.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name_len = self.name.trim().chars().count();
        if name_len == 0 {
            return Err(ValidationError::MissingAgentName);
        }
        if self.name.chars().count() > AGENT_NAME_MAX {
            return Err(ValidationError::AgentNameTooLong {
                len: self.name.chars().count(),
            });
        }

        let desc_len = self.description.chars().count();
        if desc_len < AGENT_DESCRIPTION_MIN {
            return Err(ValidationError::DescriptionTooShort { len: desc_len });
        }

        let prompt_len = self.system_prompt.chars().count();
        if prompt_len < SYSTEM_PROMPT_MIN {
            return Err(ValidationError::SystemPromptTooShort { len: prompt_len });
        }

        Ok(())
    }

    /// The agent's I/O contract, falling back to plain text in and out.
    pub fn io_spec_or_default(&self) -> IoSpec {
        self.io_spec.clone().unwrap_or_default()
    }
}

/// A named collection of agents plus a supervisor prompt.
///
/// Agents are embedded by value: a swarm keeps the snapshot it was
/// created with even if the stored agent is edited later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Swarm {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub main_prompt: String,
    #[serde(default)]
    pub agents: Vec<Agent>,
}

impl Swarm {
    /// Check the swarm's own fields and every embedded agent.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingSwarmName);
        }

        let len = self.main_prompt.chars().count();
        if len < MAIN_PROMPT_MIN {
            return Err(ValidationError::MainPromptTooShort { len });
        }

        for (index, agent) in self.agents.iter().enumerate() {
            agent
                .validate()
                .map_err(|e| ValidationError::EmbeddedAgent {
                    index,
                    source: Box::new(e),
                })?;
        }

        Ok(())
    }
}

/// A field rule that a record failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Agent name is required")]
    MissingAgentName,
    #[error("Agent name too long ({len} characters, max {max})", max = AGENT_NAME_MAX)]
    AgentNameTooLong { len: usize },
    #[error("Description must be at least {min} characters (got {len})", min = AGENT_DESCRIPTION_MIN)]
    DescriptionTooShort { len: usize },
    #[error("System prompt must be at least {min} characters (got {len})", min = SYSTEM_PROMPT_MIN)]
    SystemPromptTooShort { len: usize },
    #[error("Swarm name is required")]
    MissingSwarmName,
    #[error("Main prompt must be at least {min} characters (got {len})", min = MAIN_PROMPT_MIN)]
    MainPromptTooShort { len: usize },
    #[error("Agent #{index} in swarm is invalid: {source}")]
    EmbeddedAgent {
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

/// Score and reasoning for one agent in a compatibility check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentScore {
    pub score: u8,
    pub reason: String,
}

/// Model-generated verdict on whether a set of agents fits a purpose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityResult {
    pub is_compatible: bool,
    pub overall_score: u8,
    pub analysis: String,
    pub agent_scores: BTreeMap<String, AgentScore>,
    pub gaps: Vec<String>,
    pub suggestions: Vec<String>,
}

/// An integration tool found by a tool search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_command: Option<String>,
    #[serde(default)]
    pub is_official: bool,
}

/// Result of a tool search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSearchResult {
    pub found_tools: Vec<FoundTool>,
    pub search_summary: String,
}

/// Free-text tool suggestions for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSuggestions {
    pub suggestions: String,
    pub installed_tools: Vec<String>,
}

/// Result of starting a fresh session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchResult {
    pub session_id: String,
    pub response: String,
}

/// Result of a follow-up turn on an existing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeResult {
    pub response: String,
}

/// Outcome of running an agent against a test input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTestResult {
    pub success: bool,
    #[serde(default)]
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentTestResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            session_id: None,
            error: Some(message.into()),
        }
    }
}

/// A rewritten prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedPrompt {
    pub enhanced_prompt: String,
}

/// A file handed to an agent under test.
#[derive(Debug, Clone, PartialEq)]
pub struct TestFile {
    pub name: String,
    pub content: String,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn agent(name: &str) -> Agent {
        Agent {
            name: name.to_string(),
            description: format!("{} does focused work", name),
            tools: vec!["Read".to_string(), "Grep".to_string()],
            system_prompt: "You are a careful specialist. Read the input, think it through, then answer precisely.".to_string(),
            io_spec: None,
        }
    }

    pub fn swarm(name: &str, agents: Vec<Agent>) -> Swarm {
        Swarm {
            name: name.to_string(),
            description: None,
            main_prompt: "Coordinate the agents to review the repository.".to_string(),
            agents,
        }
    }
}
