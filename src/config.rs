//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.swarmsmith.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".swarmsmith.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where agents, swarms, exports and the interaction log live.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Defaults passed to every session launch.
    #[serde(default)]
    pub session: SessionConfig,

    /// How the external orchestration runtime is invoked.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Flat-file storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory every other storage path is relative to.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// JSON array of saved agents.
    #[serde(default = "default_agents_file")]
    pub agents_file: String,

    /// JSON array of saved swarms.
    #[serde(default = "default_swarms_file")]
    pub swarms_file: String,

    /// Directory that receives one folder of agent definitions per swarm.
    #[serde(default = "default_export_dir")]
    pub export_dir: String,

    /// Append-only prompt/completion log.
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// MCP server configuration, relative to the working directory.
    #[serde(default = "default_mcp_config")]
    pub mcp_config: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            agents_file: default_agents_file(),
            swarms_file: default_swarms_file(),
            export_dir: default_export_dir(),
            log_file: default_log_file(),
            mcp_config: default_mcp_config(),
        }
    }
}

impl StorageConfig {
    /// Storage rooted at `root` with default file names.
    #[cfg(test)]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn agents_path(&self) -> PathBuf {
        self.root.join(&self.agents_file)
    }

    pub fn swarms_path(&self) -> PathBuf {
        self.root.join(&self.swarms_file)
    }

    pub fn export_path(&self) -> PathBuf {
        self.root.join(&self.export_dir)
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(&self.log_file)
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".swarmsmith")
}

fn default_agents_file() -> String {
    "agents.json".to_string()
}

fn default_swarms_file() -> String {
    "swarms.json".to_string()
}

fn default_export_dir() -> String {
    "temp-agents".to_string()
}

fn default_log_file() -> String {
    "interactions.log".to_string()
}

fn default_mcp_config() -> PathBuf {
    PathBuf::from(".mcp.json")
}

/// Session defaults handed to the orchestrator unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Turn limit for a launched session.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Text appended to the runtime's system prompt.
    #[serde(default = "default_append_system_prompt")]
    pub append_system_prompt: String,

    /// Output token limit.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            append_system_prompt: default_append_system_prompt(),
            max_tokens: None,
        }
    }
}

fn default_max_turns() -> u32 {
    10
}

fn default_append_system_prompt() -> String {
    "Supervise sub-agents and log interactions.".to_string()
}

/// External orchestration runtime settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Executable that speaks the streaming JSON protocol.
    #[serde(default = "default_command")]
    pub command: String,

    /// Extra arguments appended to every invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Model override.
    #[serde(default)]
    pub model: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            extra_args: Vec::new(),
            model: None,
        }
    }
}

fn default_command() -> String {
    "claude".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.swarmsmith.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref root) = args.storage_root {
            self.storage.root = root.clone();
        }
        if let Some(ref command) = args.orchestrator {
            self.orchestrator.command = command.clone();
        }
        if let Some(ref model) = args.model {
            self.orchestrator.model = Some(model.clone());
        }
        if let Some(max_turns) = args.max_turns {
            self.session.max_turns = max_turns;
        }
        if let Some(max_tokens) = args.max_tokens {
            self.session.max_tokens = Some(max_tokens);
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
