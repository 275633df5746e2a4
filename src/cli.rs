//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// swarmsmith - compose, test and run swarms of AI agents
///
/// Agents and swarms are kept as JSON files under the storage root and run
/// through the `claude` CLI in streaming JSON mode.
///
/// Examples:
///   swarmsmith agent add reviewer.json
///   swarmsmith agent test 0 "Review src/lib.rs" --file src/lib.rs
///   swarmsmith swarm create release-crew.json
///   swarmsmith session launch "Coordinate the release review"
///   swarmsmith tools search database postgres
///   swarmsmith init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .swarmsmith.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding agents, swarms, exports and the interaction log
    #[arg(long, value_name = "DIR", env = "SWARMSMITH_STORAGE_ROOT", global = true)]
    pub storage_root: Option<PathBuf>,

    /// Orchestrator executable to run
    #[arg(long, value_name = "CMD", env = "SWARMSMITH_ORCHESTRATOR", global = true)]
    pub orchestrator: Option<String>,

    /// Model passed to the orchestrator
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Turn limit for launched sessions
    #[arg(long, value_name = "N", global = true)]
    pub max_turns: Option<u32>,

    /// Output token limit for the orchestrator
    #[arg(long, value_name = "N", global = true)]
    pub max_tokens: Option<u32>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_name = "FORMAT", global = true)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Manage saved agents
    #[command(subcommand)]
    Agent(AgentCommand),

    /// Manage saved swarms
    #[command(subcommand)]
    Swarm(SwarmCommand),

    /// Launch or resume orchestrator sessions
    #[command(subcommand)]
    Session(SessionCommand),

    /// Discover MCP tools
    #[command(subcommand)]
    Tools(ToolsCommand),

    /// Browse built-in agents
    #[command(subcommand)]
    Premade(PremadeCommand),

    /// Generate a default .swarmsmith.toml configuration file
    InitConfig,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AgentCommand {
    /// List saved agents
    List,
    /// Show one agent in full
    Show { index: usize },
    /// Save an agent from a JSON file
    Add {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Save a copy of a premade agent
    AddPremade { name: String },
    /// Replace the agent at INDEX with the one in FILE
    Update {
        index: usize,
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Delete the agent at INDEX
    Delete { index: usize },
    /// Rewrite the agent's system prompt with the model's help
    Enhance {
        index: usize,
        /// Print the suggestion without saving it
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the agent against an input
    Test {
        index: usize,
        /// Text input for the agent
        #[arg(default_value = "")]
        input: String,
        /// File handed to the agent
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
        /// Continue an earlier test session
        #[arg(long, value_name = "ID")]
        session: Option<String>,
    },
    /// Check whether the agent fits a task
    Check { index: usize, task: String },
    /// Ask for MCP servers that would help the agent
    SuggestTools { index: usize },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SwarmCommand {
    /// List saved swarms
    List,
    /// Export agent definitions and save a swarm from a JSON file
    Create {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Save a swarm from a JSON file without exporting agent definitions
    Save {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Replace the swarm at INDEX with the one in FILE
    Update {
        index: usize,
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Delete the swarm at INDEX
    Delete { index: usize },
    /// Rewrite the swarm's main prompt with the model's help
    Enhance {
        index: usize,
        /// Print the suggestion without saving it
        #[arg(long)]
        dry_run: bool,
    },
    /// Check whether the swarm's agents fit its main prompt
    Check { index: usize },
    /// Launch a session with the swarm's main prompt
    Launch { index: usize },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// Start a new session
    Launch { prompt: String },
    /// Send a follow-up prompt to a session
    Resume { session_id: String, prompt: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ToolsCommand {
    /// Search for MCP servers by capability
    Search {
        #[arg(required = true)]
        terms: Vec<String>,
    },
    /// List MCP servers configured in .mcp.json
    Installed,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PremadeCommand {
    /// List built-in agents
    List,
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.max_turns == Some(0) {
            return Err("Max turns must be at least 1".to_string());
        }

        if self.max_tokens == Some(0) {
            return Err("Max tokens must be at least 1".to_string());
        }

        if let Command::Session(SessionCommand::Resume { ref session_id, .. }) = self.command {
            if session_id.trim().is_empty() {
                return Err("Session ID must not be empty".to_string());
            }
        }

        if let Command::Agent(AgentCommand::Test {
            file: Some(_),
            session: Some(_),
            ..
        }) = self.command
        {
            return Err("Cannot use both --file and --session".to_string());
        }

        if let Command::Agent(AgentCommand::Test {
            file: Some(ref path),
            ..
        }) = self.command
        {
            if !path.is_file() {
                return Err(format!("Test file does not exist: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Whether to show progress spinners.
    pub fn show_progress(&self) -> bool {
        !self.quiet && self.format == OutputFormat::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            command: Command::Agent(AgentCommand::List),
            config: None,
            storage_root: None,
            orchestrator: None,
            model: None,
            max_turns: None,
            max_tokens: None,
            verbose: false,
            quiet: false,
            format: OutputFormat::Text,
        }
    }

    #[test]
    fn test_parse_nested_subcommands() {
        let args = Args::try_parse_from([
            "swarmsmith",
            "agent",
            "test",
            "2",
            "hello there",
            "--session",
            "abc",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.format, OutputFormat::Json);
        match args.command {
            Command::Agent(AgentCommand::Test {
                index,
                input,
                file,
                session,
            }) => {
                assert_eq!(index, 2);
                assert_eq!(input, "hello there");
                assert!(file.is_none());
                assert_eq!(session.as_deref(), Some("abc"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "swarmsmith",
            "tools",
            "search",
            "database",
            "cache",
            "--max-turns",
            "3",
            "-q",
        ])
        .unwrap();

        assert_eq!(args.max_turns, Some(3));
        assert!(args.quiet);
        assert!(!args.show_progress());
        match args.command {
            Command::Tools(ToolsCommand::Search { terms }) => {
                assert_eq!(terms, vec!["database", "cache"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_tools_search_requires_terms() {
        assert!(Args::try_parse_from(["swarmsmith", "tools", "search"]).is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_limits() {
        let mut args = make_args();
        assert!(args.validate().is_ok());

        args.max_turns = Some(0);
        assert!(args.validate().is_err());

        args.max_turns = Some(5);
        args.max_tokens = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_test_file() {
        let mut args = make_args();
        args.command = Command::Agent(AgentCommand::Test {
            index: 0,
            input: String::new(),
            file: Some(PathBuf::from("/definitely/not/here.txt")),
            session: None,
        });
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_file_with_session() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut args = make_args();
        args.command = Command::Agent(AgentCommand::Test {
            index: 0,
            input: "and now this".to_string(),
            file: Some(file.path().to_path_buf()),
            session: Some("t-1".to_string()),
        });
        let err = args.validate().unwrap_err();
        assert!(err.contains("--session"));

        args.command = Command::Agent(AgentCommand::Test {
            index: 0,
            input: "and now this".to_string(),
            file: Some(file.path().to_path_buf()),
            session: None,
        });
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
