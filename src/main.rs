//! swarmsmith - compose, test and run swarms of AI agents
//!
//! A CLI tool that stores agent and swarm definitions as flat JSON files
//! and drives them through an external orchestration runtime that speaks
//! a streaming JSON protocol.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid input, storage failure, orchestrator failure, etc.)

mod catalog;
mod cli;
mod config;
mod extract;
mod interaction_log;
mod models;
mod report;
mod service;
mod session;
mod store;

use anyhow::{anyhow, Context, Result};
use cli::{
    AgentCommand, Args, Command, OutputFormat, PremadeCommand, SessionCommand, SwarmCommand,
    ToolsCommand,
};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use models::{Agent, EnhancedPrompt, Swarm, TestFile};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use service::Service;
use session::ClaudeCli;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig = args.command {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("swarmsmith v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Command failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: generate a default .swarmsmith.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize storage paths, session limits and the orchestrator.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

/// Build the service and dispatch the subcommand.
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    debug!("Storage root: {}", config.storage.root.display());

    let orchestrator = Arc::new(ClaudeCli::new(config.orchestrator.clone()));
    let service = Service::from_config(&config, orchestrator);
    let out = Output {
        format: args.format,
        progress: args.show_progress(),
    };

    match args.command {
        Command::Agent(cmd) => run_agent(&service, &out, cmd).await,
        Command::Swarm(cmd) => run_swarm(&service, &out, cmd).await,
        Command::Session(cmd) => run_session(&service, &out, cmd).await,
        Command::Tools(cmd) => run_tools(&service, &out, cmd).await,
        Command::Premade(PremadeCommand::List) => {
            out.emit(&catalog::premade_agents(), |agents| {
                report::generate_agent_list(agents)
            })
        }
        // Handled before logging is set up.
        Command::InitConfig => Ok(()),
    }
}

async fn run_agent(service: &Service, out: &Output, cmd: AgentCommand) -> Result<()> {
    match cmd {
        AgentCommand::List => {
            let agents = service.get_agents()?;
            out.emit(&agents, |a| report::generate_agent_list(a))
        }
        AgentCommand::Show { index } => {
            let agent = service.get_agent(index)?;
            out.emit(&agent, report::generate_agent_detail)
        }
        AgentCommand::Add { file } => {
            let agent: Agent = read_json(&file)?;
            save_agent(service, out, agent)
        }
        AgentCommand::AddPremade { name } => {
            let agent = catalog::premade_agent(&name).ok_or_else(|| {
                anyhow!(
                    "Unknown premade agent: {}. Run `swarmsmith premade list`.",
                    name
                )
            })?;
            save_agent(service, out, agent)
        }
        AgentCommand::Update { index, file } => {
            let agent: Agent = read_json(&file)?;
            let name = agent.name.clone();
            service.update_agent(index, agent)?;
            out.confirm(json!({ "index": index, "name": name }), || {
                format!("✅ Updated agent #{}: {}", index, name)
            })
        }
        AgentCommand::Delete { index } => {
            let removed = service.delete_agent(index)?;
            out.confirm(json!({ "index": index, "name": removed.name }), || {
                format!("🗑️  Deleted agent #{}: {}", index, removed.name)
            })
        }
        AgentCommand::Enhance { index, dry_run } => {
            let mut agent = service.get_agent(index)?;
            let enhanced = out
                .spin(
                    "Enhancing system prompt...",
                    service.enhance_agent_prompt(&agent.system_prompt, &agent.name, &agent.tools),
                )
                .await;

            if !dry_run && enhanced.enhanced_prompt != agent.system_prompt {
                agent.system_prompt = enhanced.enhanced_prompt.clone();
                service.update_agent(index, agent)?;
                info!("Saved enhanced prompt for agent #{}", index);
            }
            out.emit(&enhanced, generate_enhanced)
        }
        AgentCommand::Test {
            index,
            input,
            file,
            session,
        } => {
            let agent = service.get_agent(index)?;
            let result = match session {
                Some(id) => {
                    out.spin(
                        "Continuing agent test...",
                        service.continue_agent_test(&id, &agent, &input),
                    )
                    .await
                }
                None => {
                    let file = file.as_deref().map(read_test_file).transpose()?;
                    out.spin(
                        "Running agent test...",
                        service.test_agent(&agent, &input, file),
                    )
                    .await
                }
            };
            out.emit(&result, report::generate_test_result)
        }
        AgentCommand::Check { index, task } => {
            let agent = service.get_agent(index)?;
            let result = out
                .spin(
                    "Checking compatibility...",
                    service.check_agent_compatibility(&agent, &task),
                )
                .await;
            out.emit(&result, report::generate_compatibility)
        }
        AgentCommand::SuggestTools { index } => {
            let agent = service.get_agent(index)?;
            let result = out
                .spin(
                    "Looking for useful MCP servers...",
                    service.suggest_mcp_tools_for_agent(&agent),
                )
                .await;
            out.emit(&result, report::generate_tool_suggestions)
        }
    }
}

async fn run_swarm(service: &Service, out: &Output, cmd: SwarmCommand) -> Result<()> {
    match cmd {
        SwarmCommand::List => {
            let swarms = service.get_swarms()?;
            out.emit(&swarms, |s| report::generate_swarm_list(s))
        }
        SwarmCommand::Create { file } => {
            let swarm: Swarm = read_json(&file)?;
            let created = service.create_swarm(swarm)?;
            out.emit(&created, |c| format!("✅ {}\n", c.message))
        }
        SwarmCommand::Save { file } => {
            let swarm: Swarm = read_json(&file)?;
            let name = swarm.name.clone();
            let index = service.save_swarm(swarm)?;
            out.confirm(json!({ "index": index, "name": name }), || {
                format!("✅ Saved swarm #{}: {}", index, name)
            })
        }
        SwarmCommand::Update { index, file } => {
            let swarm: Swarm = read_json(&file)?;
            let name = swarm.name.clone();
            service.update_swarm(index, swarm)?;
            out.confirm(json!({ "index": index, "name": name }), || {
                format!("✅ Updated swarm #{}: {}", index, name)
            })
        }
        SwarmCommand::Delete { index } => {
            let removed = service.delete_swarm(index)?;
            out.confirm(json!({ "index": index, "name": removed.name }), || {
                format!("🗑️  Deleted swarm #{}: {}", index, removed.name)
            })
        }
        SwarmCommand::Enhance { index, dry_run } => {
            let mut swarm = service.get_swarm(index)?;
            let enhanced = out
                .spin(
                    "Enhancing main prompt...",
                    service.enhance_swarm_prompt(&swarm.main_prompt, &swarm.name, &swarm.agents),
                )
                .await;

            if !dry_run && enhanced.enhanced_prompt != swarm.main_prompt {
                swarm.main_prompt = enhanced.enhanced_prompt.clone();
                service.update_swarm(index, swarm)?;
                info!("Saved enhanced prompt for swarm #{}", index);
            }
            out.emit(&enhanced, generate_enhanced)
        }
        SwarmCommand::Check { index } => {
            let swarm = service.get_swarm(index)?;
            let result = out
                .spin(
                    "Checking compatibility...",
                    service.check_compatibility(&swarm.main_prompt, &swarm.agents),
                )
                .await;
            out.emit(&result, report::generate_compatibility)
        }
        SwarmCommand::Launch { index } => {
            let swarm = service.get_swarm(index)?;
            let result = out
                .spin("Running session...", service.launch_session(&swarm.main_prompt))
                .await
                .with_context(|| format!("Failed to launch swarm {}", swarm.name))?;
            out.emit(&result, report::generate_launch)
        }
    }
}

async fn run_session(service: &Service, out: &Output, cmd: SessionCommand) -> Result<()> {
    match cmd {
        SessionCommand::Launch { prompt } => {
            let result = out
                .spin("Running session...", service.launch_session(&prompt))
                .await
                .context("Failed to launch session")?;
            out.emit(&result, report::generate_launch)
        }
        SessionCommand::Resume { session_id, prompt } => {
            let result = out
                .spin("Resuming session...", service.resume_session(&session_id, &prompt))
                .await
                .with_context(|| format!("Failed to resume session {}", session_id))?;
            out.emit(&result, report::generate_resume)
        }
    }
}

async fn run_tools(service: &Service, out: &Output, cmd: ToolsCommand) -> Result<()> {
    match cmd {
        ToolsCommand::Search { terms } => {
            let result = out
                .spin("Searching for MCP tools...", service.search_mcp_tools(&terms))
                .await;
            out.emit(&result, report::generate_tool_search)
        }
        ToolsCommand::Installed => {
            let tools = service.get_installed_mcp_tools();
            out.emit(&tools, |t| report::generate_installed_tools(t))
        }
    }
}

fn save_agent(service: &Service, out: &Output, agent: Agent) -> Result<()> {
    let name = agent.name.clone();
    let index = service.save_agent(agent)?;
    out.confirm(json!({ "index": index, "name": name }), || {
        format!("✅ Saved agent #{}: {}", index, name)
    })
}

fn generate_enhanced(enhanced: &EnhancedPrompt) -> String {
    format!("✨ Enhanced prompt\n\n{}\n", enhanced.enhanced_prompt)
}

/// Read a JSON record from a file.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn read_test_file(path: &Path) -> Result<TestFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read test file {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(TestFile { name, content })
}

/// Where and how results are printed.
struct Output {
    format: OutputFormat,
    progress: bool,
}

impl Output {
    /// Print a result record as text or JSON.
    fn emit<T, F>(&self, value: &T, text: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&T) -> String,
    {
        match self.format {
            OutputFormat::Json => println!("{}", report::generate_json(value)?),
            OutputFormat::Text => print!("{}", text(value)),
        }
        Ok(())
    }

    /// Print a one-line confirmation, or its JSON form.
    fn confirm<F: FnOnce() -> String>(&self, value: serde_json::Value, text: F) -> Result<()> {
        self.emit(&value, |_| format!("{}\n", text()))
    }

    /// Await `fut` behind a spinner when progress output is enabled.
    async fn spin<F: Future>(&self, message: &str, fut: F) -> F::Output {
        if !self.progress {
            return fut.await;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        let output = fut.await;
        pb.finish_and_clear();
        output
    }
}
