//! Request handlers behind every CLI subcommand.
//!
//! Handlers that only touch storage propagate their errors. Handlers that
//! ask the model for advice degrade to a safe default when the external
//! call fails, so a flaky runtime never turns a suggestion into an error.

pub mod prompts;

use crate::catalog;
use crate::config::Config;
use crate::extract::{compatibility_fallback, extract_compatibility, extract_tool_search};
use crate::interaction_log::InteractionLog;
use crate::models::{
    Agent, AgentTestResult, CompatibilityResult, EnhancedPrompt, LaunchResult, ResumeResult, Swarm,
    TestFile, ToolSearchResult, ToolSuggestions,
};
use crate::session::{Orchestrator, OrchestratorError, QueryOptions, QueryRequest, SessionRunner};
use crate::store::{Store, StoreError};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Summary used when a tool search could not run.
pub const TOOL_SEARCH_UNAVAILABLE: &str = "Unable to search for tools at this time.";

/// Summary used when a tool search had nothing to look for.
pub const TOOL_SEARCH_NO_TERMS: &str = "No search terms provided.";

/// Outcome of creating a swarm.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwarmCreated {
    pub index: usize,
    pub export_dir: PathBuf,
    pub message: String,
}

/// Everything a request handler needs.
#[derive(Clone)]
pub struct Service {
    store: Store,
    runner: SessionRunner,
    mcp_config: PathBuf,
}

impl Service {
    pub fn new(store: Store, runner: SessionRunner, mcp_config: impl Into<PathBuf>) -> Self {
        Self {
            store,
            runner,
            mcp_config: mcp_config.into(),
        }
    }

    /// Wire storage, the interaction log and the given orchestrator.
    pub fn from_config(config: &Config, orchestrator: Arc<dyn Orchestrator>) -> Self {
        let log = InteractionLog::new(config.storage.log_path());
        let runner = SessionRunner::new(orchestrator, config.session.clone(), log);
        Self::new(
            Store::new(&config.storage),
            runner,
            config.storage.mcp_config.clone(),
        )
    }

    // Agents

    pub fn save_agent(&self, agent: Agent) -> Result<usize, StoreError> {
        self.store.save_agent(agent)
    }

    pub fn get_agents(&self) -> Result<Vec<Agent>, StoreError> {
        self.store.get_agents()
    }

    pub fn get_agent(&self, index: usize) -> Result<Agent, StoreError> {
        self.store.get_agent(index)
    }

    pub fn update_agent(&self, index: usize, agent: Agent) -> Result<(), StoreError> {
        self.store.update_agent(index, agent)
    }

    pub fn delete_agent(&self, index: usize) -> Result<Agent, StoreError> {
        self.store.delete_agent(index)
    }

    // Swarms

    /// Export the swarm's agent definitions, then persist the swarm.
    pub fn create_swarm(&self, swarm: Swarm) -> Result<SwarmCreated, StoreError> {
        swarm.validate()?;
        let export_dir = self.store.export_swarm(&swarm)?;
        let index = self.store.save_swarm(swarm)?;

        Ok(SwarmCreated {
            index,
            message: format!(
                "Swarm created at {}. Place files in .claude/agents/ for use.",
                export_dir.display()
            ),
            export_dir,
        })
    }

    pub fn save_swarm(&self, swarm: Swarm) -> Result<usize, StoreError> {
        self.store.save_swarm(swarm)
    }

    pub fn get_swarms(&self) -> Result<Vec<Swarm>, StoreError> {
        self.store.get_swarms()
    }

    pub fn get_swarm(&self, index: usize) -> Result<Swarm, StoreError> {
        self.store.get_swarm(index)
    }

    pub fn update_swarm(&self, index: usize, swarm: Swarm) -> Result<(), StoreError> {
        self.store.update_swarm(index, swarm)
    }

    pub fn delete_swarm(&self, index: usize) -> Result<Swarm, StoreError> {
        self.store.delete_swarm(index)
    }

    // Sessions

    pub async fn launch_session(&self, main_prompt: &str) -> Result<LaunchResult, OrchestratorError> {
        self.runner
            .launch(main_prompt, json!({ "mainPrompt": main_prompt }))
            .await
    }

    pub async fn resume_session(
        &self,
        session_id: &str,
        prompt: &str,
    ) -> Result<ResumeResult, OrchestratorError> {
        self.runner.resume(session_id, prompt, json!({})).await
    }

    // Agent testing

    /// Run an agent against one input in a fresh session.
    pub async fn test_agent(
        &self,
        agent: &Agent,
        input: &str,
        file: Option<TestFile>,
    ) -> AgentTestResult {
        if let Some(ref file) = file {
            let spec = agent.io_spec_or_default();
            if !spec.accepts_file(&file.name) {
                let accepted = spec.accepted_file_types.unwrap_or_default().join(", ");
                return AgentTestResult::failed(format!(
                    "File type not accepted: {} (accepted: {})",
                    file.name, accepted
                ));
            }
        }

        let options = QueryOptions {
            append_system_prompt: Some(prompts::agent_test_system_prompt(agent)),
            ..self.runner.launch_options()
        };
        let prompt = prompts::agent_test_input(agent, input, file.as_ref());
        let context = json!({
            "agent": agent.name,
            "file": file.as_ref().map(|f| f.name.clone()),
        });

        match self
            .runner
            .run("test_agent", QueryRequest::new(prompt, options), context)
            .await
        {
            Ok(session) => AgentTestResult {
                success: true,
                session_id: Some(session.session_id_or_fallback()),
                output: session.response,
                error: None,
            },
            Err(e) => {
                warn!("Agent test for {} failed: {}", agent.name, e);
                AgentTestResult::failed(e.to_string())
            }
        }
    }

    /// Send a follow-up input to an agent test session.
    pub async fn continue_agent_test(
        &self,
        session_id: &str,
        agent: &Agent,
        input: &str,
    ) -> AgentTestResult {
        let context = json!({ "agent": agent.name });

        match self.runner.resume(session_id, input, context).await {
            Ok(result) => AgentTestResult {
                success: true,
                output: result.response,
                session_id: Some(session_id.to_string()),
                error: None,
            },
            Err(e) => {
                warn!("Continuing agent test {} failed: {}", session_id, e);
                AgentTestResult::failed(e.to_string())
            }
        }
    }

    // Prompt enhancement

    pub async fn enhance_agent_prompt(
        &self,
        prompt: &str,
        agent_name: &str,
        tools: &[String],
    ) -> EnhancedPrompt {
        let request = prompts::enhance_agent(prompt, agent_name, tools);
        let context = json!({ "agentName": agent_name, "tools": tools });
        self.enhance("enhance_agent_prompt", prompt, request, context)
            .await
    }

    pub async fn enhance_swarm_prompt(
        &self,
        prompt: &str,
        swarm_name: &str,
        agents: &[Agent],
    ) -> EnhancedPrompt {
        let request = prompts::enhance_swarm(prompt, swarm_name, agents);
        let names: Vec<&str> = agents.iter().map(|a| a.name.as_str()).collect();
        let context = json!({ "swarmName": swarm_name, "agents": names });
        self.enhance("enhance_swarm_prompt", prompt, request, context)
            .await
    }

    async fn enhance(
        &self,
        function: &str,
        original: &str,
        request: String,
        context: Value,
    ) -> EnhancedPrompt {
        let keep = || EnhancedPrompt {
            enhanced_prompt: original.to_string(),
        };

        match self
            .runner
            .run(function, QueryRequest::new(request, single_turn()), context)
            .await
        {
            Ok(session) => {
                let text = strip_code_fences(&session.response);
                if text.is_empty() {
                    warn!("{}: empty response, keeping the original prompt", function);
                    keep()
                } else {
                    EnhancedPrompt {
                        enhanced_prompt: text,
                    }
                }
            }
            Err(e) => {
                warn!("{} failed, keeping the original prompt: {}", function, e);
                keep()
            }
        }
    }

    // Compatibility

    pub async fn check_compatibility(&self, purpose: &str, agents: &[Agent]) -> CompatibilityResult {
        let names: Vec<&str> = agents.iter().map(|a| a.name.as_str()).collect();
        self.compatibility(
            "check_compatibility",
            prompts::swarm_compatibility(purpose, agents),
            json!({ "purpose": purpose, "agents": names }),
        )
        .await
    }

    pub async fn check_agent_compatibility(&self, agent: &Agent, task: &str) -> CompatibilityResult {
        self.compatibility(
            "check_agent_compatibility",
            prompts::agent_compatibility(agent, task),
            json!({ "agent": agent.name, "task": task }),
        )
        .await
    }

    async fn compatibility(&self, function: &str, prompt: String, context: Value) -> CompatibilityResult {
        match self
            .runner
            .run(function, QueryRequest::new(prompt, single_turn()), context)
            .await
        {
            Ok(session) => extract_compatibility(&session.response),
            Err(e) => {
                warn!("{} failed: {}", function, e);
                compatibility_fallback()
            }
        }
    }

    // Tools

    /// Ask the tool discovery agent for MCP servers matching `terms`.
    pub async fn search_mcp_tools(&self, terms: &[String]) -> ToolSearchResult {
        let terms: Vec<String> = terms
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        if terms.is_empty() {
            return ToolSearchResult {
                found_tools: Vec::new(),
                search_summary: TOOL_SEARCH_NO_TERMS.to_string(),
            };
        }

        let options = QueryOptions {
            append_system_prompt: Some(catalog::tool_discovery_agent().system_prompt),
            ..self.runner.launch_options()
        };
        let request = QueryRequest::new(prompts::tool_search(&terms), options);

        match self
            .runner
            .run("search_mcp_tools", request, json!({ "terms": terms }))
            .await
        {
            Ok(session) => extract_tool_search(&session.response),
            Err(e) => {
                warn!("Tool search failed: {}", e);
                ToolSearchResult {
                    found_tools: Vec::new(),
                    search_summary: TOOL_SEARCH_UNAVAILABLE.to_string(),
                }
            }
        }
    }

    /// Free-text MCP server suggestions for an agent.
    pub async fn suggest_mcp_tools_for_agent(&self, agent: &Agent) -> ToolSuggestions {
        let installed_tools = self.get_installed_mcp_tools();
        let options = QueryOptions {
            append_system_prompt: Some(catalog::tool_discovery_agent().system_prompt),
            ..self.runner.launch_options()
        };
        let request = QueryRequest::new(prompts::tool_suggestions(agent, &installed_tools), options);
        let context = json!({ "agent": agent.name, "installed": installed_tools });

        let suggestions = match self
            .runner
            .run("suggest_mcp_tools_for_agent", request, context)
            .await
        {
            Ok(session) => session.response,
            Err(e) => {
                warn!("Tool suggestions for {} failed: {}", agent.name, e);
                String::new()
            }
        };

        ToolSuggestions {
            suggestions,
            installed_tools,
        }
    }

    /// Names of the MCP servers configured in `.mcp.json`.
    pub fn get_installed_mcp_tools(&self) -> Vec<String> {
        let path = &self.mcp_config;
        if !path.exists() {
            debug!("No MCP config at {}", path.display());
            return Vec::new();
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(config) => {
                let tools: Vec<String> = config
                    .get("mcpServers")
                    .and_then(Value::as_object)
                    .map(|servers| servers.keys().cloned().collect())
                    .unwrap_or_default();
                info!("Found {} installed MCP servers", tools.len());
                tools
            }
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }
}

/// One-turn call used for advice that needs no tool use.
fn single_turn() -> QueryOptions {
    QueryOptions {
        max_turns: Some(1),
        ..QueryOptions::default()
    }
}

/// Trim the text and drop one surrounding Markdown code fence, if any.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    // Drop the info string on the opening fence line.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::models::fixtures::{agent, swarm};
    use crate::models::IoSpec;
    use crate::session::events::SessionEvent;
    use crate::session::runner::testing::{Script, ScriptedOrchestrator};
    use tempfile::TempDir;

    fn make_service(orchestrator: Arc<ScriptedOrchestrator>) -> (TempDir, Service) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage = StorageConfig::with_root(dir.path());
        config.storage.mcp_config = dir.path().join(".mcp.json");
        let service = Service::from_config(&config, orchestrator);
        (dir, service)
    }

    fn failing() -> Arc<ScriptedOrchestrator> {
        ScriptedOrchestrator::new(vec![Script::FailToStart("runtime offline".to_string())])
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("  plain text \n"), "plain text");
        assert_eq!(strip_code_fences("```markdown\nYou are X.\n```"), "You are X.");
        assert_eq!(strip_code_fences("```\nbody\n```\n"), "body");
        assert_eq!(strip_code_fences("```\nunterminated"), "unterminated");
    }

    #[test]
    fn test_create_swarm_exports_then_saves() {
        let (dir, service) = make_service(ScriptedOrchestrator::new(vec![]));
        let created = service
            .create_swarm(swarm("Crew", vec![agent("Reviewer")]))
            .unwrap();

        assert_eq!(created.index, 0);
        assert!(created.export_dir.join("Reviewer.md").exists());
        assert!(created.message.ends_with("Place files in .claude/agents/ for use."));
        assert!(dir.path().join("swarms.json").exists());
    }

    #[test]
    fn test_create_invalid_swarm_writes_nothing() {
        let (dir, service) = make_service(ScriptedOrchestrator::new(vec![]));
        let mut bad = swarm("Crew", vec![agent("Reviewer")]);
        bad.main_prompt = "Go".to_string();

        assert!(matches!(service.create_swarm(bad), Err(StoreError::Invalid(_))));
        assert!(!dir.path().join("temp-agents").exists());
        assert!(!dir.path().join("swarms.json").exists());
    }

    #[tokio::test]
    async fn test_launch_session_propagates_failure() {
        let (_dir, service) = make_service(failing());
        assert!(service.launch_session("Review everything now").await.is_err());
    }

    #[tokio::test]
    async fn test_agent_test_passes_contract_as_system_prompt() {
        let orchestrator = ScriptedOrchestrator::new(vec![Script::Events(vec![
            SessionEvent::init("t-1"),
            SessionEvent::assistant_text(&["{\"ok\": true}"]),
        ])]);
        let (_dir, service) = make_service(orchestrator.clone());
        let mut a = agent("Parser");
        a.io_spec = Some(IoSpec {
            output_type: crate::models::OutputType::Json,
            ..IoSpec::default()
        });

        let result = service.test_agent(&a, "parse this", None).await;
        assert!(result.success);
        assert_eq!(result.session_id.as_deref(), Some("t-1"));
        assert_eq!(result.output, "{\"ok\": true}");

        let request = &orchestrator.recorded()[0];
        let system = request.options.append_system_prompt.as_deref().unwrap();
        assert!(system.starts_with(&a.system_prompt));
        assert!(system.contains("Respond with valid JSON only."));
        assert_eq!(request.prompt, "parse this");
    }

    #[tokio::test]
    async fn test_agent_test_rejects_file_type_without_calling() {
        let orchestrator = ScriptedOrchestrator::new(vec![]);
        let (_dir, service) = make_service(orchestrator.clone());
        let mut a = agent("Parser");
        a.io_spec = Some(IoSpec {
            accepted_file_types: Some(vec![".csv".to_string()]),
            ..IoSpec::default()
        });
        let file = TestFile {
            name: "notes.txt".to_string(),
            content: "hi".to_string(),
        };

        let result = service.test_agent(&a, "", Some(file)).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("notes.txt"));
        assert!(orchestrator.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_agent_test_failure_becomes_result() {
        let orchestrator = ScriptedOrchestrator::new(vec![
            Script::FailToStart("runtime offline".to_string()),
            Script::FailToStart("runtime still offline".to_string()),
        ]);
        let (_dir, service) = make_service(orchestrator.clone());
        let result = service.test_agent(&agent("Parser"), "x", None).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("runtime offline"));

        let result = service
            .continue_agent_test("t-1", &agent("Parser"), "more")
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("runtime still offline"));
        assert_eq!(orchestrator.recorded().len(), 2);
    }

    #[tokio::test]
    async fn test_continue_agent_test_resumes() {
        let orchestrator = ScriptedOrchestrator::replying(&["second answer"]);
        let (_dir, service) = make_service(orchestrator.clone());

        let result = service
            .continue_agent_test("t-1", &agent("Parser"), "and now?")
            .await;
        assert!(result.success);
        assert_eq!(result.output, "second answer");
        assert_eq!(result.session_id.as_deref(), Some("t-1"));
        assert_eq!(orchestrator.recorded()[0].options.resume.as_deref(), Some("t-1"));
    }

    #[tokio::test]
    async fn test_enhance_strips_fences_and_uses_single_turn() {
        let orchestrator = ScriptedOrchestrator::replying(&["```\nYou are a sharper reviewer.\n```"]);
        let (_dir, service) = make_service(orchestrator.clone());

        let out = service
            .enhance_agent_prompt("You review.", "Reviewer", &["Read".to_string()])
            .await;
        assert_eq!(out.enhanced_prompt, "You are a sharper reviewer.");
        assert_eq!(orchestrator.recorded()[0].options.max_turns, Some(1));
    }

    #[tokio::test]
    async fn test_enhance_keeps_original_on_failure_or_empty() {
        let (_dir, service) = make_service(failing());
        let out = service
            .enhance_swarm_prompt("Original prompt", "Crew", &[agent("A")])
            .await;
        assert_eq!(out.enhanced_prompt, "Original prompt");

        let (_dir, service) = make_service(ScriptedOrchestrator::replying(&["   "]));
        let out = service.enhance_agent_prompt("Original", "A", &[]).await;
        assert_eq!(out.enhanced_prompt, "Original");
    }

    #[tokio::test]
    async fn test_compatibility_parses_or_falls_back() {
        let orchestrator = ScriptedOrchestrator::replying(&[
            "Verdict: {\"isCompatible\": false, \"overallScore\": 30, \"gaps\": [\"testing\"]}",
        ]);
        let (_dir, service) = make_service(orchestrator);
        let out = service
            .check_compatibility("Ship a tested release", &[agent("Writer")])
            .await;
        assert!(!out.is_compatible);
        assert_eq!(out.overall_score, 30);
        assert_eq!(out.gaps, vec!["testing".to_string()]);

        let (_dir, service) = make_service(failing());
        let out = service
            .check_agent_compatibility(&agent("Writer"), "Write docs")
            .await;
        assert_eq!(out, compatibility_fallback());
    }

    #[tokio::test]
    async fn test_search_tools() {
        let orchestrator = ScriptedOrchestrator::replying(&[
            "{\"tools\": [\"postgres-mcp-server\"], \"summary\": \"One match.\"}",
        ]);
        let (_dir, service) = make_service(orchestrator.clone());

        let out = service
            .search_mcp_tools(&["database".to_string(), " ".to_string()])
            .await;
        assert_eq!(out.found_tools[0].name, "postgres-mcp-server");
        assert_eq!(out.search_summary, "One match.");

        let request = &orchestrator.recorded()[0];
        assert!(request.prompt.contains("capabilities: database."));
        assert!(request
            .options
            .append_system_prompt
            .as_deref()
            .unwrap()
            .starts_with("You are the Tool Discovery Agent"));
    }

    #[tokio::test]
    async fn test_search_tools_degrades() {
        let orchestrator = ScriptedOrchestrator::new(vec![]);
        let (_dir, service) = make_service(orchestrator.clone());
        let out = service.search_mcp_tools(&[]).await;
        assert_eq!(out.search_summary, TOOL_SEARCH_NO_TERMS);
        assert!(orchestrator.recorded().is_empty());

        let (_dir, service) = make_service(failing());
        let out = service.search_mcp_tools(&["redis".to_string()]).await;
        assert!(out.found_tools.is_empty());
        assert_eq!(out.search_summary, TOOL_SEARCH_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_suggest_tools_includes_installed() {
        let (dir, service) = make_service(ScriptedOrchestrator::replying(&["Add github."]));
        std::fs::write(
            dir.path().join(".mcp.json"),
            r#"{"mcpServers": {"filesystem": {"command": "npx"}}}"#,
        )
        .unwrap();

        let out = service.suggest_mcp_tools_for_agent(&agent("Reviewer")).await;
        assert_eq!(out.suggestions, "Add github.");
        assert_eq!(out.installed_tools, vec!["filesystem".to_string()]);

        let (_dir, service) = make_service(failing());
        let out = service.suggest_mcp_tools_for_agent(&agent("Reviewer")).await;
        assert_eq!(out.suggestions, "");
    }

    #[test]
    fn test_installed_tools_missing_or_malformed() {
        let (dir, service) = make_service(ScriptedOrchestrator::new(vec![]));
        assert!(service.get_installed_mcp_tools().is_empty());

        std::fs::write(dir.path().join(".mcp.json"), "not json").unwrap();
        assert!(service.get_installed_mcp_tools().is_empty());

        std::fs::write(dir.path().join(".mcp.json"), r#"{"other": 1}"#).unwrap();
        assert!(service.get_installed_mcp_tools().is_empty());
    }
}
