//! Plain-text rendering of records and results.
//!
//! Every `generate_*` function returns the full text to print; callers
//! decide where it goes.

use crate::models::{
    Agent, AgentTestResult, CompatibilityResult, LaunchResult, ResumeResult, Swarm,
    ToolSearchResult, ToolSuggestions,
};
use anyhow::Result;
use serde::Serialize;

/// Badge for a 0-100 score.
pub fn score_emoji(score: u8) -> &'static str {
    match score {
        80..=100 => "🟢",
        60..=79 => "🟡",
        40..=59 => "🟠",
        _ => "🔴",
    }
}

/// Numbered list of agents.
pub fn generate_agent_list(agents: &[Agent]) -> String {
    if agents.is_empty() {
        return "No agents saved yet. Add one with `swarmsmith agent add <file.json>`.\n".to_string();
    }

    let mut output = format!("🤖 {} agent(s)\n\n", agents.len());
    for (i, agent) in agents.iter().enumerate() {
        output.push_str(&generate_agent_line(i, agent));
    }
    output
}

fn generate_agent_line(index: usize, agent: &Agent) -> String {
    let mut line = format!("  [{}] {}\n      {}\n", index, agent.name, agent.description);
    if !agent.tools.is_empty() {
        line.push_str(&format!("      Tools: {}\n", agent.tools.join(", ")));
    }
    if let Some(ref spec) = agent.io_spec {
        line.push_str(&format!(
            "      I/O: {} -> {}\n",
            spec.input_type, spec.output_type
        ));
    }
    line
}

/// Full view of one agent, including its system prompt.
pub fn generate_agent_detail(agent: &Agent) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", agent.name));
    output.push_str(&format!("{}\n\n", agent.description));
    if agent.tools.is_empty() {
        output.push_str("Tools: none\n\n");
    } else {
        output.push_str(&format!("Tools: {}\n\n", agent.tools.join(", ")));
    }
    output.push_str("## System prompt\n\n");
    output.push_str(&agent.system_prompt);
    output.push('\n');

    output
}

/// Numbered list of swarms with their embedded agents.
pub fn generate_swarm_list(swarms: &[Swarm]) -> String {
    if swarms.is_empty() {
        return "No swarms saved yet. Create one with `swarmsmith swarm create <file.json>`.\n"
            .to_string();
    }

    let mut output = format!("🐝 {} swarm(s)\n\n", swarms.len());
    for (i, swarm) in swarms.iter().enumerate() {
        output.push_str(&format!("  [{}] {}\n", i, swarm.name));
        if let Some(ref desc) = swarm.description {
            output.push_str(&format!("      {}\n", desc));
        }
        let names: Vec<&str> = swarm.agents.iter().map(|a| a.name.as_str()).collect();
        if names.is_empty() {
            output.push_str("      Agents: none\n");
        } else {
            output.push_str(&format!("      Agents: {}\n", names.join(", ")));
        }
    }
    output
}

pub fn generate_launch(result: &LaunchResult) -> String {
    format!(
        "🧵 Session: {}\n\n{}\n",
        result.session_id, result.response
    )
}

pub fn generate_resume(result: &ResumeResult) -> String {
    format!("{}\n", result.response)
}

pub fn generate_test_result(result: &AgentTestResult) -> String {
    let mut output = String::new();

    if result.success {
        output.push_str("✅ Agent test succeeded\n");
    } else {
        output.push_str("❌ Agent test failed\n");
    }
    if let Some(ref id) = result.session_id {
        output.push_str(&format!("   Session: {}\n", id));
    }
    if let Some(ref error) = result.error {
        output.push_str(&format!("   Error: {}\n", error));
    }
    if !result.output.is_empty() {
        output.push_str(&format!("\n{}\n", result.output));
    }

    output
}

/// Compatibility verdict with per-agent scores, gaps and suggestions.
pub fn generate_compatibility(result: &CompatibilityResult) -> String {
    let mut output = String::new();

    let verdict = if result.is_compatible {
        "Compatible"
    } else {
        "Not compatible"
    };
    output.push_str(&format!(
        "{} {} (score {}/100)\n\n",
        score_emoji(result.overall_score),
        verdict,
        result.overall_score
    ));

    if !result.analysis.is_empty() {
        output.push_str(&format!("{}\n\n", result.analysis));
    }

    if !result.agent_scores.is_empty() {
        output.push_str("Agent scores:\n");
        for (name, score) in &result.agent_scores {
            output.push_str(&format!(
                "  {} {:>3}  {}",
                score_emoji(score.score),
                score.score,
                name
            ));
            if !score.reason.is_empty() {
                output.push_str(&format!(": {}", score.reason));
            }
            output.push('\n');
        }
        output.push('\n');
    }

    push_bullets(&mut output, "Gaps", &result.gaps);
    push_bullets(&mut output, "Suggestions", &result.suggestions);

    output
}

fn push_bullets(output: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    output.push_str(&format!("{}:\n", title));
    for item in items {
        output.push_str(&format!("  - {}\n", item));
    }
    output.push('\n');
}

pub fn generate_tool_search(result: &ToolSearchResult) -> String {
    let mut output = String::new();

    if result.found_tools.is_empty() {
        output.push_str("🔍 No tools found\n");
    } else {
        output.push_str(&format!("🔍 Found {} tool(s)\n\n", result.found_tools.len()));
        for tool in &result.found_tools {
            let badge = if tool.is_official { " (official)" } else { "" };
            output.push_str(&format!("  • {}{}\n", tool.name, badge));
            if !tool.description.is_empty() {
                output.push_str(&format!("    {}\n", tool.description));
            }
            if let Some(ref cmd) = tool.install_command {
                output.push_str(&format!("    Install: {}\n", cmd));
            }
        }
    }

    if !result.search_summary.is_empty() {
        output.push_str(&format!("\n{}\n", result.search_summary));
    }

    output
}

pub fn generate_tool_suggestions(result: &ToolSuggestions) -> String {
    let mut output = generate_installed_tools(&result.installed_tools);
    output.push('\n');

    if result.suggestions.is_empty() {
        output.push_str("No suggestions available right now.\n");
    } else {
        output.push_str(&format!("💡 Suggestions\n\n{}\n", result.suggestions));
    }

    output
}

pub fn generate_installed_tools(tools: &[String]) -> String {
    if tools.is_empty() {
        return "🔌 No MCP servers installed\n".to_string();
    }

    let mut output = format!("🔌 {} MCP server(s) installed\n", tools.len());
    for tool in tools {
        output.push_str(&format!("  - {}\n", tool));
    }
    output
}

/// Serialize any result record as pretty JSON.
pub fn generate_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}
