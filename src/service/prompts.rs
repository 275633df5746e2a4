//! Prompt text sent to the orchestration runtime by the request handlers.

use crate::models::{Agent, InputType, OutputType, TestFile};

/// List agents as `- name: description (tools: a, b)` lines.
fn describe_agents(agents: &[Agent]) -> String {
    if agents.is_empty() {
        return "(no agents)".to_string();
    }

    agents
        .iter()
        .map(|a| {
            if a.tools.is_empty() {
                format!("- {}: {}", a.name, a.description)
            } else {
                format!("- {}: {} (tools: {})", a.name, a.description, a.tools.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn tools_or_none(tools: &[String]) -> String {
    if tools.is_empty() {
        "none".to_string()
    } else {
        tools.join(", ")
    }
}

pub fn enhance_agent(prompt: &str, agent_name: &str, tools: &[String]) -> String {
    format!(
        "Improve the following system prompt for an AI agent named \"{}\" that can use these tools: {}.\n\
         Make it clearer, more specific and more actionable. Keep the original intent, state the \
         agent's responsibilities, working process and output expectations.\n\
         Respond with the improved system prompt only, no commentary.\n\n\
         Current system prompt:\n{}",
        agent_name,
        tools_or_none(tools),
        prompt
    )
}

pub fn enhance_swarm(prompt: &str, swarm_name: &str, agents: &[Agent]) -> String {
    format!(
        "Improve the following supervisor prompt for the agent swarm \"{}\".\n\
         The supervisor coordinates these agents:\n{}\n\n\
         Make the goal, the hand-offs between agents and the expected final deliverable explicit. \
         Respond with the improved prompt only, no commentary.\n\n\
         Current prompt:\n{}",
        swarm_name,
        describe_agents(agents),
        prompt
    )
}

const COMPATIBILITY_FORMAT: &str = r#"Respond with a single JSON object in exactly this shape:
{
  "isCompatible": true,
  "overallScore": 0-100,
  "analysis": "short explanation",
  "agentScores": {"<agent name>": {"score": 0-100, "reason": "why"}},
  "gaps": ["missing capability"],
  "suggestions": ["concrete improvement"]
}"#;

pub fn swarm_compatibility(purpose: &str, agents: &[Agent]) -> String {
    format!(
        "Assess whether this set of agents can accomplish the swarm's purpose.\n\n\
         Purpose:\n{}\n\nAgents:\n{}\n\n{}",
        purpose,
        describe_agents(agents),
        COMPATIBILITY_FORMAT
    )
}

pub fn agent_compatibility(agent: &Agent, task: &str) -> String {
    format!(
        "Assess whether this agent can accomplish the task.\n\n\
         Task:\n{}\n\nAgent:\n{}\n\nSystem prompt:\n{}\n\n{}",
        task,
        describe_agents(std::slice::from_ref(agent)),
        agent.system_prompt,
        COMPATIBILITY_FORMAT
    )
}

pub fn tool_search(terms: &[String]) -> String {
    format!(
        "Search for MCP servers that provide or complement these capabilities: {}.\n\
         Respond with a single JSON object:\n\
         {{\"tools\": [{{\"name\": \"package name\", \"description\": \"what it does\", \
         \"installCommand\": \"npx ...\", \"isOfficial\": false}}], \"summary\": \"one paragraph\"}}",
        terms.join(", ")
    )
}

pub fn tool_suggestions(agent: &Agent, installed: &[String]) -> String {
    format!(
        "Analyze this agent and recommend MCP servers that would close its capability gaps.\n\n\
         Agent:\n{}\n\nSystem prompt:\n{}\n\nMCP servers already installed: {}\n\n\
         For each recommendation give the server name, why it helps and how to install it.",
        describe_agents(std::slice::from_ref(agent)),
        agent.system_prompt,
        tools_or_none(installed)
    )
}

/// System prompt appended for an agent under test: its own prompt plus
/// the I/O contract it must honour.
pub fn agent_test_system_prompt(agent: &Agent) -> String {
    let spec = agent.io_spec_or_default();
    let mut prompt = agent.system_prompt.clone();

    prompt.push_str(&format!(
        "\n\nInput type: {}. Output type: {}.",
        spec.input_type, spec.output_type
    ));
    if let Some(ref desc) = spec.input_description {
        prompt.push_str(&format!("\nExpected input: {}", desc));
    }
    if let Some(ref desc) = spec.output_description {
        prompt.push_str(&format!("\nExpected output: {}", desc));
    }
    match spec.output_type {
        OutputType::Json => prompt.push_str("\nRespond with valid JSON only."),
        OutputType::File => {
            prompt.push_str("\nRespond with the complete file content only, no commentary.")
        }
        OutputType::Text | OutputType::Display => {}
    }

    prompt
}

/// User prompt for an agent under test.
pub fn agent_test_input(agent: &Agent, input: &str, file: Option<&TestFile>) -> String {
    let spec = agent.io_spec_or_default();

    match (spec.input_type, file) {
        (_, Some(file)) => {
            let mut prompt = format!("File: {}\n```\n{}\n```", file.name, file.content);
            if !input.trim().is_empty() {
                prompt.push_str(&format!("\n\n{}", input));
            }
            prompt
        }
        (InputType::Json, None) => format!("JSON input:\n```json\n{}\n```", input),
        (InputType::None, None) if input.trim().is_empty() => "Run your task.".to_string(),
        _ => input.to_string(),
    }
}
