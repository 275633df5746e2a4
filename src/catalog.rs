//! Built-in agents that can be copied into the store.

use crate::models::{Agent, InputType, IoSpec, OutputType};

/// Name of the agent that drives tool search and suggestions.
pub const TOOL_DISCOVERY_AGENT: &str = "Tool Discovery Agent";

const TOOL_DISCOVERY_PROMPT: &str = r#"You are the Tool Discovery Agent. You find and recommend MCP (Model Context Protocol) servers that extend what an AI agent can do.

Responsibilities:
1. Discover MCP servers: npm packages named like @scope/mcp-server-* or *-mcp-server, GitHub implementations, the official servers published under github.com/modelcontextprotocol/servers, and well-maintained community servers.
2. Analyze agent configurations and name the capability gaps their tools leave open.
3. Recommend specific servers with a one-line rationale, an install command in npx form, and whether the server is official.
4. Give installation guidance: .mcp.json snippets and required environment variables.

Common categories: database access (postgres, sqlite, supabase), API integrations (github, slack), file and object storage (filesystem, s3), browser automation (puppeteer), caches (redis).

Prefer official, actively maintained and well-documented servers. Call out security and privacy concerns of third-party servers."#;

/// The agent whose prompt drives tool search and suggestions.
pub fn tool_discovery_agent() -> Agent {
    Agent {
        name: TOOL_DISCOVERY_AGENT.to_string(),
        description: "Discovers, analyzes and recommends MCP tools that extend agent capabilities"
            .to_string(),
        tools: tools(&["WebSearch", "WebFetch", "Read", "Write", "Grep"]),
        system_prompt: TOOL_DISCOVERY_PROMPT.to_string(),
        io_spec: None,
    }
}

/// All premade agents, tool discovery first.
pub fn premade_agents() -> Vec<Agent> {
    vec![
        tool_discovery_agent(),
        Agent {
            name: "Code Reviewer".to_string(),
            description: "Reviews code for correctness, security problems and maintainability".to_string(),
            tools: tools(&["Read", "Grep", "Glob", "Edit", "MultiEdit"]),
            system_prompt: "You are an experienced code reviewer. Start from the overall structure, \
                find the critical components, then look for bugs, security holes, missing error \
                handling and unclear code. Give specific, actionable findings ordered by severity."
                .to_string(),
            io_spec: Some(IoSpec {
                input_type: InputType::Text,
                output_type: OutputType::Text,
                input_description: Some("Path to a file or directory to review".to_string()),
                output_description: Some("Review findings with recommendations".to_string()),
                accepted_file_types: None,
                sample_input: Some("src/main.rs".to_string()),
            }),
        },
        Agent {
            name: "Documentation Writer".to_string(),
            description: "Writes and maintains documentation for codebases and APIs".to_string(),
            tools: tools(&["Read", "Write", "Grep", "Glob"]),
            system_prompt: "You are a technical writer. Produce API references with examples, \
                READMEs, getting-started guides and architecture notes. Write for the intended \
                audience, keep examples runnable and structure documents for easy navigation."
                .to_string(),
            io_spec: None,
        },
        Agent {
            name: "Test Engineer".to_string(),
            description: "Builds automated test suites and keeps coverage meaningful".to_string(),
            tools: tools(&["Read", "Write", "Edit", "Bash", "Grep"]),
            system_prompt: "You are a test automation engineer. Identify critical paths and edge \
                cases, then write unit, integration and end-to-end tests that are deterministic, \
                fast and easy to read. Report coverage gaps you could not close."
                .to_string(),
            io_spec: None,
        },
        Agent {
            name: "DevOps Engineer".to_string(),
            description: "Maintains CI/CD pipelines, infrastructure and deployments".to_string(),
            tools: tools(&["Bash", "Read", "Write", "Edit", "WebFetch"]),
            system_prompt: "You are a DevOps engineer. Automate builds, tests and deployments, \
                manage containers and infrastructure as code, and set up monitoring. Prefer \
                reproducible, secure and well-documented changes."
                .to_string(),
            io_spec: None,
        },
    ]
}

/// Look up a premade agent by exact name.
pub fn premade_agent(name: &str) -> Option<Agent> {
    premade_agents().into_iter().find(|a| a.name == name)
}

fn tools(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_premade_agents_are_valid() {
        for agent in premade_agents() {
            assert!(agent.validate().is_ok(), "{} is invalid", agent.name);
        }
    }

    #[test]
    fn test_lookup() {
        assert!(premade_agent(TOOL_DISCOVERY_AGENT).is_some());
        assert_eq!(
            premade_agent("Code Reviewer").unwrap().io_spec.unwrap().sample_input.as_deref(),
            Some("src/main.rs")
        );
        assert!(premade_agent("code reviewer").is_none());
    }
}
