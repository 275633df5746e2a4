//! Exporting a swarm's agents as standalone definition files.
//!
//! Each agent becomes `<agent>.md` with a small metadata header followed
//! by its system prompt, ready to drop into a runtime's agents directory.

use super::{Store, StoreError};
use crate::models::{Agent, Swarm};
use std::path::PathBuf;
use tracing::{debug, info};

/// Render one agent definition document.
pub fn render_agent_definition(agent: &Agent) -> String {
    let mut doc = String::new();

    doc.push_str("---\n");
    doc.push_str(&format!("name: {}\n", agent.name));
    doc.push_str(&format!("description: {}\n", agent.description));
    if !agent.tools.is_empty() {
        doc.push_str(&format!("tools: {}\n", agent.tools.join(", ")));
    }
    doc.push_str("---\n\n");
    doc.push_str(&agent.system_prompt);

    doc
}

/// Turn a display name into a single safe path component.
pub fn file_stem(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();

    match cleaned.trim_matches('.') {
        "" => "unnamed".to_string(),
        stem => stem.to_string(),
    }
}

impl Store {
    /// Write one definition file per embedded agent; returns the directory.
    pub fn export_swarm(&self, swarm: &Swarm) -> Result<PathBuf, StoreError> {
        let dir = self.export_root().join(file_stem(&swarm.name));
        let io_err = |path: PathBuf| {
            move |source: std::io::Error| StoreError::Io { path, source }
        };

        std::fs::create_dir_all(&dir).map_err(io_err(dir.clone()))?;

        for agent in &swarm.agents {
            let path = dir.join(format!("{}.md", file_stem(&agent.name)));
            std::fs::write(&path, render_agent_definition(agent)).map_err(io_err(path.clone()))?;
            debug!("Exported {}", path.display());
        }

        info!(
            "Exported {} agent definitions to {}",
            swarm.agents.len(),
            dir.display()
        );
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::models::fixtures::{agent, swarm};

    #[test]
    fn test_render_with_tools() {
        let doc = render_agent_definition(&agent("Reviewer"));
        assert!(doc.starts_with(
            "---\nname: Reviewer\ndescription: Reviewer does focused work\ntools: Read, Grep\n---\n\nYou are"
        ));
    }

    #[test]
    fn test_render_without_tools_omits_line() {
        let mut a = agent("Writer");
        a.tools.clear();
        let doc = render_agent_definition(&a);
        assert!(!doc.contains("tools:"));
        assert!(doc.starts_with("---\nname: Writer\ndescription: Writer does focused work\n---\n\n"));
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("Code Reviewer"), "Code Reviewer");
        assert_eq!(file_stem("a/b\\c"), "a-b-c");
        assert_eq!(file_stem(".."), "unnamed");
        assert_eq!(file_stem("   "), "unnamed");
    }

    #[test]
    fn test_export_swarm_writes_one_file_per_agent() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(&StorageConfig::with_root(dir.path()));
        let team = swarm("Release Crew", vec![agent("Reviewer"), agent("Writer")]);

        let out = store.export_swarm(&team).unwrap();
        assert_eq!(out, dir.path().join("temp-agents").join("Release Crew"));

        let reviewer = std::fs::read_to_string(out.join("Reviewer.md")).unwrap();
        assert!(reviewer.contains("name: Reviewer"));
        assert!(out.join("Writer.md").exists());
    }
}
