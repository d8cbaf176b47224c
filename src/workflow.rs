use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// One node in the workflow graph: a unit of work with a name, predecessor
/// edges, and an optional executable reference. An action without `uses` is
/// structural-only; it contributes its predecessors but emits no task.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Action {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
    // Sorted map so emitted env lists are deterministic.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<String>,
}

/// A named set of terminal actions to resolve into an execution pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Workflow {
    pub name: String,
    pub resolves: Vec<String>,
}

/// The parsed workflow description: an ordered list of workflows plus the
/// action graph they resolve against.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Configuration {
    pub workflows: Vec<Workflow>,
    pub actions: Vec<Action>,
}

impl Configuration {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse workflow file: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Configuration =
            serde_yaml::from_str(content).context("Invalid workflow YAML")?;

        let mut seen = std::collections::HashSet::new();
        for action in &config.actions {
            if !seen.insert(action.name.as_str()) {
                bail!("Duplicate action name: '{}'", action.name);
            }
        }

        Ok(config)
    }

    pub fn workflow(&self, name: &str) -> Option<&Workflow> {
        self.workflows.iter().find(|w| w.name == name)
    }

    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }
}

/// Split a shell-style command string into whitespace-separated tokens.
pub fn split_tokens(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_workflow() {
        let config = Configuration::from_yaml(
            r#"
workflows:
  - name: ci
    resolves: [build]
actions:
  - name: build
    uses: docker://golang:1.21
    runs: go build ./...
    env:
      CGO_ENABLED: "0"
"#,
        )
        .unwrap();

        assert_eq!(config.workflows.len(), 1);
        let action = config.action("build").unwrap();
        assert_eq!(action.uses.as_deref(), Some("docker://golang:1.21"));
        assert_eq!(action.env.get("CGO_ENABLED").map(String::as_str), Some("0"));
        assert!(config.action("missing").is_none());
    }

    #[test]
    fn rejects_duplicate_action_names() {
        let err = Configuration::from_yaml(
            r#"
workflows:
  - name: ci
    resolves: [build]
actions:
  - name: build
  - name: build
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Duplicate action name"));
    }

    #[test]
    fn splits_command_tokens() {
        assert_eq!(split_tokens("go  build ./..."), ["go", "build", "./..."]);
        assert!(split_tokens("   ").is_empty());
    }
}
