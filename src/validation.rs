use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::Error;
use crate::image::{self, RepoRef};
use crate::workflow::Configuration;

/// Collected lint findings over a parsed configuration. Unlike the
/// fail-fast resolver, validation walks the whole description and reports
/// every problem at once.
#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

pub fn validate_configuration(
    config: &Configuration,
    repo: Option<&RepoRef>,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.workflows.is_empty() {
        report.errors.push("No workflows defined".into());
    }
    if config.actions.is_empty() {
        report.errors.push("No actions defined".into());
    }

    let mut workflow_names = HashSet::new();
    for workflow in &config.workflows {
        if !workflow_names.insert(workflow.name.as_str()) {
            report
                .errors
                .push(format!("Duplicate workflow name: '{}'", workflow.name));
        }
        if workflow.resolves.is_empty() {
            report.errors.push(format!(
                "Workflow '{}' resolves no actions",
                workflow.name
            ));
        }
        for entry in &workflow.resolves {
            if config.action(entry).is_none() {
                report.errors.push(format!(
                    "Workflow '{}' resolves unknown action '{}'",
                    workflow.name, entry
                ));
            }
        }
    }

    for action in &config.actions {
        for need in &action.needs {
            if config.action(need).is_none() {
                report.errors.push(format!(
                    "Action '{}' needs unknown action '{}'",
                    action.name, need
                ));
            }
        }

        let Some(uses) = &action.uses else {
            if action.runs.is_some() || action.args.is_some() {
                report.warnings.push(format!(
                    "Action '{}' has a command but no 'uses' reference; it will emit no task",
                    action.name
                ));
            }
            continue;
        };

        match image::classify(&action.name, uses, repo) {
            Ok(_) => {}
            Err(Error::MissingRepository { action }) => {
                // Only fatal at synthesis time; at lint time the repo flag
                // may simply not have been passed yet.
                report.warnings.push(format!(
                    "Action '{action}' uses a local path; synthesis will require --repo"
                ));
            }
            Err(err) => report.errors.push(err.to_string()),
        }
    }

    report.merge(detect_cycles(config));
    report
}

/// Whole-graph cycle check with DFS coloring, independent of any workflow's
/// entry points so cycles in unreachable actions are still reported.
fn detect_cycles(config: &Configuration) -> ValidationReport {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    fn dfs(
        name: &str,
        config: &Configuration,
        color: &mut HashMap<String, Color>,
        stack: &mut Vec<String>,
        report: &mut ValidationReport,
    ) {
        color.insert(name.to_string(), Color::Gray);
        stack.push(name.to_string());

        if let Some(action) = config.action(name) {
            for need in &action.needs {
                match color.get(need.as_str()).copied().unwrap_or(Color::White) {
                    Color::Gray => {
                        let mut cycle: Vec<&str> = stack
                            .iter()
                            .skip_while(|entry| *entry != need)
                            .map(String::as_str)
                            .collect();
                        cycle.push(need);
                        report
                            .errors
                            .push(format!("Cyclic dependency: {}", cycle.join(" -> ")));
                    }
                    Color::White => dfs(need, config, color, stack, report),
                    Color::Black => {}
                }
            }
        }

        stack.pop();
        color.insert(name.to_string(), Color::Black);
    }

    let mut report = ValidationReport::default();
    let mut color = HashMap::new();
    let mut stack = Vec::new();
    for action in &config.actions {
        if color.get(action.name.as_str()).copied().unwrap_or(Color::White) == Color::White {
            dfs(&action.name, config, &mut color, &mut stack, &mut report);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::Configuration;

    fn validate(yaml: &str) -> ValidationReport {
        let config = Configuration::from_yaml(yaml).unwrap();
        validate_configuration(&config, None)
    }

    #[test]
    fn clean_configuration_passes() {
        let report = validate(
            r#"
workflows:
  - name: ci
    resolves: [build]
actions:
  - name: build
    uses: docker://golang:1.21
"#,
        );
        assert!(report.is_ok(), "unexpected errors: {:?}", report.errors);
    }

    #[test]
    fn dangling_references_are_reported() {
        let report = validate(
            r#"
workflows:
  - name: ci
    resolves: [missing]
actions:
  - name: build
    needs: [also-missing]
    uses: docker://golang:1.21
"#,
        );
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn unsupported_reference_is_an_error() {
        let report = validate(
            r#"
workflows:
  - name: ci
    resolves: [build]
actions:
  - name: build
    uses: not-a-reference
"#,
        );
        assert!(!report.is_ok());
        assert!(report.errors[0].contains("unsupported reference"));
    }

    #[test]
    fn local_path_without_repo_is_a_warning() {
        let report = validate(
            r#"
workflows:
  - name: ci
    resolves: [lint]
actions:
  - name: lint
    uses: ./tools/lint
"#,
        );
        assert!(report.is_ok());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn cycles_are_reported_even_when_unreachable() {
        let report = validate(
            r#"
workflows:
  - name: ci
    resolves: [build]
actions:
  - name: build
    uses: docker://golang:1.21
  - name: a
    needs: [b]
  - name: b
    needs: [a]
"#,
        );
        assert!(!report.is_ok());
        assert!(report.errors.iter().any(|e| e.contains("Cyclic dependency")));
    }
}
