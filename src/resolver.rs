use std::collections::HashSet;
use std::rc::Rc;

use tracing::debug;

use crate::error::Error;
use crate::image::{self, BuildResource, RepoRef};
use crate::objects::{EnvFromSource, EnvVar};
use crate::registry::ResourceRegistry;
use crate::workflow::{Configuration, Workflow, split_tokens};

/// A resolved runtime action, ready for the synthesizer.
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    pub name: String,
    pub resource: Rc<BuildResource>,
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub env: Vec<EnvVar>,
    pub env_from: Vec<EnvFromSource>,
}

/// Per-invocation resolver context: owns the resource registry shared
/// across all workflows plus the upstream repository reference, so no
/// state lives outside one top-level resolve call.
pub struct Resolver<'a> {
    config: &'a Configuration,
    repo: Option<RepoRef>,
    registry: ResourceRegistry,
}

/// Traversal state scoped to one workflow resolution.
#[derive(Default)]
struct Walk {
    visited: HashSet<String>,
    // Actions on the current recursion path, in visit order. An action
    // re-entered while still on this stack closes a cycle.
    stack: Vec<String>,
    tasks: Vec<TaskDescriptor>,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a Configuration, repo: Option<RepoRef>) -> Self {
        Self {
            config,
            repo,
            registry: ResourceRegistry::new(),
        }
    }

    pub fn repo(&self) -> Option<&RepoRef> {
        self.repo.as_ref()
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Depth-first walk from each terminal action of `workflow`, producing
    /// task descriptors with every dependency ahead of its dependents. Each
    /// action contributes at most one descriptor regardless of how many
    /// paths reach it.
    pub fn resolve_workflow(&mut self, workflow: &Workflow) -> Result<Vec<TaskDescriptor>, Error> {
        let mut walk = Walk::default();
        for entry in &workflow.resolves {
            self.visit(entry, &mut walk)?;
        }
        debug!(
            workflow = %workflow.name,
            tasks = walk.tasks.len(),
            "Resolved workflow"
        );
        Ok(walk.tasks)
    }

    fn visit(&mut self, name: &str, walk: &mut Walk) -> Result<(), Error> {
        if walk.visited.contains(name) {
            return Ok(());
        }
        if walk.stack.iter().any(|entry| entry == name) {
            return Err(Error::CyclicDependency {
                cycle: describe_cycle(&walk.stack, name),
            });
        }

        let action = self
            .config
            .action(name)
            .ok_or_else(|| Error::UnknownAction {
                name: name.to_string(),
            })?;

        walk.stack.push(name.to_string());
        for dependency in &action.needs {
            self.visit(dependency, walk)?;
        }
        walk.stack.pop();

        walk.visited.insert(name.to_string());

        let Some(uses) = &action.uses else {
            // Structural-only node: predecessors walked, no task emitted.
            return Ok(());
        };

        let classified = image::classify(&action.name, uses, self.repo.as_ref())?;
        let key = classified.name.clone();
        let resource = self.registry.get_or_create(&key, || Ok(classified))?;

        walk.tasks.push(TaskDescriptor {
            name: action.name.clone(),
            resource,
            command: action.runs.as_deref().map(split_tokens).unwrap_or_default(),
            args: action.args.as_deref().map(split_tokens).unwrap_or_default(),
            env: action
                .env
                .iter()
                .map(|(name, value)| EnvVar {
                    name: name.clone(),
                    value: value.clone(),
                })
                .collect(),
            env_from: action
                .secrets
                .iter()
                .map(|secret| EnvFromSource::secret(secret.clone()))
                .collect(),
        });

        Ok(())
    }
}

fn describe_cycle(stack: &[String], repeated: &str) -> String {
    let mut names: Vec<&str> = stack
        .iter()
        .skip_while(|entry| *entry != repeated)
        .map(String::as_str)
        .collect();
    names.push(repeated);
    names.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageKind;
    use crate::workflow::Configuration;

    fn config(yaml: &str) -> Configuration {
        Configuration::from_yaml(yaml).unwrap()
    }

    fn resolve(yaml: &str, workflow: &str) -> Result<Vec<TaskDescriptor>, Error> {
        let config = config(yaml);
        let workflow = config.workflow(workflow).unwrap().clone();
        let mut resolver = Resolver::new(&config, None);
        resolver.resolve_workflow(&workflow)
    }

    #[test]
    fn dependencies_precede_dependents() {
        let tasks = resolve(
            r#"
workflows:
  - name: ci
    resolves: [deploy]
actions:
  - name: fetch
    uses: docker://alpine:3.18
  - name: build
    needs: [fetch]
    uses: docker://golang:1.21
  - name: deploy
    needs: [build]
    uses: docker://alpine:3.18
"#,
            "ci",
        )
        .unwrap();

        let order: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(order, ["fetch", "build", "deploy"]);
    }

    #[test]
    fn diamond_graph_visits_each_action_once() {
        let tasks = resolve(
            r#"
workflows:
  - name: ci
    resolves: [release]
actions:
  - name: base
    uses: docker://alpine:3.18
  - name: left
    needs: [base]
    uses: docker://alpine:3.18
  - name: right
    needs: [base]
    uses: docker://alpine:3.18
  - name: release
    needs: [left, right]
    uses: docker://alpine:3.18
"#,
            "ci",
        )
        .unwrap();

        let order: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(order, ["base", "left", "right", "release"]);
    }

    #[test]
    fn structural_actions_emit_no_task() {
        let tasks = resolve(
            r#"
workflows:
  - name: ci
    resolves: [gate]
actions:
  - name: build
    uses: docker://golang:1.21
  - name: gate
    needs: [build]
"#,
            "ci",
        )
        .unwrap();

        let order: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(order, ["build"]);
    }

    #[test]
    fn dangling_need_is_an_unknown_action() {
        let err = resolve(
            r#"
workflows:
  - name: ci
    resolves: [deploy]
actions:
  - name: deploy
    needs: [missing]
    uses: docker://alpine:3.18
"#,
            "ci",
        )
        .unwrap_err();

        assert!(matches!(err, Error::UnknownAction { name } if name == "missing"));
    }

    #[test]
    fn cyclic_needs_fail_instead_of_recursing() {
        let err = resolve(
            r#"
workflows:
  - name: ci
    resolves: [a]
actions:
  - name: a
    needs: [b]
    uses: docker://alpine:3.18
  - name: b
    needs: [a]
    uses: docker://alpine:3.18
"#,
            "ci",
        )
        .unwrap_err();

        match err {
            Error::CyclicDependency { cycle } => assert_eq!(cycle, "a -> b -> a"),
            other => panic!("expected cycle error, got {other}"),
        }
    }

    #[test]
    fn shared_uses_references_share_one_resource() {
        let config = config(
            r#"
workflows:
  - name: ci
    resolves: [lint, format]
actions:
  - name: lint
    uses: ./tools/lint
  - name: format
    uses: ./tools/lint
"#,
        );
        let workflow = config.workflow("ci").unwrap().clone();
        let repo = RepoRef::parse("https://github.com/org/repo@main");
        let mut resolver = Resolver::new(&config, Some(repo));
        let tasks = resolver.resolve_workflow(&workflow).unwrap();

        assert_eq!(tasks.len(), 2);
        assert!(Rc::ptr_eq(&tasks[0].resource, &tasks[1].resource));
        assert_eq!(resolver.registry().len(), 1);
    }

    #[test]
    fn descriptor_captures_command_env_and_secrets() {
        let tasks = resolve(
            r#"
workflows:
  - name: ci
    resolves: [build]
actions:
  - name: build
    uses: docker://golang:1.21
    runs: go build ./...
    args: -v -race
    env:
      GOOS: linux
      CGO_ENABLED: "0"
    secrets: [token]
"#,
            "ci",
        )
        .unwrap();

        let task = &tasks[0];
        assert_eq!(task.resource.kind, ImageKind::ContainerImage);
        assert_eq!(task.command, ["go", "build", "./..."]);
        assert_eq!(task.args, ["-v", "-race"]);
        // BTreeMap-backed env: sorted by name.
        assert_eq!(task.env[0].name, "CGO_ENABLED");
        assert_eq!(task.env[1].name, "GOOS");
        assert_eq!(task.env_from[0].secret_ref.name, "token");
    }
}
