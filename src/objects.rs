//! Serializable pipeline object model: the subset of the target
//! orchestration platform's resource types the synthesizer populates,
//! redeclared locally so output stays independent of any client library.

use serde::Serialize;

use crate::error::Error;

pub const API_VERSION: &str = "tekton.dev/v1alpha1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectMeta {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvFromSource {
    pub secret_ref: SecretEnvSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretEnvSource {
    pub name: String,
}

impl EnvFromSource {
    pub fn secret(name: impl Into<String>) -> Self {
        Self {
            secret_ref: SecretEnvSource { name: name.into() },
        }
    }
}

/// One container step of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub name: String,
    pub image: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env_from: Vec<EnvFromSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Resource flavors the synthesizer declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Git,
    Image,
}

/// A declared resource: a retrievable source or produced artifact a
/// pipeline task can consume or produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResource {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub metadata: ObjectMeta,
    pub spec: PipelineResourceSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineResourceSpec {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub params: Vec<Param>,
}

impl PipelineResource {
    pub fn new(name: String, resource_type: ResourceType, params: Vec<Param>) -> Self {
        Self {
            api_version: API_VERSION,
            kind: "PipelineResource",
            metadata: ObjectMeta { name },
            spec: PipelineResourceSpec {
                resource_type,
                params,
            },
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.metadata.name.is_empty() {
            return Err(validation_error(self.kind, &self.metadata.name, "empty name"));
        }
        for param in &self.spec.params {
            if param.name.is_empty() {
                return Err(validation_error(
                    self.kind,
                    &self.metadata.name,
                    "unnamed parameter",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResource {
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Inputs {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<TaskResource>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outputs {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<TaskResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Inputs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Outputs>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub metadata: ObjectMeta,
    pub spec: TaskSpec,
}

impl Task {
    pub fn new(name: String, spec: TaskSpec) -> Self {
        Self {
            api_version: API_VERSION,
            kind: "Task",
            metadata: ObjectMeta { name },
            spec,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.metadata.name.is_empty() {
            return Err(validation_error(self.kind, &self.metadata.name, "empty name"));
        }
        if self.spec.steps.is_empty() {
            return Err(validation_error(
                self.kind,
                &self.metadata.name,
                "no steps defined",
            ));
        }
        for step in &self.spec.steps {
            if step.image.is_empty() {
                return Err(validation_error(
                    self.kind,
                    &self.metadata.name,
                    &format!("step '{}' has no image", step.name),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTaskInputResource {
    pub name: String,
    pub resource: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub from: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineTaskOutputResource {
    pub name: String,
    pub resource: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineTaskResources {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<PipelineTaskInputResource>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<PipelineTaskOutputResource>,
}

/// One task invocation inside a pipeline definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTask {
    pub name: String,
    pub task_ref: TaskRef,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub run_after: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<PipelineTaskResources>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDeclaredResource {
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSpec {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<PipelineDeclaredResource>,
    pub tasks: Vec<PipelineTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub metadata: ObjectMeta,
    pub spec: PipelineSpec,
}

impl Pipeline {
    pub fn new(name: String, spec: PipelineSpec) -> Self {
        Self {
            api_version: API_VERSION,
            kind: "Pipeline",
            metadata: ObjectMeta { name },
            spec,
        }
    }

    /// Structural validation: every task reference must be unique and every
    /// resource a task binds must be declared by the pipeline.
    pub fn validate(&self) -> Result<(), Error> {
        if self.metadata.name.is_empty() {
            return Err(validation_error(self.kind, &self.metadata.name, "empty name"));
        }
        if self.spec.tasks.is_empty() {
            return Err(validation_error(
                self.kind,
                &self.metadata.name,
                "no tasks defined",
            ));
        }

        let mut task_names = std::collections::HashSet::new();
        for task in &self.spec.tasks {
            if !task_names.insert(task.name.as_str()) {
                return Err(validation_error(
                    self.kind,
                    &self.metadata.name,
                    &format!("duplicate task '{}'", task.name),
                ));
            }
        }

        let declared: std::collections::HashSet<_> = self
            .spec
            .resources
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        for task in &self.spec.tasks {
            let Some(resources) = &task.resources else {
                continue;
            };
            for input in &resources.inputs {
                if !declared.contains(input.resource.as_str()) {
                    return Err(validation_error(
                        self.kind,
                        &self.metadata.name,
                        &format!(
                            "task '{}' binds undeclared resource '{}'",
                            task.name, input.resource
                        ),
                    ));
                }
            }
            for output in &resources.outputs {
                if !declared.contains(output.resource.as_str()) {
                    return Err(validation_error(
                        self.kind,
                        &self.metadata.name,
                        &format!(
                            "task '{}' binds undeclared resource '{}'",
                            task.name, output.resource
                        ),
                    ));
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRef {
    pub name: String,
}

/// A concrete resource bound to a pipeline-declared resource by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResourceBinding {
    pub name: String,
    pub resource_ref: ResourceRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTrigger {
    #[serde(rename = "type")]
    pub trigger_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunSpec {
    pub pipeline_ref: PipelineRef,
    pub trigger: PipelineTrigger,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<PipelineResourceBinding>,
}

/// The run request: binds concrete resource instances to a pipeline
/// definition to trigger one execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub metadata: ObjectMeta,
    pub spec: PipelineRunSpec,
}

impl PipelineRun {
    pub fn new(name: String, spec: PipelineRunSpec) -> Self {
        Self {
            api_version: API_VERSION,
            kind: "PipelineRun",
            metadata: ObjectMeta { name },
            spec,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.metadata.name.is_empty() {
            return Err(validation_error(self.kind, &self.metadata.name, "empty name"));
        }
        if self.spec.pipeline_ref.name.is_empty() {
            return Err(validation_error(
                self.kind,
                &self.metadata.name,
                "empty pipeline reference",
            ));
        }
        Ok(())
    }
}

fn validation_error(kind: &'static str, name: &str, reason: &str) -> Error {
    Error::Validation {
        kind,
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
