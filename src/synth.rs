//! Pipeline synthesizer: turns resolved task descriptors plus the resource
//! registry into the declared-resource / build-task / pipeline / run-request
//! object graph, in submission order.

use std::rc::Rc;

use tracing::debug;

use crate::error::Error;
use crate::image::{BuildResource, RepoRef};
use crate::objects::{
    Inputs, Outputs, Param, ParamSpec, Pipeline, PipelineDeclaredResource, PipelineRef,
    PipelineResource, PipelineResourceBinding, PipelineRun, PipelineRunSpec, PipelineSpec,
    PipelineTask, PipelineTaskInputResource, PipelineTaskOutputResource, PipelineTaskResources,
    PipelineTrigger, ResourceRef, ResourceType, Step, Task, TaskRef, TaskResource, TaskSpec,
};
use crate::registry::ResourceRegistry;
use crate::resolver::TaskDescriptor;

/// Image used by the fetch step of every generated build task.
const FETCH_IMAGE: &str = "alpine/git";
/// Image used by the build-and-push step of every generated build task.
const BUILD_IMAGE: &str = "gcr.io/kaniko-project/executor";

/// Caller-controlled synthesis knobs.
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    /// Registry host prefixed onto every built image reference.
    pub registry: String,
    /// Upstream repository for the workflow itself and for local-path
    /// action sources.
    pub repo: Option<RepoRef>,
}

/// The synthesized objects for one workflow, in submission order within
/// a [`Manifest`].
#[derive(Debug, Clone)]
pub struct WorkflowPipeline {
    pub pipeline: Pipeline,
    pub primary_task: Task,
    pub run: PipelineRun,
}

/// Everything one invocation produces. Declared resources and build tasks
/// are shared across workflows and emitted exactly once, ahead of every
/// pipeline that references them.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub resources: Vec<PipelineResource>,
    pub build_tasks: Vec<Task>,
    pub workflows: Vec<WorkflowPipeline>,
}

/// One workflow's name and ordered descriptors, as handed over by the
/// resolver.
pub struct ResolvedWorkflow {
    pub name: String,
    pub tasks: Vec<TaskDescriptor>,
}

/// Lowercase a generated object name and replace spaces with hyphens.
/// Idempotent: repeated application never changes the result.
pub fn convert_name(name: &str) -> String {
    name.replace(' ', "-").to_lowercase()
}

/// Synthesize the full object graph for every resolved workflow against the
/// shared registry. Every object is structurally validated before it is
/// returned; a failure aborts the whole synthesis.
pub fn synthesize(
    resolved: &[ResolvedWorkflow],
    registry: &ResourceRegistry,
    options: &SynthesisOptions,
) -> Result<Manifest, Error> {
    let mut resources = Vec::new();
    let mut build_tasks = Vec::new();

    for resource in registry.iter().filter(|r| r.requires_build()) {
        resources.push(source_resource(resource)?);
        resources.push(image_resource(resource, &options.registry)?);
        build_tasks.push(build_task(resource)?);
    }

    let mut workflows = Vec::new();
    for workflow in resolved {
        workflows.push(synthesize_workflow(workflow, options, &mut resources)?);
    }

    debug!(
        resources = resources.len(),
        build_tasks = build_tasks.len(),
        pipelines = workflows.len(),
        "Synthesized manifest"
    );

    Ok(Manifest {
        resources,
        build_tasks,
        workflows,
    })
}

fn synthesize_workflow(
    workflow: &ResolvedWorkflow,
    options: &SynthesisOptions,
    resources: &mut Vec<PipelineResource>,
) -> Result<WorkflowPipeline, Error> {
    let name = convert_name(&workflow.name);

    // Distinct build-backed resources in first-use order for this workflow.
    let mut builds: Vec<Rc<BuildResource>> = Vec::new();
    for task in &workflow.tasks {
        if task.resource.requires_build()
            && !builds.iter().any(|b| b.name == task.resource.name)
        {
            builds.push(Rc::clone(&task.resource));
        }
    }

    let repo_resource_name = match options.repo.as_ref() {
        Some(repo) => {
            let resource_name = format!("{name}-repo");
            let declared = PipelineResource::new(
                resource_name.clone(),
                ResourceType::Git,
                vec![
                    Param {
                        name: "revision".to_string(),
                        value: repo.revision.clone(),
                    },
                    Param {
                        name: "url".to_string(),
                        value: repo.location.clone(),
                    },
                ],
            );
            declared.validate()?;
            resources.push(declared);
            Some(resource_name)
        }
        None => None,
    };

    let primary_task = primary_task(&name, workflow, &builds, repo_resource_name.as_deref(), options)?;
    let pipeline = pipeline(&name, &builds, repo_resource_name.as_deref())?;
    let run = run_request(&name, &pipeline)?;

    Ok(WorkflowPipeline {
        pipeline,
        primary_task,
        run,
    })
}

/// The declared git resource describing where a build resource's source is
/// fetched from.
fn source_resource(resource: &BuildResource) -> Result<PipelineResource, Error> {
    let source = resource.source.as_ref().ok_or_else(|| Error::Validation {
        kind: "PipelineResource",
        name: resource.name.clone(),
        reason: "build resource has no source".to_string(),
    })?;

    let declared = PipelineResource::new(
        resource.source_resource_name(),
        ResourceType::Git,
        vec![
            Param {
                name: "revision".to_string(),
                value: source.revision.clone(),
            },
            Param {
                name: "url".to_string(),
                value: source.url.clone(),
            },
        ],
    );
    declared.validate()?;
    Ok(declared)
}

/// The declared image resource the build task pushes to.
fn image_resource(resource: &BuildResource, registry: &str) -> Result<PipelineResource, Error> {
    let declared = PipelineResource::new(
        resource.image_resource_name(),
        ResourceType::Image,
        vec![Param {
            name: "url".to_string(),
            value: resource.image_reference(registry),
        }],
    );
    declared.validate()?;
    Ok(declared)
}

/// The fixed two-step build task: fetch the source at the declared revision
/// into the workspace, then build and push an image from the context path.
fn build_task(resource: &BuildResource) -> Result<Task, Error> {
    let source = resource.source.as_ref().ok_or_else(|| Error::Validation {
        kind: "Task",
        name: resource.build_task_name(),
        reason: "build resource has no source".to_string(),
    })?;

    let task = Task::new(
        resource.build_task_name(),
        TaskSpec {
            inputs: Some(Inputs {
                resources: vec![TaskResource {
                    name: "source".to_string(),
                    resource_type: ResourceType::Git,
                }],
                params: vec![ParamSpec {
                    name: "pathToContext".to_string(),
                    description: Some("Build context directory inside the source tree".to_string()),
                    default: Some(resource.context.clone()),
                }],
            }),
            outputs: Some(Outputs {
                resources: vec![TaskResource {
                    name: "image".to_string(),
                    resource_type: ResourceType::Image,
                }],
            }),
            steps: vec![
                Step {
                    name: "fetch-source".to_string(),
                    image: FETCH_IMAGE.to_string(),
                    command: vec!["git".to_string()],
                    args: vec!["checkout".to_string(), source.revision.clone()],
                    env: Vec::new(),
                    env_from: Vec::new(),
                },
                Step {
                    name: "build-and-push".to_string(),
                    image: BUILD_IMAGE.to_string(),
                    command: Vec::new(),
                    args: vec![
                        "--context=/workspace/source$(inputs.params.pathToContext)".to_string(),
                        "--destination=$(outputs.resources.image.url)".to_string(),
                    ],
                    env: Vec::new(),
                    env_from: Vec::new(),
                },
            ],
        },
    );
    task.validate()?;
    Ok(task)
}

/// The aggregate task whose steps are the workflow's runtime actions.
fn primary_task(
    name: &str,
    workflow: &ResolvedWorkflow,
    builds: &[Rc<BuildResource>],
    repo_resource: Option<&str>,
    options: &SynthesisOptions,
) -> Result<Task, Error> {
    let steps = workflow
        .tasks
        .iter()
        .map(|task| Step {
            name: convert_name(&task.name),
            image: task.resource.image_reference(&options.registry),
            command: task.command.clone(),
            args: task.args.clone(),
            env: task.env.clone(),
            env_from: task.env_from.clone(),
        })
        .collect();

    let mut input_resources = Vec::new();
    if let Some(repo_resource) = repo_resource {
        input_resources.push(TaskResource {
            name: repo_resource.to_string(),
            resource_type: ResourceType::Git,
        });
    }
    for build in builds {
        input_resources.push(TaskResource {
            name: build.image_resource_name(),
            resource_type: ResourceType::Image,
        });
    }

    let inputs = if input_resources.is_empty() {
        None
    } else {
        Some(Inputs {
            resources: input_resources,
            params: Vec::new(),
        })
    };

    let task = Task::new(name.to_string(), TaskSpec {
        inputs,
        outputs: None,
        steps,
    });
    task.validate()?;
    Ok(task)
}

/// The pipeline definition: build tasks first (mutually independent), then
/// the primary task, its image inputs wired from the build task outputs.
fn pipeline(
    name: &str,
    builds: &[Rc<BuildResource>],
    repo_resource: Option<&str>,
) -> Result<Pipeline, Error> {
    let mut declared = Vec::new();
    if let Some(repo_resource) = repo_resource {
        declared.push(PipelineDeclaredResource {
            name: repo_resource.to_string(),
            resource_type: ResourceType::Git,
        });
    }
    for build in builds {
        declared.push(PipelineDeclaredResource {
            name: build.source_resource_name(),
            resource_type: ResourceType::Git,
        });
        declared.push(PipelineDeclaredResource {
            name: build.image_resource_name(),
            resource_type: ResourceType::Image,
        });
    }

    let mut tasks = Vec::new();
    for build in builds {
        tasks.push(PipelineTask {
            name: build.build_task_name(),
            task_ref: TaskRef {
                name: build.build_task_name(),
            },
            run_after: Vec::new(),
            resources: Some(PipelineTaskResources {
                inputs: vec![PipelineTaskInputResource {
                    name: "source".to_string(),
                    resource: build.source_resource_name(),
                    from: Vec::new(),
                }],
                outputs: vec![PipelineTaskOutputResource {
                    name: "image".to_string(),
                    resource: build.image_resource_name(),
                }],
            }),
            params: vec![Param {
                name: "pathToContext".to_string(),
                value: build.context.clone(),
            }],
        });
    }

    let mut primary_inputs = Vec::new();
    if let Some(repo_resource) = repo_resource {
        primary_inputs.push(PipelineTaskInputResource {
            name: repo_resource.to_string(),
            resource: repo_resource.to_string(),
            from: Vec::new(),
        });
    }
    for build in builds {
        primary_inputs.push(PipelineTaskInputResource {
            name: build.image_resource_name(),
            resource: build.image_resource_name(),
            from: vec![build.build_task_name()],
        });
    }

    tasks.push(PipelineTask {
        name: name.to_string(),
        task_ref: TaskRef {
            name: name.to_string(),
        },
        run_after: builds.iter().map(|b| b.build_task_name()).collect(),
        resources: if primary_inputs.is_empty() {
            None
        } else {
            Some(PipelineTaskResources {
                inputs: primary_inputs,
                outputs: Vec::new(),
            })
        },
        params: Vec::new(),
    });

    let pipeline = Pipeline::new(format!("{name}-pipeline"), PipelineSpec {
        resources: declared,
        tasks,
    });
    pipeline.validate()?;
    Ok(pipeline)
}

/// The run request: one concrete binding per resource the pipeline declares.
fn run_request(name: &str, pipeline: &Pipeline) -> Result<PipelineRun, Error> {
    let resources = pipeline
        .spec
        .resources
        .iter()
        .map(|declared| PipelineResourceBinding {
            name: declared.name.clone(),
            resource_ref: ResourceRef {
                name: declared.name.clone(),
            },
        })
        .collect();

    let run = PipelineRun::new(format!("{name}-pipeline-run"), PipelineRunSpec {
        pipeline_ref: PipelineRef {
            name: pipeline.metadata.name.clone(),
        },
        trigger: PipelineTrigger {
            trigger_type: "manual",
        },
        resources,
    });
    run.validate()?;
    Ok(run)
}
