//! Output encoder adapter: renders the synthesized manifest as a stream of
//! `---`-separated YAML or JSON documents, in submission order (resources,
//! build tasks, pipeline, primary task, run request) so referential
//! integrity holds at each step for an eagerly validating consumer.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

use crate::synth::Manifest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

pub fn render_document<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).context("Failed to render YAML output")
        }
        OutputFormat::Json => {
            let mut rendered =
                serde_json::to_string_pretty(value).context("Failed to render JSON output")?;
            rendered.push('\n');
            Ok(rendered)
        }
    }
}

pub fn render_manifest(manifest: &Manifest, format: OutputFormat) -> Result<String> {
    let mut documents = Vec::new();

    for resource in &manifest.resources {
        documents.push(render_document(resource, format)?);
    }
    for task in &manifest.build_tasks {
        documents.push(render_document(task, format)?);
    }
    for workflow in &manifest.workflows {
        documents.push(render_document(&workflow.pipeline, format)?);
        documents.push(render_document(&workflow.primary_task, format)?);
        documents.push(render_document(&workflow.run, format)?);
    }

    Ok(documents.join("---\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Param, PipelineResource, ResourceType};

    #[test]
    fn yaml_and_json_render_the_same_object() {
        let resource = PipelineResource::new(
            "demo-git".to_string(),
            ResourceType::Git,
            vec![Param {
                name: "url".to_string(),
                value: "https://github.com/org/repo".to_string(),
            }],
        );

        let yaml = render_document(&resource, OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("kind: PipelineResource"));

        let json = render_document(&resource, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["kind"], "PipelineResource");
        assert_eq!(parsed["spec"]["type"], "git");
    }
}
