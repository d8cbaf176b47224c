use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use pipewright::image::{DEFAULT_REVISION, RepoRef};
use pipewright::render::{OutputFormat, render_document, render_manifest};
use pipewright::resolver::Resolver;
use pipewright::synth::{ResolvedWorkflow, SynthesisOptions, synthesize};
use pipewright::validation::validate_configuration;
use pipewright::workflow::Configuration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, prelude::*};

fn main() -> Result<()> {
    let cli = Cli::parse();

    configure_tracing()?;

    match cli.command {
        Commands::Create {
            filename,
            output,
            repo,
            revision,
            registry,
        } => create(filename, output, repo, revision, registry),
        Commands::Parse { filename, output } => parse(filename, output),
        Commands::Validate { filename, repo } => validate(filename, repo),
    }
}

fn configure_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|err| anyhow!(err.to_string()))?;

    Ok(())
}

fn parse_repo(repo: Option<String>, default_revision: String) -> Option<RepoRef> {
    repo.map(|reference| RepoRef::parse_with_default(&reference, &default_revision))
}

fn create(
    filename: PathBuf,
    output: OutputFormat,
    repo: Option<String>,
    revision: String,
    registry: String,
) -> Result<()> {
    let config = Configuration::load(&filename)?;
    let repo = parse_repo(repo, revision);

    let mut resolver = Resolver::new(&config, repo.clone());
    let mut resolved = Vec::new();
    for workflow in &config.workflows {
        let tasks = resolver.resolve_workflow(workflow)?;
        if tasks.is_empty() {
            warn!(workflow = %workflow.name, "Workflow resolved no runnable actions");
            continue;
        }
        resolved.push(ResolvedWorkflow {
            name: workflow.name.clone(),
            tasks,
        });
    }

    if resolved.is_empty() {
        warn!(file = %filename.display(), "Nothing to synthesize");
        return Ok(());
    }

    let options = SynthesisOptions { registry, repo };
    let manifest = synthesize(&resolved, resolver.registry(), &options)?;

    print!("{}", render_manifest(&manifest, output)?);

    info!(
        file = %filename.display(),
        resources = manifest.resources.len(),
        build_tasks = manifest.build_tasks.len(),
        pipelines = manifest.workflows.len(),
        "Synthesis completed"
    );

    Ok(())
}

fn parse(filename: PathBuf, output: OutputFormat) -> Result<()> {
    let config = Configuration::load(&filename)?;
    print!("{}", render_document(&config, output)?);
    Ok(())
}

fn validate(filename: PathBuf, repo: Option<String>) -> Result<()> {
    let config = Configuration::load(&filename)?;
    let repo = parse_repo(repo, DEFAULT_REVISION.to_string());
    let report = validate_configuration(&config, repo.as_ref());

    for warning in &report.warnings {
        warn!(file = %filename.display(), "{warning}");
    }

    if report.is_ok() {
        info!(file = %filename.display(), "Workflow validation passed");
        Ok(())
    } else {
        for error_msg in &report.errors {
            error!(file = %filename.display(), "{error_msg}");
        }
        Err(anyhow!(
            "Workflow validation failed with {} error(s)",
            report.errors.len()
        ))
    }
}

#[derive(Parser)]
#[command(
    name = "pipewright",
    version,
    about = "Convert declarative workflow descriptions into Tekton-style pipeline resources"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize the full pipeline object stream for every workflow
    Create {
        #[arg(short, long)]
        filename: PathBuf,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,
        /// Upstream git repository, as URL[@REVISION]
        #[arg(long)]
        repo: Option<String>,
        /// Revision used when --repo carries no @REVISION suffix
        #[arg(long, default_value = DEFAULT_REVISION)]
        revision: String,
        /// Registry prefix for built images
        #[arg(short, long, default_value = "knative.registry.svc.cluster.local")]
        registry: String,
    },
    /// Dump the decoded workflow configuration
    Parse {
        #[arg(short, long)]
        filename: PathBuf,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,
    },
    /// Lint a workflow description without generating output
    Validate {
        #[arg(short, long)]
        filename: PathBuf,
        #[arg(long)]
        repo: Option<String>,
    },
}
