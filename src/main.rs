//! hpcctl CLI entrypoint.
//!
//! This is the main entrypoint for the hpcctl command-line tool.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use hpc_deploy_orchestrator::approval::{ApplyBehavior, ApprovalGate};
use hpc_deploy_orchestrator::artifacts::{ArtifactBroker, LocalArtifactBroker};
use hpc_deploy_orchestrator::cli::{Cli, Commands, OutputFormat, OutputFormatter, RunArgs};
use hpc_deploy_orchestrator::cloud::{AccessTokenSource, ComputeClient, FirewallCleaner};
use hpc_deploy_orchestrator::config::{GroupKind, GroupName, GroupPlan, PlanLoader, RunContext, default_artifacts_dir};
use hpc_deploy_orchestrator::error::{ConfigError, OrchestratorError, Result};
use hpc_deploy_orchestrator::orchestrator::{
    DeployOrchestrator, DestroyOrchestrator, write_packer_destroy_instructions, write_post_deploy_instructions,
};
use hpc_deploy_orchestrator::shell::{CommandRunner, Console, GroupExecutor, ShellExecutor};

use tracing::{Instrument, debug, info_span};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose, cli.output);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let span = info_span!("run", id = %Uuid::new_v4());
    match runtime.block_on(run(cli).instrument(span)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", OutputFormatter::format_error(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool, output: OutputFormat) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match output {
        OutputFormat::Json => builder.json().init(),
        OutputFormat::Text => builder.init(),
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Deploy { run } => cmd_deploy(run, &formatter).await,
        Commands::Destroy {
            run,
            robust,
            compute_endpoint,
        } => cmd_destroy(run, robust, &compute_endpoint, &formatter).await,
        Commands::ExportOutputs { group_dir, artifacts } => {
            cmd_export_outputs(&group_dir, artifacts, &formatter).await
        }
        Commands::ImportInputs { group_dir, artifacts } => cmd_import_inputs(&group_dir, artifacts).await,
    }
}

/// Builds the run context and loads the plan for deploy or destroy.
fn prepare(run: &RunArgs) -> Result<(RunContext, GroupPlan)> {
    let ctx = RunContext::new(&run.deployment_dir, ApplyBehavior::from_auto_approve(run.auto_approve))
        .with_artifacts_dir(run.artifacts.clone());
    let loader = PlanLoader::new().with_base_path(&ctx.deployment_root);
    loader.load_dotenv()?;
    let plan = loader.load_from_artifacts(&ctx.artifacts_dir)?;
    debug!("Apply behavior: {:?}", ctx.behavior);
    Ok((ctx, plan))
}

fn shell_executor(gate: &ApprovalGate) -> ShellExecutor {
    let runner = CommandRunner::new(Arc::new(Console::stderr()));
    ShellExecutor::new(runner, gate.clone())
}

/// Deploy every selected group.
async fn cmd_deploy(run: RunArgs, formatter: &OutputFormatter) -> Result<()> {
    let (ctx, plan) = prepare(&run)?;
    let gate = ApprovalGate::interactive(ctx.behavior);
    let executor = shell_executor(&gate);
    let broker = LocalArtifactBroker::new(&ctx.artifacts_dir);

    let report = DeployOrchestrator::new(&ctx, &executor, &broker, &gate)
        .run(&plan, &run.groups.selection())
        .await?;

    eprintln!("{}", formatter.format_deploy(&report));
    write_post_deploy_instructions(&mut std::io::stderr(), &ctx.deployment_root, &ctx.artifacts_dir)?;
    Ok(())
}

/// Destroy every selected group.
async fn cmd_destroy(run: RunArgs, robust: bool, compute_endpoint: &str, formatter: &OutputFormatter) -> Result<()> {
    let (ctx, plan) = prepare(&run)?;
    let gate = ApprovalGate::interactive(ctx.behavior);
    let executor = shell_executor(&gate);
    let broker = LocalArtifactBroker::new(&ctx.artifacts_dir);
    let client = ComputeClient::new(compute_endpoint, AccessTokenSource::from_env())?;
    let cleanup = FirewallCleaner::new(client, gate.clone());

    let outcome = DestroyOrchestrator::new(&ctx, &executor, &broker, &cleanup, &gate)
        .run(&plan, &run.groups.selection(), robust)
        .await?;

    eprintln!("{}", formatter.format_destroy(&ctx.deployment_root, &outcome));
    write_packer_destroy_instructions(&mut std::io::stderr(), &outcome.packer_manifests)?;
    Ok(())
}

/// Resolves a group directory to its deployment root, artifacts directory, and plan.
fn locate_group(group_dir: &Path, artifacts: Option<PathBuf>) -> Result<(PathBuf, PathBuf, GroupPlan, GroupName)> {
    let group_dir = group_dir.canonicalize()?;
    let (Some(root), Some(name)) = (group_dir.parent(), group_dir.file_name()) else {
        return Err(OrchestratorError::internal(format!(
            "{} is not a group directory inside a deployment",
            group_dir.display()
        )));
    };
    let artifacts_dir = artifacts.unwrap_or_else(|| default_artifacts_dir(root));
    let plan = PlanLoader::new().load_from_artifacts(&artifacts_dir)?;
    let name = GroupName::new(name.to_string_lossy());
    plan.group(&name)?;
    Ok((root.to_path_buf(), artifacts_dir, plan, name))
}

/// Export a Terraform group's outputs.
async fn cmd_export_outputs(group_dir: &Path, artifacts: Option<PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let (root, artifacts_dir, plan, name) = locate_group(group_dir, artifacts)?;
    let group = plan.group(&name)?;
    if group.kind() != GroupKind::Terraform {
        return Err(ConfigError::UnsupportedKind {
            group: name.to_string(),
            kind: group.kind().to_string(),
        }
        .into());
    }

    // Reading outputs never changes infrastructure.
    let gate = ApprovalGate::interactive(ApplyBehavior::Never);
    let outputs = shell_executor(&gate).outputs(&group.dir(&root)).await?;
    LocalArtifactBroker::new(&artifacts_dir).export(&name, &outputs).await?;

    eprintln!("{}", formatter.format_outputs(name.as_str(), &outputs));
    Ok(())
}

/// Write a group's intergroup inputs.
async fn cmd_import_inputs(group_dir: &Path, artifacts: Option<PathBuf>) -> Result<()> {
    let (root, artifacts_dir, plan, name) = locate_group(group_dir, artifacts)?;
    let group = plan.group(&name)?;
    LocalArtifactBroker::new(&artifacts_dir)
        .import(group, &group.dir(&root), &plan)
        .await
}
