//! Terraform command sequences for one deployment group.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::approval::{ApplyBehavior, ApprovalGate};
use crate::error::{ExecutionError, OrchestratorError, Result};

use super::executor::Outputs;
use super::runner::{CommandRunner, Invocation};

/// Hint shown when terraform is not installed.
pub const TERRAFORM_HINT: &str =
    "must have a copy of terraform installed in PATH (obtain at https://terraform.io)";

const MISSING_VARIABLE: &str = "No value for required variable";

/// Terraform bound to one group's working directory.
#[derive(Debug)]
pub struct Terraform<'a> {
    runner: &'a CommandRunner,
    binary: PathBuf,
    working_dir: PathBuf,
}

/// One entry of `terraform output -json`.
#[derive(Debug, Deserialize)]
struct OutputEntry {
    #[serde(default)]
    sensitive: bool,
    value: serde_json::Value,
}

impl<'a> Terraform<'a> {
    /// Resolves the terraform binary for `working_dir`.
    ///
    /// # Errors
    ///
    /// Returns `ToolNotFound` if terraform is not installed.
    pub fn configure(runner: &'a CommandRunner, working_dir: &Path) -> Result<Self> {
        let binary = runner.require("terraform", TERRAFORM_HINT)?;
        Ok(Self {
            runner,
            binary,
            working_dir: working_dir.to_path_buf(),
        })
    }

    fn invocation<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::new(&self.binary, &self.working_dir).args(args)
    }

    /// Tries a lightweight init first and runs a full init if that fails.
    ///
    /// The lightweight init downloads no modules and configures no backend, so it only
    /// succeeds on a root module that was already initialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the full init fails.
    pub async fn init_if_needed(&self) -> Result<()> {
        let light = self.invocation(["init", "-input=false", "-get=false", "-backend=false"]);
        if self.runner.run(&light).await.is_ok() {
            return Ok(());
        }

        info!("Initializing deployment group {}", self.working_dir.display());
        self.runner
            .run(&self.invocation(["init", "-input=false"]))
            .await
            .map_err(|e| {
                self.step_error(
                    e,
                    format!(
                        "initialization of deployment group {} failed; manually resolve errors below",
                        self.working_dir.display()
                    ),
                )
            })?;
        Ok(())
    }

    /// Writes a plan to `plan_file` and reports whether it contains changes.
    ///
    /// # Errors
    ///
    /// Returns an error if planning fails.
    pub async fn plan(&self, plan_file: &Path, destroy: bool) -> Result<bool> {
        let mut args = vec![
            String::from("plan"),
            String::from("-input=false"),
            String::from("-detailed-exitcode"),
            format!("-out={}", plan_file.display()),
        ];
        if destroy {
            args.push(String::from("-destroy"));
        }

        let output = self
            .runner
            .run(&self.invocation(args).success_codes(&[0, 2]))
            .await
            .map_err(|e| {
                let mut help = format!(
                    "terraform plan for deployment group {} failed",
                    self.working_dir.display()
                );
                if let Some(hint) = help_on_plan_error(&e) {
                    help = format!("{help}; {hint}");
                }
                self.step_error(e, help)
            })?;

        Ok(output.code == Some(2))
    }

    /// Renders a saved plan as text.
    ///
    /// # Errors
    ///
    /// Returns an error if `terraform show` fails.
    pub async fn show_plan(&self, plan_file: &Path) -> Result<String> {
        let show = self.invocation([
            String::from("show"),
            String::from("-no-color"),
            plan_file.display().to_string(),
        ]);
        Ok(self.runner.run(&show).await?.stdout)
    }

    /// Applies a saved plan with live console output.
    ///
    /// # Errors
    ///
    /// Returns an error if the apply fails.
    pub async fn apply_plan(&self, plan_file: &Path) -> Result<()> {
        info!("Running terraform apply on deployment group {}", self.working_dir.display());
        let apply = self
            .invocation([
                String::from("apply"),
                String::from("-input=false"),
                plan_file.display().to_string(),
            ])
            .echo(true);
        self.runner.run(&apply).await?;
        Ok(())
    }

    /// Collects the group's outputs.
    ///
    /// # Errors
    ///
    /// Returns an error if `terraform output` fails or its JSON is malformed.
    pub async fn output(&self) -> Result<Outputs> {
        info!("Collecting terraform outputs from {}", self.working_dir.display());
        let output = self
            .runner
            .run(&self.invocation(["output", "-json"]))
            .await
            .map_err(|e| {
                self.step_error(
                    e,
                    format!(
                        "collecting terraform outputs from deployment group {} failed; manually resolve errors below",
                        self.working_dir.display()
                    ),
                )
            })?;
        parse_outputs(&output.stdout)
    }

    /// Plans and, if there are changes and the gate approves, applies.
    ///
    /// Destroy is the same sequence with a destroy plan.
    ///
    /// # Errors
    ///
    /// Returns an error if init, plan, or apply fails.
    pub async fn apply_or_destroy(&self, gate: &ApprovalGate, destroy: bool) -> Result<()> {
        let (action, past_tense) = if destroy {
            ("destroying", "destroyed")
        } else {
            ("adding or changing", "applied")
        };
        let dir = self.working_dir.display();

        self.init_if_needed().await?;

        info!("Testing if deployment group {dir} requires {action} cloud infrastructure");
        let plan_file = tempfile::Builder::new().prefix("plan-").tempfile()?;
        let wants_change = self.plan(plan_file.path(), destroy).await?;

        if !wants_change {
            info!("Cloud infrastructure in deployment group {dir} is already {past_tense}");
            return Ok(());
        }

        info!("Deployment group {dir} requires {action} cloud infrastructure");
        if !self.approve(gate, plan_file.path()).await {
            info!("Proposed changes to deployment group {dir} were not applied");
            return Ok(());
        }

        self.apply_plan(plan_file.path()).await
    }

    /// Asks for approval; a plan that cannot be rendered is never applied.
    async fn approve(&self, gate: &ApprovalGate, plan_file: &Path) -> bool {
        if gate.behavior() == ApplyBehavior::PromptBeforeApply {
            let plan = match self.show_plan(plan_file).await {
                Ok(plan) => plan,
                Err(e) => {
                    error!("Could not render proposed changes to deployment group {}: {e}", self.working_dir.display());
                    return false;
                }
            };
            let summary = plan_summary(&plan).map_or_else(
                || {
                    format!(
                        "Please review full proposed changes for deployment group {}",
                        self.working_dir.display()
                    )
                },
                str::to_string,
            );
            info!("Summary of proposed changes: {summary}");
        }
        gate.decide(&format!(
            "Apply proposed changes to deployment group {}?",
            self.working_dir.display()
        ))
    }

    fn step_error(&self, err: OrchestratorError, help: String) -> OrchestratorError {
        debug!("terraform step failed in {}", self.working_dir.display());
        match err {
            OrchestratorError::Execution(e) => e.with_help(help).into(),
            other => other,
        }
    }
}

/// Extracts the `Plan: ...` line from rendered plan text.
fn plan_summary(plan: &str) -> Option<&str> {
    plan.lines()
        .map(str::trim)
        .find(|line| line.starts_with("Plan: "))
}

/// Suggests a fix when planning failed because intergroup inputs are missing.
fn help_on_plan_error(err: &OrchestratorError) -> Option<&'static str> {
    match err {
        OrchestratorError::Execution(ExecutionError::CommandFailed { stderr, .. })
            if stderr.contains(MISSING_VARIABLE) =>
        {
            Some(r#"run "hpcctl export-outputs" on previous deployment groups to define inputs"#)
        }
        _ => None,
    }
}

/// Parses `terraform output -json` into output values.
fn parse_outputs(json: &str) -> Result<Outputs> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Ok(Outputs::new());
    }
    let entries: BTreeMap<String, OutputEntry> =
        serde_json::from_str(trimmed).map_err(|e| ExecutionError::InvalidOutput {
            program: String::from("terraform"),
            message: e.to_string(),
        })?;

    Ok(entries
        .into_iter()
        .map(|(name, entry)| {
            if entry.sensitive {
                debug!("Output {name} is sensitive");
            }
            (name, entry.value)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_summary() {
        let plan = "\nTerraform will perform the following actions:\n  # google_compute_network.vpc will be created\n\nPlan: 3 to add, 0 to change, 0 to destroy.\n";
        assert_eq!(plan_summary(plan), Some("Plan: 3 to add, 0 to change, 0 to destroy."));
        assert_eq!(plan_summary("No changes."), None);
    }

    #[test]
    fn test_help_on_missing_variable() {
        let failed = |stderr: &str| {
            OrchestratorError::Execution(ExecutionError::CommandFailed {
                program: String::from("terraform"),
                args: String::from("plan"),
                dir: PathBuf::from("/d/primary"),
                status: String::from("exit status: 1"),
                stderr: stderr.to_string(),
            })
        };
        let hint = help_on_plan_error(&failed("Error: No value for required variable\n  on variables.tf"));
        assert!(hint.is_some_and(|h| h.contains("export-outputs")));
        assert!(help_on_plan_error(&failed("Error: Invalid provider")).is_none());
    }

    #[test]
    fn test_parse_outputs() {
        let json = r#"{
            "network_name": {"sensitive": false, "type": "string", "value": "hpc-net"},
            "subnets": {"sensitive": false, "type": ["list", "string"], "value": ["a", "b"]},
            "password": {"sensitive": true, "type": "string", "value": "hunter2"}
        }"#;
        let outputs = parse_outputs(json).unwrap();
        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs["network_name"], json!("hpc-net"));
        assert_eq!(outputs["subnets"], json!(["a", "b"]));

        assert!(parse_outputs("  \n").unwrap().is_empty());
        assert!(parse_outputs("{}").unwrap().is_empty());
        assert!(parse_outputs("not json").is_err());
    }
}
