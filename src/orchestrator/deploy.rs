//! Forward pass over a group plan.
//!
//! Groups run strictly in plan order because later groups consume the
//! exported outputs of earlier ones. The first error aborts the run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::approval::ApprovalGate;
use crate::artifacts::ArtifactBroker;
use crate::config::{Group, GroupKind, GroupPlan, RunContext, Selection, check_writable_dir};
use crate::error::{ConfigError, Result};
use crate::shell::GroupExecutor;

/// What a group did during a deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOutcome {
    /// Terraform ran and its outputs were exported.
    Applied,
    /// Packer built an image.
    Built,
    /// The operator declined the image build.
    Declined,
    /// Not selected for this run.
    Skipped,
}

/// Per-group line of a deploy report.
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    /// Group name.
    pub group: String,
    /// Group kind.
    pub kind: GroupKind,
    /// What happened.
    pub outcome: GroupOutcome,
}

/// Result of a successful deploy.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    /// Deployment root.
    pub deployment_root: PathBuf,
    /// Where outputs and the expanded plan can be inspected.
    pub artifacts_dir: PathBuf,
    /// Groups in plan order.
    pub groups: Vec<GroupReport>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

/// Deploys a plan group by group.
pub struct DeployOrchestrator<'a> {
    /// Run context.
    ctx: &'a RunContext,
    /// Tool runner.
    executor: &'a dyn GroupExecutor,
    /// Intergroup artifact exchange.
    broker: &'a dyn ArtifactBroker,
    /// Approval for image builds.
    gate: &'a ApprovalGate,
}

impl<'a> DeployOrchestrator<'a> {
    /// Creates a deploy orchestrator.
    #[must_use]
    pub const fn new(
        ctx: &'a RunContext,
        executor: &'a dyn GroupExecutor,
        broker: &'a dyn ArtifactBroker,
        gate: &'a ApprovalGate,
    ) -> Self {
        Self {
            ctx,
            executor,
            broker,
            gate,
        }
    }

    /// Validates the run and deploys every selected group.
    ///
    /// # Errors
    ///
    /// Returns the first configuration, tool, or execution error. Nothing
    /// runs if validation fails.
    pub async fn run(&self, plan: &GroupPlan, selection: &Selection) -> Result<DeployReport> {
        let started_at = Utc::now();
        self.preflight(plan, selection)?;

        let mut groups = Vec::with_capacity(plan.groups().len());
        for group in plan.groups() {
            let outcome = if selection.is_selected(&group.name) {
                self.deploy_group(group, plan).await?
            } else {
                info!("skipping group {}", group.name);
                GroupOutcome::Skipped
            };
            groups.push(GroupReport {
                group: group.name.to_string(),
                kind: group.kind(),
                outcome,
            });
        }

        info!(
            "Deployment complete; outputs and plan are in {}",
            self.ctx.artifacts_dir.display()
        );
        Ok(DeployReport {
            deployment_root: self.ctx.deployment_root.clone(),
            artifacts_dir: self.ctx.artifacts_dir.clone(),
            groups,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Checks everything that can be checked before the first side effect.
    fn preflight(&self, plan: &GroupPlan, selection: &Selection) -> Result<()> {
        selection.validate(plan)?;
        check_writable_dir(&self.ctx.artifacts_dir)?;
        self.ctx.validate_deployment_directory(plan)?;
        for group in plan.groups().iter().filter(|g| selection.is_selected(&g.name)) {
            self.executor
                .check_tool(group.kind(), &group.dir(&self.ctx.deployment_root))?;
        }
        Ok(())
    }

    async fn deploy_group(&self, group: &Group, plan: &GroupPlan) -> Result<GroupOutcome> {
        let group_dir = group.dir(&self.ctx.deployment_root);
        self.broker.import(group, &group_dir, plan).await?;

        match group.kind() {
            GroupKind::Terraform => {
                let outputs = self.executor.apply(&group_dir).await?;
                self.broker.export(&group.name, &outputs).await?;
                Ok(GroupOutcome::Applied)
            }
            GroupKind::Packer => {
                let module_dir = group_dir.join(&group.packer_module()?.id);
                self.build_image(&module_dir).await
            }
            kind @ GroupKind::Unknown => Err(ConfigError::UnsupportedKind {
                group: group.name.to_string(),
                kind: kind.to_string(),
            }
            .into()),
        }
    }

    async fn build_image(&self, module_dir: &Path) -> Result<GroupOutcome> {
        let proposal = format!("Proposed change: use packer to build image in {}", module_dir.display());
        info!("{proposal}");
        if !self.gate.decide(&format!("{proposal}. Build image?")) {
            warn!("Image build in {} was not approved", module_dir.display());
            return Ok(GroupOutcome::Declined);
        }
        self.executor.packer_build(module_dir).await?;
        Ok(GroupOutcome::Built)
    }
}
