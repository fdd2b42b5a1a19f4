//! Reverse pass over a group plan with bounded retries.
//!
//! A destroy attempt walks the selected groups from last to first. A failed
//! group marks the pass failed; whether the pass goes on to the next group is
//! up to the approval gate. A failed pass is retried from the top until the
//! attempt budget is spent. Robust destroy raises the budget and removes
//! firewall rules before tearing down a network group.

use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::approval::ApprovalGate;
use crate::artifacts::ArtifactBroker;
use crate::cloud::NetworkCleanup;
use crate::config::{Group, GroupKind, GroupPlan, RunContext, Selection};
use crate::error::{ConfigError, OrchestratorError, Result};
use crate::shell::GroupExecutor;

/// Attempts for a robust destroy.
pub const ROBUST_ATTEMPTS: u32 = 3;

/// Packer manifest written next to each image template.
pub const PACKER_MANIFEST: &str = "packer-manifest.json";

/// Result of a successful destroy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DestroyOutcome {
    /// Attempts used, including the successful one.
    pub attempts: u32,
    /// Manifests of images built by Packer groups; images are not deleted.
    pub packer_manifests: Vec<PathBuf>,
}

/// How a single pass ended.
#[derive(Debug, Default)]
struct PassReport {
    failed: bool,
    packer_manifests: Vec<PathBuf>,
}

/// Destroys a plan in reverse order.
pub struct DestroyOrchestrator<'a> {
    /// Run context.
    ctx: &'a RunContext,
    /// Tool runner.
    executor: &'a dyn GroupExecutor,
    /// Intergroup artifact exchange.
    broker: &'a dyn ArtifactBroker,
    /// Firewall cleanup for robust destroy.
    cleanup: &'a dyn NetworkCleanup,
    /// Continuation approval after a failed group.
    gate: &'a ApprovalGate,
}

impl<'a> DestroyOrchestrator<'a> {
    /// Creates a destroy orchestrator.
    #[must_use]
    pub const fn new(
        ctx: &'a RunContext,
        executor: &'a dyn GroupExecutor,
        broker: &'a dyn ArtifactBroker,
        cleanup: &'a dyn NetworkCleanup,
        gate: &'a ApprovalGate,
    ) -> Self {
        Self {
            ctx,
            executor,
            broker,
            cleanup,
            gate,
        }
    }

    /// Destroys every selected group, retrying failed passes.
    ///
    /// # Errors
    ///
    /// Returns a configuration or tool error before anything runs, or
    /// `DestroyExhausted` once every attempt has failed.
    pub async fn run(&self, plan: &GroupPlan, selection: &Selection, robust: bool) -> Result<DestroyOutcome> {
        selection.validate(plan)?;
        self.ctx.validate_deployment_directory(plan)?;
        // Packer groups are never destroyed, so packer need not be installed.
        for group in plan.groups().iter().filter(|g| selection.is_selected(&g.name)) {
            if group.kind() != GroupKind::Packer {
                self.executor
                    .check_tool(group.kind(), &group.dir(&self.ctx.deployment_root))?;
            }
        }

        let max_attempts = if robust { ROBUST_ATTEMPTS } else { 1 };
        for attempt in 1..=max_attempts {
            debug!("Destroy attempt {attempt}/{max_attempts}");
            let pass = self.destroy_pass(plan, selection, robust).await;
            if !pass.failed {
                info!("Destroy of {} succeeded", self.ctx.deployment_root.display());
                return Ok(DestroyOutcome {
                    attempts: attempt,
                    packer_manifests: pass.packer_manifests,
                });
            }
            if attempt < max_attempts {
                warn!("Destroy attempt {attempt} of {max_attempts} failed, retrying...");
            }
        }

        error!(
            "Destroy of {} failed after {max_attempts} attempt(s)",
            self.ctx.deployment_root.display()
        );
        Err(OrchestratorError::DestroyExhausted {
            attempts: max_attempts,
            deployment: self.ctx.deployment_root.clone(),
        })
    }

    async fn destroy_pass(&self, plan: &GroupPlan, selection: &Selection, robust: bool) -> PassReport {
        let mut report = PassReport::default();
        let groups = plan.groups();

        for (i, group) in groups.iter().enumerate().rev() {
            if !selection.is_selected(&group.name) {
                info!("skipping group {}", group.name);
                continue;
            }
            let group_dir = group.dir(&self.ctx.deployment_root);

            if robust && group.has_network_module() {
                if let Err(e) = self.clean_firewalls(plan).await {
                    error!("Firewall cleanup before destroying group {} failed: {e}", group.name);
                    report.failed = true;
                    break;
                }
            } else if let Err(e) = self.broker.import(group, &group_dir, plan).await {
                warn!("Continuing without imported inputs for group {}: {e}", group.name);
            }

            match self.destroy_group(group).await {
                Ok(Some(manifest)) => report.packer_manifests.push(manifest),
                Ok(None) => {}
                Err(e) => {
                    error!("Destroy of group {} failed: {e}", group.name);
                    report.failed = true;
                    if i == 0 || !self.continue_after_failure(&groups[i - 1]) {
                        break;
                    }
                }
            }
        }
        report
    }

    async fn clean_firewalls(&self, plan: &GroupPlan) -> Result<()> {
        let project = plan.string_var("project_id")?;
        let deployment = plan.string_var("deployment_name")?;
        self.cleanup.clean(project, deployment).await
    }

    /// Destroys one group; Packer groups yield their manifest path instead.
    async fn destroy_group(&self, group: &Group) -> Result<Option<PathBuf>> {
        let group_dir = group.dir(&self.ctx.deployment_root);
        match group.kind() {
            GroupKind::Terraform => {
                self.executor.destroy(&group_dir).await?;
                Ok(None)
            }
            GroupKind::Packer => {
                let module = group.packer_module()?;
                Ok(Some(group_dir.join(&module.id).join(PACKER_MANIFEST)))
            }
            kind @ GroupKind::Unknown => Err(ConfigError::UnsupportedKind {
                group: group.name.to_string(),
                kind: kind.to_string(),
            }
            .into()),
        }
    }

    fn continue_after_failure(&self, next: &Group) -> bool {
        self.gate
            .decide(&format!("Do you want to delete the next group \"{}\"?", next.name))
    }
}
