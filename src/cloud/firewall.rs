//! Firewall rule cleanup for a deployment's networks.
//!
//! A network cannot be destroyed while firewall rules created outside
//! Terraform still reference it. Before destroying a network group, robust
//! destroy removes every rule attached to the deployment's networks.

use async_trait::async_trait;
use tabled::{Table, Tabled};
use tracing::{info, warn};

use crate::approval::ApprovalGate;
use crate::error::{CleanupError, Result, RuleDeletionFailure};

use super::client::ComputeApi;
use super::types::Firewall;

/// Removes firewall rules that would block network deletion.
#[async_trait]
pub trait NetworkCleanup: Send + Sync {
    /// Deletes the firewall rules on networks belonging to `deployment`.
    ///
    /// Succeeds without changes when nothing matches or the operator
    /// declines.
    async fn clean(&self, project: &str, deployment: &str) -> Result<()>;
}

/// [`NetworkCleanup`] over the compute API.
#[derive(Debug)]
pub struct FirewallCleaner<C> {
    api: C,
    gate: ApprovalGate,
}

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "Firewall rule")]
    name: String,
    #[tabled(rename = "Network")]
    network: String,
}

impl<C: ComputeApi> FirewallCleaner<C> {
    /// Creates a cleaner; `gate` confirms the batch deletion.
    #[must_use]
    pub const fn new(api: C, gate: ApprovalGate) -> Self {
        Self { api, gate }
    }

    async fn find_rules(&self, project: &str, deployment: &str) -> Result<Vec<Firewall>> {
        // Name matching can miss networks with custom names, and can also
        // match another deployment in the same project whose name contains
        // this one.
        let filter = format!("name eq \".*{deployment}.*\"");
        let networks = self
            .api
            .list_networks(project, &filter)
            .await
            .map_err(|source| CleanupError::ListFailed {
                resource: "networks",
                project: project.to_string(),
                source,
            })?;

        let mut rules = Vec::new();
        for network in &networks {
            let filter = format!("network eq \".*/networks/{}\"", network.name);
            let found = self
                .api
                .list_firewalls(project, &filter)
                .await
                .map_err(|source| CleanupError::ListFailed {
                    resource: "firewall rules",
                    project: project.to_string(),
                    source,
                })?;
            rules.extend(found);
        }
        Ok(rules)
    }
}

fn confirmation_prompt(rules: &[Firewall]) -> String {
    let rows: Vec<RuleRow> = rules
        .iter()
        .map(|r| RuleRow {
            name: r.name.clone(),
            network: r.network.rsplit('/').next().unwrap_or(&r.network).to_string(),
        })
        .collect();
    let table = Table::new(rows);
    format!(
        "Firewall rules must be deleted before the network can be destroyed:\n{table}\nDelete these {} firewall rule(s)?",
        rules.len()
    )
}

#[async_trait]
impl<C: ComputeApi> NetworkCleanup for FirewallCleaner<C> {
    async fn clean(&self, project: &str, deployment: &str) -> Result<()> {
        let rules = self.find_rules(project, deployment).await?;
        if rules.is_empty() {
            info!("No firewall rules to clean up for deployment {deployment}");
            return Ok(());
        }

        if !self.gate.decide(&confirmation_prompt(&rules)) {
            info!("Skipping firewall rule cleanup for deployment {deployment}");
            return Ok(());
        }

        let mut failures = Vec::new();
        for rule in &rules {
            info!("Deleting firewall rule {}", rule.name);
            if let Err(e) = self.api.delete_firewall(project, &rule.name).await {
                warn!("Failed to delete firewall rule {}: {e}", rule.name);
                failures.push(RuleDeletionFailure {
                    rule: rule.name.clone(),
                    message: e.to_string(),
                });
            }
        }

        if failures.is_empty() {
            info!("Deleted {} firewall rule(s)", rules.len());
            Ok(())
        } else {
            Err(CleanupError::DeletionFailed { failures }.into())
        }
    }
}
