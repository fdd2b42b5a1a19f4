//! Dispatch of group work to the infrastructure tools.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::approval::ApprovalGate;
use crate::config::GroupKind;
use crate::error::{ConfigError, Result};

use super::packer::{PACKER_HINT, Packer};
use super::runner::CommandRunner;
use super::terraform::{TERRAFORM_HINT, Terraform};

/// Output values of a Terraform group, keyed by output name.
pub type Outputs = BTreeMap<String, serde_json::Value>;

/// Runs the tool work for deployment groups.
#[async_trait]
pub trait GroupExecutor: Send + Sync {
    /// Checks that the tool needed for `kind` is installed.
    ///
    /// # Errors
    ///
    /// Returns `ToolNotFound` for a missing tool and a configuration error
    /// for an unknown kind.
    fn check_tool(&self, kind: GroupKind, group_dir: &Path) -> Result<()>;

    /// Applies a Terraform group and returns its outputs.
    async fn apply(&self, group_dir: &Path) -> Result<Outputs>;

    /// Destroys a Terraform group.
    async fn destroy(&self, group_dir: &Path) -> Result<()>;

    /// Reads a Terraform group's current outputs without changing anything.
    async fn outputs(&self, group_dir: &Path) -> Result<Outputs>;

    /// Builds the image defined in a Packer module directory.
    async fn packer_build(&self, module_dir: &Path) -> Result<()>;
}

/// [`GroupExecutor`] that shells out to terraform and packer.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    runner: CommandRunner,
    gate: ApprovalGate,
}

impl ShellExecutor {
    /// Creates an executor; `gate` approves Terraform changes.
    #[must_use]
    pub const fn new(runner: CommandRunner, gate: ApprovalGate) -> Self {
        Self { runner, gate }
    }
}

#[async_trait]
impl GroupExecutor for ShellExecutor {
    fn check_tool(&self, kind: GroupKind, group_dir: &Path) -> Result<()> {
        match kind {
            GroupKind::Terraform => self.runner.require("terraform", TERRAFORM_HINT).map(drop),
            GroupKind::Packer => self.runner.require("packer", PACKER_HINT).map(drop),
            GroupKind::Unknown => Err(ConfigError::UnsupportedKind {
                group: group_dir.display().to_string(),
                kind: kind.to_string(),
            }
            .into()),
        }
    }

    async fn apply(&self, group_dir: &Path) -> Result<Outputs> {
        let tf = Terraform::configure(&self.runner, group_dir)?;
        tf.apply_or_destroy(&self.gate, false).await?;
        tf.output().await
    }

    async fn destroy(&self, group_dir: &Path) -> Result<()> {
        let tf = Terraform::configure(&self.runner, group_dir)?;
        tf.apply_or_destroy(&self.gate, true).await
    }

    async fn outputs(&self, group_dir: &Path) -> Result<Outputs> {
        let tf = Terraform::configure(&self.runner, group_dir)?;
        tf.init_if_needed().await?;
        tf.output().await
    }

    async fn packer_build(&self, module_dir: &Path) -> Result<()> {
        info!("Running packer in {}", module_dir.display());
        Packer::configure(&self.runner, module_dir)?.build().await
    }
}
