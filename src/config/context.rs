//! Per-run context.
//!
//! Everything a run needs that is not part of the plan: where the deployment
//! lives, where artifacts go, and how approval is handled. Built once from the
//! command line and passed explicitly to each orchestrator.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::approval::ApplyBehavior;
use crate::error::{ConfigError, Result};

use super::plan::GroupPlan;

/// Hidden directory under the deployment root holding toolkit metadata.
pub const HIDDEN_DIR: &str = ".hpc";

/// Artifacts directory name inside [`HIDDEN_DIR`].
pub const ARTIFACTS_DIR: &str = "artifacts";

/// Returns the default artifacts directory for a deployment root.
#[must_use]
pub fn default_artifacts_dir(deployment_root: &Path) -> PathBuf {
    deployment_root.join(HIDDEN_DIR).join(ARTIFACTS_DIR)
}

/// Explicit configuration for one deploy or destroy run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Deployment root; one subdirectory per group.
    pub deployment_root: PathBuf,
    /// Artifacts directory holding the expanded plan and output manifests.
    pub artifacts_dir: PathBuf,
    /// Approval policy, resolved once per run.
    pub behavior: ApplyBehavior,
}

impl RunContext {
    /// Creates a context using the default artifacts directory.
    #[must_use]
    pub fn new(deployment_root: impl Into<PathBuf>, behavior: ApplyBehavior) -> Self {
        let deployment_root = deployment_root.into();
        let artifacts_dir = default_artifacts_dir(&deployment_root);
        Self {
            deployment_root,
            artifacts_dir,
            behavior,
        }
    }

    /// Overrides the artifacts directory when one is given.
    #[must_use]
    pub fn with_artifacts_dir(mut self, artifacts_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = artifacts_dir {
            self.artifacts_dir = dir;
        }
        self
    }

    /// Checks that every group in the plan has a directory under the root.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first group without a directory.
    pub fn validate_deployment_directory(&self, plan: &GroupPlan) -> Result<()> {
        for group in plan.groups() {
            let path = group.dir(&self.deployment_root);
            if !path.is_dir() {
                return Err(ConfigError::MissingGroupDirectory {
                    path,
                    group: group.name.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Errors unless `path` is a directory new files can be written to.
///
/// # Errors
///
/// Returns an error if the path is not a directory or a scratch file cannot be
/// created in it.
pub fn check_writable_dir(path: &Path) -> Result<()> {
    let writable = path.is_dir() && tempfile::tempfile_in(path).is_ok();
    debug!("Writable check for {}: {writable}", path.display());
    if writable {
        Ok(())
    } else {
        Err(ConfigError::NotWritable {
            path: path.to_path_buf(),
        }
        .into())
    }
}
