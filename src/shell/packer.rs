//! Packer image builds.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{OrchestratorError, Result};

use super::runner::{CommandRunner, Invocation};

/// Hint shown when packer is not installed.
pub const PACKER_HINT: &str = "must have a copy of packer installed in PATH";

/// Packer bound to one module directory.
#[derive(Debug)]
pub struct Packer<'a> {
    runner: &'a CommandRunner,
    binary: PathBuf,
    module_dir: PathBuf,
}

impl<'a> Packer<'a> {
    /// Resolves the packer binary for `module_dir`.
    ///
    /// # Errors
    ///
    /// Returns `ToolNotFound` if packer is not installed.
    pub fn configure(runner: &'a CommandRunner, module_dir: &Path) -> Result<Self> {
        let binary = runner.require("packer", PACKER_HINT)?;
        Ok(Self {
            runner,
            binary,
            module_dir: module_dir.to_path_buf(),
        })
    }

    /// Runs `init`, `validate`, and `build`, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the failing step's error.
    pub async fn build(&self) -> Result<()> {
        let dir = self.module_dir.display();
        for (step, echo) in [("init", false), ("validate", false), ("build", true)] {
            if step == "build" {
                info!("Building image in {dir}");
            }
            let invocation = Invocation::new(&self.binary, &self.module_dir)
                .args([step, "."])
                .echo(echo);
            self.runner.run(&invocation).await.map_err(|e| match e {
                OrchestratorError::Execution(e) => e
                    .with_help(format!("packer {step} in {dir} failed"))
                    .into(),
                other => other,
            })?;
        }
        info!("Finished building image in {dir}");
        Ok(())
    }
}
