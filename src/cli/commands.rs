//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Selection;

/// hpcctl - deploy and destroy multi-group HPC deployments.
#[derive(Parser, Debug)]
#[command(name = "hpcctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Flags selecting which groups take part in a run.
#[derive(Args, Debug, Clone, Default)]
pub struct GroupSelectionArgs {
    /// Only run these groups (comma-separated or repeated).
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip these groups (comma-separated or repeated).
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,
}

impl GroupSelectionArgs {
    /// Converts the flags into a selection.
    #[must_use]
    pub fn selection(&self) -> Selection {
        Selection::new(self.only.iter().cloned(), self.skip.iter().cloned())
    }
}

/// Flags shared by deploy and destroy.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Deployment directory (one subdirectory per group).
    #[arg(default_value = ".")]
    pub deployment_dir: PathBuf,

    /// Group selection.
    #[command(flatten)]
    pub groups: GroupSelectionArgs,

    /// Apply proposed changes without asking.
    #[arg(long, env = "HPCCTL_AUTO_APPROVE")]
    pub auto_approve: bool,

    /// Artifacts directory (defaults to <deployment>/.hpc/artifacts).
    #[arg(long, env = "HPCCTL_ARTIFACTS_DIR")]
    pub artifacts: Option<PathBuf>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy every selected group in order.
    Deploy {
        /// Run flags.
        #[command(flatten)]
        run: RunArgs,
    },

    /// Destroy every selected group in reverse order.
    Destroy {
        /// Run flags.
        #[command(flatten)]
        run: RunArgs,

        /// Retry failed passes and delete firewall rules blocking network removal.
        #[arg(long)]
        robust: bool,

        /// Compute API endpoint used by firewall cleanup.
        #[arg(long, env = "HPCCTL_COMPUTE_ENDPOINT", default_value = crate::cloud::COMPUTE_API_URL)]
        compute_endpoint: String,
    },

    /// Export a Terraform group's outputs to the artifacts directory.
    ExportOutputs {
        /// Group directory inside a deployment.
        group_dir: PathBuf,

        /// Artifacts directory (defaults to <deployment>/.hpc/artifacts).
        #[arg(long, env = "HPCCTL_ARTIFACTS_DIR")]
        artifacts: Option<PathBuf>,
    },

    /// Write a group's intergroup inputs from the artifacts directory.
    ImportInputs {
        /// Group directory inside a deployment.
        group_dir: PathBuf,

        /// Artifacts directory (defaults to <deployment>/.hpc/artifacts).
        #[arg(long, env = "HPCCTL_ARTIFACTS_DIR")]
        artifacts: Option<PathBuf>,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GroupName;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_destroy() {
        let cli = Cli::try_parse_from([
            "hpcctl", "destroy", "/d", "--robust", "--only", "a,b", "--skip", "c", "--auto-approve",
        ])
        .unwrap();
        let Commands::Destroy { run, robust, .. } = cli.command else {
            panic!("expected destroy");
        };
        assert!(robust);
        assert!(run.auto_approve);
        assert_eq!(run.deployment_dir, PathBuf::from("/d"));

        let selection = run.groups.selection();
        assert!(selection.is_selected(&GroupName::new("a")));
        assert!(!selection.is_selected(&GroupName::new("c")));
        assert!(!selection.is_selected(&GroupName::new("d")));
    }

    #[test]
    fn test_parse_export_outputs() {
        let cli = Cli::try_parse_from(["hpcctl", "--output", "json", "export-outputs", "/d/primary"]).unwrap();
        assert!(matches!(cli.output, OutputFormat::Json));
        assert!(matches!(cli.command, Commands::ExportOutputs { .. }));
    }
}
