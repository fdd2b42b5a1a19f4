//! Infrastructure tool execution.
//!
//! This module runs terraform and packer as child processes:
//! - [`CommandRunner`] spawns commands and drains their output
//! - [`Terraform`] and [`Packer`] encode each tool's command sequence
//! - [`GroupExecutor`] is the seam the orchestrators depend on

mod console;
mod executor;
mod packer;
mod runner;
mod terraform;

pub use console::Console;
pub use executor::{GroupExecutor, Outputs, ShellExecutor};
pub use packer::{PACKER_HINT, Packer};
pub use runner::{CommandOutput, CommandRunner, Invocation};
pub use terraform::{TERRAFORM_HINT, Terraform};
