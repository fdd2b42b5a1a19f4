//! Deploy and destroy control flow.
//!
//! This module drives a [`GroupPlan`](crate::config::GroupPlan) through the
//! tool executors:
//! - [`DeployOrchestrator`] walks groups forward and stops at the first error
//! - [`DestroyOrchestrator`] walks them backward with bounded retries

mod deploy;
mod destroy;
mod instructions;

#[cfg(test)]
mod testing;

pub use deploy::{DeployOrchestrator, DeployReport, GroupOutcome, GroupReport};
pub use destroy::{DestroyOrchestrator, DestroyOutcome, PACKER_MANIFEST, ROBUST_ATTEMPTS};
pub use instructions::{IMAGES_CONSOLE_URL, write_packer_destroy_instructions, write_post_deploy_instructions};
