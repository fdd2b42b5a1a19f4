// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # HPC Deploy Orchestrator
//!
//! Deploys and destroys multi-group HPC deployments built from Terraform root
//! modules and Packer templates.
//!
//! ## Overview
//!
//! A deployment directory holds one subdirectory per deployment group. The
//! expanded plan in the artifacts directory lists the groups in dependency
//! order. `hpcctl` lets you:
//!
//! - Deploy every selected group in order, passing outputs between groups
//! - Destroy groups in reverse order, with retries and firewall cleanup
//! - Export and import intergroup artifacts by hand
//!
//! ## Architecture
//!
//! 1. **Plan**: loaded from `.hpc/artifacts/expanded_blueprint.yaml`
//! 2. **Executors**: run `terraform` and `packer` as child processes
//! 3. **Orchestrators**: walk the plan and decide what runs next
//!
//! ## Modules
//!
//! - [`config`]: Plan types, group selection, and the run context
//! - [`approval`]: Apply behavior and operator prompts
//! - [`shell`]: Terraform and Packer execution
//! - [`artifacts`]: Intergroup output exchange
//! - [`cloud`]: Compute API client and firewall cleanup
//! - [`orchestrator`]: Deploy and destroy control flow
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! vars:
//!   project_id: hpc-project
//!   deployment_name: hpc-small
//! deployment_groups:
//!   - group: primary
//!     modules:
//!       - id: network
//!         source: modules/network/vpc
//!         kind: terraform
//!   - group: cluster
//!     modules:
//!       - id: slurm
//!         source: community/modules/scheduler/slurm
//!         kind: terraform
//!     inputs:
//!       - group: primary
//!         output: subnetwork_name_network
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod approval;
pub mod artifacts;
pub mod cli;
pub mod cloud;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod shell;

// ============================================================================
// Re-exports
// ============================================================================

pub use approval::{ApplyBehavior, ApprovalGate, Prompter};
pub use artifacts::{ArtifactBroker, LocalArtifactBroker};
pub use cli::{Cli, Commands, OutputFormatter};
pub use cloud::{ComputeApi, ComputeClient, FirewallCleaner, NetworkCleanup};
pub use config::{Group, GroupKind, GroupName, GroupPlan, PlanLoader, RunContext, Selection};
pub use error::{OrchestratorError, Result};
pub use orchestrator::{DeployOrchestrator, DeployReport, DestroyOrchestrator, DestroyOutcome};
pub use shell::{CommandRunner, Console, GroupExecutor, ShellExecutor};
