//! Configuration module for the deployment orchestrator.
//!
//! This module handles everything a run is configured with:
//! - The ordered group plan and its deployment variables
//! - Group selection via `--only` / `--skip`
//! - Loading the expanded plan from the artifacts directory
//! - The explicit per-run context (paths and approval policy)

mod context;
mod parser;
mod plan;
mod selection;

pub use context::{ARTIFACTS_DIR, HIDDEN_DIR, RunContext, check_writable_dir, default_artifacts_dir};
pub use parser::{EXPANDED_PLAN_FILE, PlanLoader};
pub use plan::{
    Group, GroupKind, GroupName, GroupPlan, ModuleRef, NETWORK_MODULE_PREFIXES, OutputRef,
};
pub use selection::Selection;
