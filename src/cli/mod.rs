//! CLI module for the hpcctl deployment tool.
//!
//! This module provides the command-line interface for deploying and
//! destroying multi-group deployments.

mod commands;
mod output;

pub use commands::{Cli, Commands, GroupSelectionArgs, OutputFormat, RunArgs};
pub use output::OutputFormatter;
