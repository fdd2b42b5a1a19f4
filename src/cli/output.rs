//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! run results to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;
use tabled::{Table, Tabled};

use crate::orchestrator::{DeployReport, DestroyOutcome, GroupOutcome};
use crate::shell::Outputs;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Group row for table display.
#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Result")]
    outcome: String,
}

/// Output row for table display.
#[derive(Tabled)]
struct OutputRow {
    #[tabled(rename = "Output")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Serialize)]
struct OutputsJson<'a> {
    group: &'a str,
    outputs: &'a Outputs,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a deploy report for display.
    #[must_use]
    pub fn format_deploy(&self, report: &DeployReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => Self::format_deploy_text(report),
        }
    }

    fn format_deploy_text(report: &DeployReport) -> String {
        let rows: Vec<GroupRow> = report
            .groups
            .iter()
            .map(|g| GroupRow {
                group: g.group.clone(),
                kind: g.kind.to_string(),
                outcome: Self::format_outcome(g.outcome),
            })
            .collect();

        let mut output = String::new();
        let _ = writeln!(output, "\n{} Deployment {}", "✓".green(), report.deployment_root.display());
        if !rows.is_empty() {
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }
        let elapsed = report.finished_at - report.started_at;
        let _ = writeln!(output, "Finished in {}s", elapsed.num_seconds());
        output
    }

    fn format_outcome(outcome: GroupOutcome) -> String {
        match outcome {
            GroupOutcome::Applied => "applied".green().to_string(),
            GroupOutcome::Built => "built".green().to_string(),
            GroupOutcome::Declined => "declined".yellow().to_string(),
            GroupOutcome::Skipped => "skipped".dimmed().to_string(),
        }
    }

    /// Formats a destroy outcome for display.
    #[must_use]
    pub fn format_destroy(&self, deployment_root: &Path, outcome: &DestroyOutcome) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(outcome).unwrap_or_default(),
            OutputFormat::Text => format!(
                "\n{} Destroyed {} in {} attempt(s)\n",
                "✓".green(),
                deployment_root.display(),
                outcome.attempts
            ),
        }
    }

    /// Formats a group's exported outputs for display.
    #[must_use]
    pub fn format_outputs(&self, group: &str, outputs: &Outputs) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&OutputsJson { group, outputs }).unwrap_or_default()
            }
            OutputFormat::Text => {
                if outputs.is_empty() {
                    return format!("Group {group} has no outputs\n");
                }
                let rows: Vec<OutputRow> = outputs
                    .iter()
                    .map(|(name, value)| OutputRow {
                        name: name.clone(),
                        value: Self::truncate(&value.to_string(), 60),
                    })
                    .collect();
                format!("Exported outputs of group {}\n{}\n", group.bold(), Table::new(rows))
            }
        }
    }

    /// Formats an error for display.
    #[must_use]
    pub fn format_error(error: &str) -> String {
        format!("{} {}", "Error:".red().bold(), error)
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}
