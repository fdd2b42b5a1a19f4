//! Error types for the deployment orchestrator.
//!
//! This module provides the error hierarchy for every stage of a run:
//! configuration, tool discovery, command execution, artifact transfer,
//! cloud cleanup, and destroy exhaustion.

use std::fmt::Write as _;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the deployment orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A required tool binary is not on the search path.
    #[error("{hint}\n{tool}: executable file not found in $PATH")]
    ToolNotFound {
        /// Name of the missing tool.
        tool: String,
        /// Remediation hint shown to the operator.
        hint: String,
    },

    /// Command execution errors.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Artifact transfer errors.
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    /// Firewall cleanup errors.
    #[error("Cleanup error: {0}")]
    Cleanup(#[from] CleanupError),

    /// Cloud API errors.
    #[error("Cloud API error: {0}")]
    Cloud(#[from] CloudError),

    /// Every destroy attempt failed.
    #[error("destruction of {deployment} failed after {attempts} attempt(s)")]
    DestroyExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Deployment root that could not be destroyed.
        deployment: PathBuf,
    },

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The expanded plan file was not found.
    #[error("Plan file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The expanded plan file could not be parsed.
    #[error("Failed to parse plan: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// A group named in `only`/`skip` is not part of the plan.
    #[error("group {name:?} was specified in --{flag} but is not in the deployment")]
    UnknownGroup {
        /// Flag the name was given to.
        flag: &'static str,
        /// The unknown group name.
        name: String,
    },

    /// The same group appears in both `only` and `skip`.
    #[error("group {name:?} cannot be both selected with --only and excluded with --skip")]
    ConflictingSelection {
        /// The conflicting group name.
        name: String,
    },

    /// Duplicate group definition.
    #[error("Duplicate group name: {name}")]
    DuplicateGroup {
        /// The duplicated name.
        name: String,
    },

    /// A group's kind cannot be dispatched.
    #[error("group {group} is an unsupported kind {kind:?}")]
    UnsupportedKind {
        /// Group name or directory.
        group: String,
        /// The kind that was found.
        kind: String,
    },

    /// A Packer group must hold exactly one module.
    #[error("packer group {group} must contain exactly one module, found {count}")]
    PackerModuleCount {
        /// Group name.
        group: String,
        /// Number of modules found.
        count: usize,
    },

    /// The deployment directory layout does not match the plan.
    #[error("improper deployment: {path} is not a directory for group {group}")]
    MissingGroupDirectory {
        /// Expected group directory.
        path: PathBuf,
        /// Group name.
        group: String,
    },

    /// A directory that must be writable is not.
    #[error("{path} must be a writable directory")]
    NotWritable {
        /// Offending path.
        path: PathBuf,
    },

    /// A deployment variable is missing or not a usable string.
    #[error("deployment variable {name:?} {problem}")]
    InvalidVariable {
        /// Variable name.
        name: String,
        /// What is wrong with it.
        problem: &'static str,
    },

    /// A group takes inputs from a group that does not come before it.
    #[error("group {group} imports outputs of group {source_group}, which is not an earlier group")]
    InputFromLaterGroup {
        /// Receiving group.
        group: String,
        /// Group named as the source.
        source_group: String,
    },

    /// A group was not found in the plan.
    #[error("group {name:?} not found in the deployment")]
    GroupNotFound {
        /// The missing group name.
        name: String,
    },
}

/// Errors raised while running Terraform or Packer.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A command exited unsuccessfully.
    #[error("{program} {args} in {dir} exited with {status}")]
    CommandFailed {
        /// Program name.
        program: String,
        /// Space-joined arguments.
        args: String,
        /// Working directory.
        dir: PathBuf,
        /// Exit status description.
        status: String,
        /// Captured standard error, already shown on the console.
        stderr: String,
    },

    /// A command could not be started.
    #[error("failed to start {program}: {message}")]
    SpawnFailed {
        /// Program name.
        program: String,
        /// Underlying error.
        message: String,
    },

    /// A step failed; `help` tells the operator what to do next.
    #[error("{help}\n{source}")]
    Step {
        /// Operator-facing description of the failed step.
        help: String,
        /// Underlying failure.
        #[source]
        source: Box<ExecutionError>,
    },

    /// Tool output could not be understood.
    #[error("unexpected output from {program}: {message}")]
    InvalidOutput {
        /// Program name.
        program: String,
        /// Description of the problem.
        message: String,
    },
}

/// Errors raised while moving outputs between groups.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// An upstream group's outputs file is missing or unreadable.
    #[error("{hint}\n{path}: {message}")]
    MissingOutputs {
        /// Expected outputs file.
        path: PathBuf,
        /// Remediation hint.
        hint: String,
        /// Underlying error text.
        message: String,
    },

    /// Two upstream groups export the same input name.
    #[error("duplicate input {name:?} imported into group {group}")]
    DuplicateInput {
        /// Receiving group.
        group: String,
        /// Duplicated input name.
        name: String,
    },

    /// An artifact file could not be serialized or parsed.
    #[error("artifact serialization error in {path}: {message}")]
    Serialization {
        /// Artifact file.
        path: PathBuf,
        /// Description of the error.
        message: String,
    },
}

/// Errors raised by the firewall cleanup protocol.
#[derive(Debug, Error)]
pub enum CleanupError {
    /// Listing networks or firewall rules failed.
    #[error("failed to list {resource} in project {project}: {source}")]
    ListFailed {
        /// Resource being listed.
        resource: &'static str,
        /// Project ID.
        project: String,
        /// Underlying API error.
        #[source]
        source: CloudError,
    },

    /// One or more firewall rule deletions failed.
    #[error("failed to delete {} firewall rule(s):{}", .failures.len(), render_failures(.failures))]
    DeletionFailed {
        /// Every rule that could not be deleted.
        failures: Vec<RuleDeletionFailure>,
    },
}

/// A single failed firewall rule deletion.
#[derive(Debug, Clone)]
pub struct RuleDeletionFailure {
    /// Firewall rule name.
    pub rule: String,
    /// Error text.
    pub message: String,
}

fn render_failures(failures: &[RuleDeletionFailure]) -> String {
    failures.iter().fold(String::new(), |mut out, f| {
        let _ = write!(out, "\n  - {}: {}", f.rule, f.message);
        out
    })
}

/// Compute API errors.
#[derive(Debug, Error)]
pub enum CloudError {
    /// No ambient credentials could be obtained.
    #[error("authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from API.
        message: String,
    },

    /// Network error.
    #[error("network error communicating with the compute API: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from API.
    #[error("invalid response from the compute API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// A long-running operation finished with errors.
    #[error("operation {operation} failed: {message}")]
    OperationFailed {
        /// Operation name.
        operation: String,
        /// Errors reported by the operation.
        message: String,
    },
}

/// Result type alias for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

impl OrchestratorError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Creates a tool-not-found error.
    #[must_use]
    pub fn tool_not_found(tool: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::ToolNotFound {
            tool: tool.into(),
            hint: hint.into(),
        }
    }

    /// Returns true if this error must terminate the process.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DestroyExhausted { .. } | Self::ToolNotFound { .. } | Self::Config(_)
        )
    }
}

impl ExecutionError {
    /// Wraps this error with an operator-facing description of the failed step.
    #[must_use]
    pub fn with_help(self, help: impl Into<String>) -> Self {
        Self::Step {
            help: help.into(),
            source: Box::new(self),
        }
    }
}

impl CloudError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }
}
