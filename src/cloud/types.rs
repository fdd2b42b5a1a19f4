//! Compute Engine API types.

use serde::{Deserialize, Serialize};

/// A VPC network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    /// Network name.
    pub name: String,
    /// Fully qualified URL of the network.
    #[serde(default)]
    pub self_link: String,
}

/// A firewall rule attached to a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Firewall {
    /// Rule name.
    pub name: String,
    /// URL of the network the rule applies to.
    #[serde(default)]
    pub network: String,
}

/// One page of a list call.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListPage<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A long-running global operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Operation {
    pub name: String,
    /// `PENDING`, `RUNNING`, or `DONE`.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: Option<OperationErrors>,
}

impl Operation {
    pub(crate) fn is_done(&self) -> bool {
        self.status == "DONE"
    }

    /// Joined error messages, if the operation failed.
    pub(crate) fn failure(&self) -> Option<String> {
        let errors = self.error.as_ref()?;
        if errors.errors.is_empty() {
            return None;
        }
        Some(
            errors
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OperationErrors {
    #[serde(default)]
    pub errors: Vec<OperationErrorEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OperationErrorEntry {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
