//! Group plan types.
//!
//! A [`GroupPlan`] is the ordered list of deployment groups produced by the
//! blueprint expansion. Its order is the deploy order; destroy walks it in
//! reverse.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Module source prefixes that identify network modules.
pub const NETWORK_MODULE_PREFIXES: &[&str] = &["modules/network/", "community/modules/network/"];

/// Name of a deployment group, unique within a plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupName(String);

impl GroupName {
    /// Creates a group name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for GroupName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Infrastructure-as-code tool a module or group is run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    /// Terraform root module.
    Terraform,
    /// Packer template.
    Packer,
    /// Mixed or empty group; never dispatchable.
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Terraform => "terraform",
            Self::Packer => "packer",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A module reference inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRef {
    /// Module identifier, unique within the deployment.
    pub id: String,
    /// Source path the module was taken from.
    pub source: String,
    /// Tool the module is written for.
    #[serde(default)]
    pub kind: GroupKind,
}

impl ModuleRef {
    /// Creates a module reference.
    #[must_use]
    pub fn new(id: impl Into<String>, source: impl Into<String>, kind: GroupKind) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            kind,
        }
    }

    /// Returns true if the module source lives under a network module path.
    #[must_use]
    pub fn is_network(&self) -> bool {
        NETWORK_MODULE_PREFIXES
            .iter()
            .any(|prefix| self.source.starts_with(prefix))
    }
}

/// An output of an earlier group consumed by a later one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRef {
    /// Group that exports the value.
    pub group: GroupName,
    /// Output name.
    pub output: String,
}

/// A deployment group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group name; also the group's directory name under the deployment root.
    #[serde(rename = "group")]
    pub name: GroupName,
    /// Modules in declaration order.
    #[serde(default)]
    pub modules: Vec<ModuleRef>,
    /// Outputs of earlier groups this group needs as inputs.
    #[serde(default)]
    pub inputs: Vec<OutputRef>,
}

impl Group {
    /// Creates a group with no intergroup inputs.
    #[must_use]
    pub fn new(name: impl Into<GroupName>, modules: Vec<ModuleRef>) -> Self {
        Self {
            name: name.into(),
            modules,
            inputs: Vec::new(),
        }
    }

    /// Adds an intergroup input.
    #[must_use]
    pub fn with_input(mut self, group: impl Into<GroupName>, output: impl Into<String>) -> Self {
        self.inputs.push(OutputRef {
            group: group.into(),
            output: output.into(),
        });
        self
    }

    /// Returns the group kind: the common kind of all modules, or `Unknown`
    /// if the group is empty or mixes kinds.
    #[must_use]
    pub fn kind(&self) -> GroupKind {
        let Some(first) = self.modules.first() else {
            return GroupKind::Unknown;
        };
        if self.modules.iter().all(|m| m.kind == first.kind) {
            first.kind
        } else {
            GroupKind::Unknown
        }
    }

    /// Returns true if any module is a network module.
    #[must_use]
    pub fn has_network_module(&self) -> bool {
        self.modules.iter().any(ModuleRef::is_network)
    }

    /// Returns the group's directory under a deployment root.
    #[must_use]
    pub fn dir(&self, deployment_root: &Path) -> PathBuf {
        deployment_root.join(self.name.as_str())
    }

    /// Returns the single module of a Packer group.
    ///
    /// # Errors
    ///
    /// Returns an error unless the group holds exactly one module.
    pub fn packer_module(&self) -> Result<&ModuleRef> {
        match self.modules.as_slice() {
            [module] => Ok(module),
            modules => Err(ConfigError::PackerModuleCount {
                group: self.name.to_string(),
                count: modules.len(),
            }
            .into()),
        }
    }
}

/// Ordered, read-only sequence of deployment groups plus deployment variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupPlan {
    /// Deployment variables (`project_id`, `deployment_name`, ...).
    #[serde(default)]
    vars: BTreeMap<String, serde_json::Value>,
    /// Groups in deploy order.
    #[serde(rename = "deployment_groups", default)]
    groups: Vec<Group>,
}

impl GroupPlan {
    /// Creates a plan, checking that group names are unique and that every
    /// Packer group holds exactly one module.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an invariant is violated.
    pub fn new(groups: Vec<Group>, vars: BTreeMap<String, serde_json::Value>) -> Result<Self> {
        let plan = Self { vars, groups };
        plan.check_invariants()?;
        Ok(plan)
    }

    pub(crate) fn check_invariants(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for group in &self.groups {
            if !seen.insert(&group.name) {
                return Err(ConfigError::DuplicateGroup {
                    name: group.name.to_string(),
                }
                .into());
            }
            if group.kind() == GroupKind::Packer {
                group.packer_module()?;
            }
        }
        Ok(())
    }

    /// Groups in deploy order.
    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Index of a group in deploy order.
    ///
    /// # Errors
    ///
    /// Returns an error if no group has this name.
    pub fn position(&self, name: &GroupName) -> Result<usize> {
        self.groups
            .iter()
            .position(|g| &g.name == name)
            .ok_or_else(|| {
                ConfigError::GroupNotFound {
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Looks up a group by name.
    ///
    /// # Errors
    ///
    /// Returns an error if no group has this name.
    pub fn group(&self, name: &GroupName) -> Result<&Group> {
        self.groups
            .iter()
            .find(|g| &g.name == name)
            .ok_or_else(|| {
                ConfigError::GroupNotFound {
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Returns true if a group with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.groups.iter().any(|g| g.name.as_str() == name)
    }

    /// Resolves a deployment variable that must be a non-empty string.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is missing, null, not a string, or empty.
    pub fn string_var(&self, name: &str) -> Result<&str> {
        let problem = match self.vars.get(name) {
            None => "is not defined",
            Some(serde_json::Value::Null) => "is null",
            Some(serde_json::Value::String(s)) if s.is_empty() => "is empty",
            Some(serde_json::Value::String(s)) => return Ok(s.as_str()),
            Some(_) => "is not a string",
        };
        Err(ConfigError::InvalidVariable {
            name: name.to_string(),
            problem,
        }
        .into())
    }
}
