//! Artifact broker trait definition.

use async_trait::async_trait;
use std::path::Path;

use crate::config::{Group, GroupName, GroupPlan};
use crate::error::Result;
use crate::shell::Outputs;

/// Moves output values between deployment groups.
#[async_trait]
pub trait ArtifactBroker: Send + Sync {
    /// Writes the inputs `group` needs from earlier groups into `group_dir`.
    ///
    /// Does nothing when the group has no intergroup inputs.
    async fn import(&self, group: &Group, group_dir: &Path, plan: &GroupPlan) -> Result<()>;

    /// Records a group's outputs for later groups.
    async fn export(&self, group: &GroupName, outputs: &Outputs) -> Result<()>;
}
