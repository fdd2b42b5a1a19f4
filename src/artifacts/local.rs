//! File-based artifact storage in the deployment's artifacts directory.
//!
//! Each Terraform group's outputs are stored as `<group>_outputs.json`.
//! Imports read those files back and write a variables file the receiving
//! tool loads automatically.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::config::{Group, GroupKind, GroupName, GroupPlan};
use crate::error::{ArtifactError, ConfigError, OrchestratorError, Result};
use crate::shell::Outputs;

use super::broker::ArtifactBroker;

/// Artifact broker backed by the local artifacts directory.
#[derive(Debug, Clone)]
pub struct LocalArtifactBroker {
    /// Directory holding the outputs files.
    artifacts_dir: PathBuf,
}

impl LocalArtifactBroker {
    /// Creates a broker for `artifacts_dir`.
    #[must_use]
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifacts_dir: artifacts_dir.into(),
        }
    }

    /// Path of a group's outputs file.
    #[must_use]
    pub fn outputs_file(&self, group: &GroupName) -> PathBuf {
        self.artifacts_dir.join(format!("{group}_outputs.json"))
    }

    async fn read_outputs(&self, group: &GroupName, deployment_root: &Path) -> Result<Outputs> {
        let path = self.outputs_file(group);
        let missing = |message: String| ArtifactError::MissingOutputs {
            path: path.clone(),
            hint: format!(
                "consider running \"hpcctl export-outputs {}\"",
                deployment_root.join(group.as_str()).display()
            ),
            message,
        };

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| missing(e.to_string()))?;
        let outputs: Outputs = serde_json::from_str(&content).map_err(|e| missing(e.to_string()))?;
        Ok(outputs)
    }
}

/// Where an imported variables file goes for a group of `kind`.
fn inputs_file(group: &Group, group_dir: &Path) -> Result<PathBuf> {
    match group.kind() {
        GroupKind::Terraform => Ok(group_dir.join(format!("{}_inputs.auto.tfvars.json", group.name))),
        GroupKind::Packer => {
            let module = group.packer_module()?;
            Ok(group_dir
                .join(&module.id)
                .join(format!("{}_inputs.auto.pkrvars.json", module.id)))
        }
        kind @ GroupKind::Unknown => Err(ConfigError::UnsupportedKind {
            group: group.name.to_string(),
            kind: kind.to_string(),
        }
        .into()),
    }
}

async fn write_json(path: &Path, values: &Outputs) -> Result<()> {
    let content = serde_json::to_string_pretty(values).map_err(|e| ArtifactError::Serialization {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, content).await?;
    Ok(())
}

#[async_trait]
impl ArtifactBroker for LocalArtifactBroker {
    async fn import(&self, group: &Group, group_dir: &Path, plan: &GroupPlan) -> Result<()> {
        let mut wanted: BTreeMap<&GroupName, Vec<&str>> = BTreeMap::new();
        for input in &group.inputs {
            wanted.entry(&input.group).or_default().push(input.output.as_str());
        }
        if wanted.is_empty() {
            debug!("Group {} has no intergroup inputs", group.name);
            return Ok(());
        }

        let deployment_root = group_dir.parent().unwrap_or(group_dir);
        let position = plan.position(&group.name)?;
        let mut values = Outputs::new();
        for (source, names) in wanted {
            if plan.position(source)? >= position {
                return Err(ConfigError::InputFromLaterGroup {
                    group: group.name.to_string(),
                    source_group: source.to_string(),
                }
                .into());
            }
            info!("Collecting outputs for group {} from group {source}", group.name);
            let outputs = self.read_outputs(source, deployment_root).await?;
            for (name, value) in outputs.into_iter().filter(|(name, _)| names.contains(&name.as_str())) {
                if values.contains_key(&name) {
                    return Err(OrchestratorError::Artifact(ArtifactError::DuplicateInput {
                        group: group.name.to_string(),
                        name,
                    }));
                }
                values.insert(name, value);
            }
        }

        if values.is_empty() {
            return Ok(());
        }

        let path = inputs_file(group, group_dir)?;
        info!("Writing {} input(s) for group {} to {}", values.len(), group.name, path.display());
        write_json(&path, &values).await
    }

    async fn export(&self, group: &GroupName, outputs: &Outputs) -> Result<()> {
        if outputs.is_empty() {
            info!("Group {group} contains no artifacts to export");
            return Ok(());
        }
        let path = self.outputs_file(group);
        info!("Writing outputs artifact from group {group} to file {}", path.display());
        write_json(&path, outputs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleRef;
    use serde_json::json;
    use tempfile::TempDir;

    fn outputs(pairs: &[(&str, serde_json::Value)]) -> Outputs {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    fn tf(id: &str) -> ModuleRef {
        ModuleRef::new(id, format!("modules/{id}"), GroupKind::Terraform)
    }

    #[tokio::test]
    async fn test_export_then_import_terraform() {
        let root = TempDir::new().unwrap();
        let broker = LocalArtifactBroker::new(root.path().join(".hpc/artifacts"));
        let primary = Group::new("primary", vec![tf("network")]);
        let cluster = Group::new("cluster", vec![tf("slurm")]).with_input("primary", "subnet");
        let plan = GroupPlan::new(vec![primary, cluster.clone()], BTreeMap::new()).unwrap();

        broker
            .export(
                &GroupName::new("primary"),
                &outputs(&[("subnet", json!("sub-1")), ("unused", json!(1))]),
            )
            .await
            .unwrap();
        assert!(root.path().join(".hpc/artifacts/primary_outputs.json").is_file());

        let cluster_dir = root.path().join("cluster");
        broker.import(&cluster, &cluster_dir, &plan).await.unwrap();

        let written = std::fs::read_to_string(cluster_dir.join("cluster_inputs.auto.tfvars.json")).unwrap();
        let written: Outputs = serde_json::from_str(&written).unwrap();
        assert_eq!(written, outputs(&[("subnet", json!("sub-1"))]));
    }

    #[tokio::test]
    async fn test_import_into_packer_module_dir() {
        let root = TempDir::new().unwrap();
        let broker = LocalArtifactBroker::new(root.path().join("artifacts"));
        let image = Group::new(
            "image",
            vec![ModuleRef::new("builder", "modules/packer/custom-image", GroupKind::Packer)],
        )
        .with_input("primary", "subnet");
        let plan = GroupPlan::new(
            vec![Group::new("primary", vec![tf("network")]), image.clone()],
            BTreeMap::new(),
        )
        .unwrap();

        broker
            .export(&GroupName::new("primary"), &outputs(&[("subnet", json!("sub-1"))]))
            .await
            .unwrap();
        let image_dir = root.path().join("image");
        broker.import(&image, &image_dir, &plan).await.unwrap();
        assert!(image_dir.join("builder/builder_inputs.auto.pkrvars.json").is_file());
    }

    #[tokio::test]
    async fn test_missing_outputs_suggests_export() {
        let root = TempDir::new().unwrap();
        let broker = LocalArtifactBroker::new(root.path().join("artifacts"));
        let cluster = Group::new("cluster", vec![tf("slurm")]).with_input("primary", "subnet");
        let plan = GroupPlan::new(
            vec![Group::new("primary", vec![tf("network")]), cluster.clone()],
            BTreeMap::new(),
        )
        .unwrap();

        let err = broker
            .import(&cluster, &root.path().join("cluster"), &plan)
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("hpcctl export-outputs"));
        assert!(message.contains("primary"));
    }

    #[tokio::test]
    async fn test_duplicate_input_names_rejected() {
        let root = TempDir::new().unwrap();
        let broker = LocalArtifactBroker::new(root.path().join("artifacts"));
        let third = Group::new("third", vec![tf("vm")])
            .with_input("first", "name")
            .with_input("second", "name");
        let plan = GroupPlan::new(
            vec![
                Group::new("first", vec![tf("a")]),
                Group::new("second", vec![tf("b")]),
                third.clone(),
            ],
            BTreeMap::new(),
        )
        .unwrap();

        for source in ["first", "second"] {
            broker
                .export(&GroupName::new(source), &outputs(&[("name", json!(source))]))
                .await
                .unwrap();
        }
        let err = broker
            .import(&third, &root.path().join("third"), &plan)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Artifact(ArtifactError::DuplicateInput { .. })
        ));
    }

    #[tokio::test]
    async fn test_inputs_must_come_from_earlier_groups() {
        let root = TempDir::new().unwrap();
        let broker = LocalArtifactBroker::new(root.path().join("artifacts"));
        let primary = Group::new("primary", vec![tf("network")]).with_input("cluster", "subnet");
        let plan = GroupPlan::new(
            vec![primary.clone(), Group::new("cluster", vec![tf("slurm")])],
            BTreeMap::new(),
        )
        .unwrap();
        broker
            .export(&GroupName::new("cluster"), &outputs(&[("subnet", json!("sub-1"))]))
            .await
            .unwrap();

        let primary_dir = root.path().join("primary");
        let err = broker.import(&primary, &primary_dir, &plan).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Config(ConfigError::InputFromLaterGroup { .. })
        ));
        assert!(!primary_dir.exists());

        let looped = Group::new("cluster", vec![tf("slurm")]).with_input("cluster", "subnet");
        let plan = GroupPlan::new(vec![looped.clone()], BTreeMap::new()).unwrap();
        let err = broker.import(&looped, &root.path().join("cluster"), &plan).await.unwrap_err();
        assert!(err.to_string().contains("not an earlier group"));
    }

    #[tokio::test]
    async fn test_no_inputs_and_no_outputs_write_nothing() {
        let root = TempDir::new().unwrap();
        let artifacts = root.path().join("artifacts");
        let broker = LocalArtifactBroker::new(&artifacts);
        let primary = Group::new("primary", vec![tf("network")]);
        let plan = GroupPlan::new(vec![primary.clone()], BTreeMap::new()).unwrap();

        broker.import(&primary, &root.path().join("primary"), &plan).await.unwrap();
        broker.export(&primary.name, &Outputs::new()).await.unwrap();
        assert!(!artifacts.exists());
        assert!(!root.path().join("primary").exists());
    }
}
