//! Loader for the expanded plan stored in the artifacts directory.
//!
//! Blueprint expansion happens elsewhere; this module only reads its result
//! back so that deploy and destroy can run against it.

use crate::error::{ConfigError, OrchestratorError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::plan::GroupPlan;

/// File name of the expanded plan inside the artifacts directory.
pub const EXPANDED_PLAN_FILE: &str = "expanded_blueprint.yaml";

/// Loader for expanded group plans.
#[derive(Debug, Default)]
pub struct PlanLoader {
    /// Base path for the `.env` file.
    base_path: Option<PathBuf>,
}

impl PlanLoader {
    /// Creates a new plan loader.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the directory searched for `.env`.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads the expanded plan from an artifacts directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the plan
    /// violates its invariants.
    pub fn load_from_artifacts(&self, artifacts_dir: &Path) -> Result<GroupPlan> {
        self.load_file(artifacts_dir.join(EXPANDED_PLAN_FILE))
    }

    /// Loads a plan from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<GroupPlan> {
        let path = path.as_ref();
        info!("Loading deployment plan from: {}", path.display());

        if !path.exists() {
            return Err(OrchestratorError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            OrchestratorError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses a plan from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or the plan is inconsistent.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<GroupPlan> {
        debug!("Parsing YAML plan");

        let plan: GroupPlan = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            OrchestratorError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;
        plan.check_invariants()?;

        debug!("Parsed plan with {} deployment groups", plan.groups().len());
        Ok(plan)
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                OrchestratorError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GroupKind;
    use tempfile::TempDir;

    const PLAN: &str = r#"
vars:
  project_id: hpc-project
  deployment_name: hpc-small
  region: us-central1
deployment_groups:
  - group: primary
    modules:
      - id: network
        source: modules/network/vpc
        kind: terraform
      - id: cluster
        source: community/modules/scheduler/slurm
        kind: terraform
  - group: image
    modules:
      - id: image-builder
        source: modules/packer/custom-image
        kind: packer
    inputs:
      - group: primary
        output: subnetwork_name_network
"#;

    #[test]
    fn test_parse_plan() {
        let plan = PlanLoader::new().parse_yaml(PLAN, None).unwrap();
        assert_eq!(plan.groups().len(), 2);
        assert_eq!(plan.groups()[0].name.as_str(), "primary");
        assert_eq!(plan.groups()[0].kind(), GroupKind::Terraform);
        assert_eq!(plan.groups()[1].kind(), GroupKind::Packer);
        assert_eq!(plan.groups()[1].inputs[0].output, "subnetwork_name_network");
        assert_eq!(plan.string_var("deployment_name").unwrap(), "hpc-small");
    }

    #[test]
    fn test_unknown_module_kind_parses_as_unknown() {
        let yaml = r"
deployment_groups:
  - group: odd
    modules:
      - id: thing
        source: modules/thing
        kind: pulumi
";
        let plan = PlanLoader::new().parse_yaml(yaml, None).unwrap();
        assert_eq!(plan.groups()[0].kind(), GroupKind::Unknown);
    }

    #[test]
    fn test_duplicate_groups_fail_to_load() {
        let yaml = r"
deployment_groups:
  - group: a
  - group: a
";
        assert!(PlanLoader::new().parse_yaml(yaml, None).is_err());
    }

    #[test]
    fn test_load_from_artifacts() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(EXPANDED_PLAN_FILE), PLAN).unwrap();

        let plan = PlanLoader::new().load_from_artifacts(temp.path()).unwrap();
        assert_eq!(plan.groups().len(), 2);
    }

    #[test]
    fn test_missing_plan_file() {
        let temp = TempDir::new().unwrap();
        let err = PlanLoader::new().load_from_artifacts(temp.path()).unwrap_err();
        assert!(matches!(err, OrchestratorError::Config(ConfigError::FileNotFound { .. })));
    }
}
