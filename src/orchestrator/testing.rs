//! Recording fakes shared by the orchestrator tests.

use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::approval::{ApplyBehavior, ApprovalGate, ScriptedPrompter};
use crate::artifacts::ArtifactBroker;
use crate::cloud::NetworkCleanup;
use crate::config::{Group, GroupKind, GroupName, GroupPlan, ModuleRef, RunContext, Selection};
use crate::error::{CleanupError, ExecutionError, OrchestratorError, Result, RuleDeletionFailure};
use crate::shell::{GroupExecutor, Outputs};

use super::deploy::{DeployOrchestrator, DeployReport};
use super::destroy::{DestroyOrchestrator, DestroyOutcome};

type Events = Arc<Mutex<Vec<String>>>;

fn record(events: &Events, event: String) {
    events.lock().unwrap().push(event);
}

fn last_components(path: &Path, n: usize) -> String {
    let parts: Vec<_> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts[parts.len() - n..].join("/")
}

/// Terraform group with a network module.
pub fn network_tf(name: &str) -> Group {
    Group::new(
        name,
        vec![ModuleRef::new("network", "modules/network/vpc", GroupKind::Terraform)],
    )
}

/// Terraform group without a network module.
pub fn tf(name: &str) -> Group {
    Group::new(
        name,
        vec![ModuleRef::new("vm", "modules/compute/vm", GroupKind::Terraform)],
    )
}

/// Packer group with one module.
pub fn packer(name: &str, module: &str) -> Group {
    Group::new(
        name,
        vec![ModuleRef::new(module, "modules/packer/custom-image", GroupKind::Packer)],
    )
}

/// Deployment variables used by robust destroy.
pub fn default_vars() -> BTreeMap<String, serde_json::Value> {
    BTreeMap::from([
        (String::from("project_id"), json!("hpc-project")),
        (String::from("deployment_name"), json!("hpc-small")),
    ])
}

/// Executor recording every call; groups can be told to fail.
#[derive(Default)]
pub struct RecordingExecutor {
    events: Events,
    failures: Mutex<HashMap<String, u32>>,
    no_tools: AtomicBool,
}

impl RecordingExecutor {
    /// Fails every apply or destroy of `group`.
    pub fn fail_on(&self, group: &str) {
        self.fail_times(group, u32::MAX);
    }

    /// Fails the next `times` applies or destroys of `group`.
    pub fn fail_times(&self, group: &str, times: u32) {
        self.failures.lock().unwrap().insert(group.to_string(), times);
    }

    /// Reports every tool as missing.
    pub fn without_tools(&self) {
        self.no_tools.store(true, Ordering::SeqCst);
    }

    fn outcome(&self, verb: &str, dir: &Path) -> Result<()> {
        let group = last_components(dir, 1);
        record(&self.events, format!("{verb} {group}"));
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(&group) {
            Some(remaining) if *remaining > 0 => {
                *remaining = remaining.saturating_sub(1);
                Err(ExecutionError::CommandFailed {
                    program: String::from("terraform"),
                    args: verb.to_string(),
                    dir: dir.to_path_buf(),
                    status: String::from("exit status: 1"),
                    stderr: String::new(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl GroupExecutor for RecordingExecutor {
    fn check_tool(&self, kind: GroupKind, group_dir: &Path) -> Result<()> {
        if kind == GroupKind::Unknown {
            return Err(crate::error::ConfigError::UnsupportedKind {
                group: group_dir.display().to_string(),
                kind: kind.to_string(),
            }
            .into());
        }
        if self.no_tools.load(Ordering::SeqCst) {
            return Err(OrchestratorError::tool_not_found(kind.to_string(), "install it"));
        }
        Ok(())
    }

    async fn apply(&self, group_dir: &Path) -> Result<Outputs> {
        self.outcome("apply", group_dir)?;
        Ok(Outputs::from([(String::from("subnet"), json!("sub-1"))]))
    }

    async fn destroy(&self, group_dir: &Path) -> Result<()> {
        self.outcome("destroy", group_dir)
    }

    async fn outputs(&self, group_dir: &Path) -> Result<Outputs> {
        record(&self.events, format!("outputs {}", last_components(group_dir, 1)));
        Ok(Outputs::new())
    }

    async fn packer_build(&self, module_dir: &Path) -> Result<()> {
        record(&self.events, format!("build {}", last_components(module_dir, 2)));
        Ok(())
    }
}

/// Broker recording imports and exports; imports can be told to fail.
#[derive(Default)]
pub struct RecordingBroker {
    events: Events,
    failing_imports: AtomicBool,
}

impl RecordingBroker {
    /// Makes every import fail.
    pub fn fail_imports(&self) {
        self.failing_imports.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ArtifactBroker for RecordingBroker {
    async fn import(&self, group: &Group, _group_dir: &Path, _plan: &GroupPlan) -> Result<()> {
        record(&self.events, format!("import {}", group.name));
        if self.failing_imports.load(Ordering::SeqCst) {
            return Err(crate::error::ArtifactError::MissingOutputs {
                path: "outputs.json".into(),
                hint: String::from("export first"),
                message: String::from("not found"),
            }
            .into());
        }
        Ok(())
    }

    async fn export(&self, group: &GroupName, _outputs: &Outputs) -> Result<()> {
        record(&self.events, format!("export {group}"));
        Ok(())
    }
}

/// Cleanup recording its calls; can be told to fail.
#[derive(Default)]
pub struct RecordingCleanup {
    events: Events,
    failing: AtomicBool,
}

impl RecordingCleanup {
    /// Makes every cleanup fail.
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl NetworkCleanup for RecordingCleanup {
    async fn clean(&self, project: &str, deployment: &str) -> Result<()> {
        record(&self.events, format!("cleanup {project}/{deployment}"));
        if self.failing.load(Ordering::SeqCst) {
            return Err(CleanupError::DeletionFailed {
                failures: vec![RuleDeletionFailure {
                    rule: String::from("fw-1"),
                    message: String::from("in use"),
                }],
            }
            .into());
        }
        Ok(())
    }
}

/// A deployment on disk plus recording collaborators sharing one event log.
pub struct Harness {
    _root: TempDir,
    events: Events,
    pub ctx: RunContext,
    pub plan: GroupPlan,
    pub executor: RecordingExecutor,
    pub broker: RecordingBroker,
    pub cleanup: RecordingCleanup,
    pub prompter: Arc<ScriptedPrompter>,
    pub gate: ApprovalGate,
}

impl Harness {
    /// Creates a harness with the default deployment variables.
    pub fn new(groups: Vec<Group>, behavior: ApplyBehavior) -> Self {
        Self::with_vars(groups, behavior, default_vars(), &[])
    }

    /// Creates a harness with explicit variables and scripted answers.
    pub fn with_vars(
        groups: Vec<Group>,
        behavior: ApplyBehavior,
        vars: BTreeMap<String, serde_json::Value>,
        answers: &[&str],
    ) -> Self {
        let root = TempDir::new().unwrap();
        for group in &groups {
            std::fs::create_dir_all(group.dir(root.path())).unwrap();
        }
        let plan = GroupPlan::new(groups, vars).unwrap();
        let ctx = RunContext::new(root.path(), behavior);
        std::fs::create_dir_all(&ctx.artifacts_dir).unwrap();

        let events = Events::default();
        let prompter = Arc::new(ScriptedPrompter::new(answers.iter().copied()));
        let gate = ApprovalGate::new(behavior, prompter.clone());
        Self {
            _root: root,
            executor: RecordingExecutor {
                events: events.clone(),
                ..RecordingExecutor::default()
            },
            broker: RecordingBroker {
                events: events.clone(),
                ..RecordingBroker::default()
            },
            cleanup: RecordingCleanup {
                events: events.clone(),
                ..RecordingCleanup::default()
            },
            events,
            ctx,
            plan,
            prompter,
            gate,
        }
    }

    /// Events recorded so far, in order.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Runs a deploy.
    pub async fn deploy(&self, selection: &Selection) -> Result<DeployReport> {
        DeployOrchestrator::new(&self.ctx, &self.executor, &self.broker, &self.gate)
            .run(&self.plan, selection)
            .await
    }

    /// Runs a destroy.
    pub async fn destroy(&self, selection: &Selection, robust: bool) -> Result<DestroyOutcome> {
        DestroyOrchestrator::new(&self.ctx, &self.executor, &self.broker, &self.cleanup, &self.gate)
            .run(&self.plan, selection, robust)
            .await
    }
}
