//! Pulumi engine implementation

use crate::error::{PulumiError, Result};
use crate::project;
use crate::pulumi::Pulumi;
use async_trait::async_trait;
use stackport_cloud::{
    AuthStatus, EngineClient, EngineError, ProgressObserver, Program, StackHandle, StackInfo,
    StackOutputs,
};
use std::path::{Path, PathBuf};

const PROJECT_DIR: &str = "_project";
const STACKS_DIR: &str = "stacks";
const MAX_STACK_NAME: usize = 100;

/// Check a stack name before it is used as a directory and CLI argument
pub fn validate_stack_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_STACK_NAME
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');

    if valid {
        Ok(())
    } else {
        Err(PulumiError::InvalidStackName(name.to_string()))
    }
}

/// Pulumi engine
///
/// Programs are written as YAML projects under `work_dir`:
///
/// ```text
/// <work_dir>/
///   _project/Pulumi.yaml        empty program for project-wide commands
///   stacks/<name>/Pulumi.yaml   last program applied to <name>
/// ```
pub struct PulumiEngine {
    pulumi: Pulumi,
    project: String,
    region: String,
    work_dir: PathBuf,
}

impl PulumiEngine {
    pub fn new(
        project: impl Into<String>,
        region: impl Into<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            pulumi: Pulumi::default(),
            project: project.into(),
            region: region.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Use a specific pulumi binary instead of the one on `PATH`
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.pulumi = Pulumi::new(binary);
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn project_dir(&self) -> PathBuf {
        self.work_dir.join(PROJECT_DIR)
    }

    pub fn stack_dir(&self, name: &str) -> PathBuf {
        self.work_dir.join(STACKS_DIR).join(name)
    }

    /// Directory a program runs from; programs without resources share the project dir
    fn dir_for(&self, name: &str, program: &Program) -> PathBuf {
        if program.is_noop() {
            self.project_dir()
        } else {
            self.stack_dir(name)
        }
    }

    async fn ensure_project_dir(&self) -> Result<PathBuf> {
        let dir = self.project_dir();
        project::write(&dir, &self.project, &Program::noop()).await?;
        Ok(dir)
    }

    async fn prepare(&self, name: &str, program: &Program) -> Result<PathBuf> {
        validate_stack_name(name)?;
        let dir = self.dir_for(name, program);
        project::write(&dir, &self.project, program).await?;
        Ok(dir)
    }

    async fn configure(&self, name: &str, dir: &Path) -> Result<()> {
        self.pulumi
            .config_set(name, "aws:region", &self.region, dir)
            .await
    }

    async fn create_stack(&self, name: &str, program: &Program) -> Result<()> {
        let dir = self.prepare(name, program).await?;
        self.pulumi.stack_init(name, &dir).await?;
        self.configure(name, &dir).await
    }

    async fn select_stack(&self, name: &str, program: &Program) -> Result<()> {
        let dir = self.prepare(name, program).await?;
        match self.pulumi.stack_select(name, &dir).await {
            Ok(()) => {}
            Err(e @ PulumiError::StackNotFound(_)) => {
                if !program.is_noop() {
                    self.remove_stack_dir(name).await?;
                }
                return Err(e);
            }
            Err(e) => return Err(e),
        }
        self.configure(name, &dir).await
    }

    async fn remove_stack_dir(&self, name: &str) -> Result<()> {
        match tokio::fs::remove_dir_all(self.stack_dir(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_stack(
        &self,
        stack: &StackHandle,
        observer: &dyn ProgressObserver,
    ) -> Result<StackOutputs> {
        let dir = self.dir_for(&stack.name, &stack.program);
        self.pulumi.up(&stack.name, &dir, observer).await?;
        self.pulumi.stack_output(&stack.name, &dir).await
    }

    async fn forget_stack(&self, name: &str) -> Result<()> {
        validate_stack_name(name)?;
        let dir = self.ensure_project_dir().await?;
        self.pulumi.stack_rm(name, &dir).await?;
        self.remove_stack_dir(name).await
    }

    async fn stack_outputs(&self, name: &str) -> Result<StackOutputs> {
        validate_stack_name(name)?;
        let dir = self.ensure_project_dir().await?;
        self.pulumi.stack_output(name, &dir).await
    }

    async fn list_stacks(&self) -> Result<Vec<StackInfo>> {
        let dir = self.ensure_project_dir().await?;
        let stacks = self.pulumi.stack_ls(&dir).await?;

        // A stack whose outputs cannot be read fails the whole listing
        let mut infos = Vec::with_capacity(stacks.len());
        for stack in &stacks {
            let name = stack.short_name();
            let outputs = self
                .pulumi
                .stack_output(name, &dir)
                .await
                .inspect_err(|e| {
                    tracing::warn!(stack = name, error = %e, "Failed to read stack outputs");
                })?;
            infos.push(StackInfo {
                name: name.to_string(),
                outputs,
            });
        }

        tracing::debug!(project = %self.project, count = infos.len(), "Listed stacks");
        Ok(infos)
    }
}

#[async_trait]
impl EngineClient for PulumiEngine {
    fn name(&self) -> &str {
        "pulumi"
    }

    async fn check_auth(&self) -> std::result::Result<AuthStatus, EngineError> {
        let dir = match self.ensure_project_dir().await {
            Ok(dir) => dir,
            Err(e) => return Ok(AuthStatus::failed(e.to_string())),
        };

        match self.pulumi.whoami(&dir).await {
            Ok(who) => {
                let account_info = match who.url {
                    Some(url) => format!("{} ({})", who.user, url),
                    None => who.user,
                };
                Ok(AuthStatus::ok(account_info))
            }
            Err(PulumiError::PulumiNotFound) => Ok(AuthStatus::failed("pulumi is not installed")),
            Err(e) => Ok(AuthStatus::failed(e.to_string())),
        }
    }

    async fn create(
        &self,
        name: &str,
        program: Program,
    ) -> std::result::Result<StackHandle, EngineError> {
        self.create_stack(name, &program).await?;
        Ok(StackHandle::new(name, program))
    }

    async fn select(
        &self,
        name: &str,
        program: Program,
    ) -> std::result::Result<StackHandle, EngineError> {
        self.select_stack(name, &program).await?;
        Ok(StackHandle::new(name, program))
    }

    async fn apply(
        &self,
        stack: &StackHandle,
        observer: &dyn ProgressObserver,
    ) -> std::result::Result<StackOutputs, EngineError> {
        Ok(self.apply_stack(stack, observer).await?)
    }

    async fn destroy(
        &self,
        stack: &StackHandle,
        observer: &dyn ProgressObserver,
    ) -> std::result::Result<(), EngineError> {
        let dir = self.dir_for(&stack.name, &stack.program);
        Ok(self.pulumi.destroy(&stack.name, &dir, observer).await?)
    }

    async fn forget(&self, name: &str) -> std::result::Result<(), EngineError> {
        Ok(self.forget_stack(name).await?)
    }

    async fn outputs(&self, name: &str) -> std::result::Result<StackOutputs, EngineError> {
        Ok(self.stack_outputs(name).await?)
    }

    async fn list_all(&self) -> std::result::Result<Vec<StackInfo>, EngineError> {
        Ok(self.list_stacks().await?)
    }
}
