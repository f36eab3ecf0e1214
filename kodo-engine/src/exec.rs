use crate::compile::{self, CompileOutcome};
use crate::config::Config;
use crate::error::EngineError;
use crate::job::{ExecutionRequest, ExecutionResult};
use crate::lang::{LanguageProfile, LanguageRegistry};
use crate::prepare::prepare;
use crate::run;
use crate::workspace::WorkspaceManager;

use kodo_protocol::common::Mode;
use kodo_sandbox::{Isolator, Limits};
use kodo_utils::math::roundup_div;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Stage a job has entered, reported back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Compiling,
    Running,
}

/// Runs one job through prepare, compile, run and verdict.
pub struct Executor {
    config: Arc<Config>,
    registry: Arc<LanguageRegistry>,
    workspaces: WorkspaceManager,
    isolator: Arc<dyn Isolator>,
}

impl Executor {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<LanguageRegistry>,
        isolator: Arc<dyn Isolator>,
    ) -> Result<Self> {
        let workspaces = WorkspaceManager::new(&config.executor.workspace_root)?;
        info!(
            isolator = isolator.name(),
            workspace_root = %workspaces.root().display(),
            "executor is ready"
        );
        Ok(Self {
            config,
            registry,
            workspaces,
            isolator,
        })
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Checks that need no process and no workspace.
    pub fn validate(&self, req: &ExecutionRequest) -> Result<Arc<LanguageProfile>, EngineError> {
        let profile = self.registry.resolve(&req.language)?;

        let max_source_bytes = self.config.executor.max_source_bytes.as_u64();
        if req.source_code.len() as u64 > max_source_bytes {
            return Err(EngineError::InvalidInput(format!(
                "Code is too large: {} bytes, the limit is {} bytes.",
                req.source_code.len(),
                max_source_bytes
            )));
        }

        if req.mode == Mode::Submit && req.test_cases.is_empty() {
            return Err(EngineError::InvalidInput(
                "At least one test case is required in submit mode.".into(),
            ));
        }

        Ok(profile)
    }

    fn limits(&self, timeout_ms: u64, profile: &LanguageProfile) -> Limits {
        let executor = &self.config.executor;
        let mut limits = Limits::new(Duration::from_millis(timeout_ms));
        // one spare second so the wall clock fires first
        limits.cpu_time = Some(roundup_div(timeout_ms, 1000) + 1);
        limits.memory = profile
            .memory_limit
            .or(executor.memory_limit)
            .map(|m| m.as_u64());
        limits.file_size = executor.file_size_limit.map(|m| m.as_u64());
        limits.pids = executor.pids_limit;
        limits.output = executor.output_limit.as_u64() as usize;
        limits
    }

    pub fn compile_limits(&self, profile: &LanguageProfile) -> Limits {
        self.limits(self.config.executor.compile_timeout, profile)
    }

    pub fn run_limits(&self, profile: &LanguageProfile) -> Limits {
        self.limits(self.config.executor.run_timeout, profile)
    }

    /// Executes a validated request.
    ///
    /// The workspace is released on every path out of this function,
    /// including cancellation by dropping the future.
    pub async fn exec(
        &self,
        req: &ExecutionRequest,
        profile: &LanguageProfile,
        on_stage: &(dyn Fn(Stage) + Send + Sync),
    ) -> Result<ExecutionResult> {
        let id = req.request_id.as_str();

        let workspace = self
            .workspaces
            .acquire(id, profile)
            .context("failed to allocate workspace")?;
        let workspace = scopeguard::guard(workspace, |ws| ws.release());

        let source = prepare(profile, &req.source_code);

        on_stage(Stage::Compiling);
        let compile_limits = self.compile_limits(profile);
        let compiled = compile::compile(
            &*self.isolator,
            profile,
            &workspace,
            &source,
            &compile_limits,
        )
        .await?;

        match compiled {
            CompileOutcome::Failed { message, outcome } => {
                debug!(?outcome, "compilation failed");
                return Ok(ExecutionResult::compilation_error(id, message));
            }
            CompileOutcome::Compiled(outcome) => {
                debug!(time = outcome.real_time, "compiled");
            }
            CompileOutcome::Skipped => {}
        }

        on_stage(Stage::Running);
        let run_limits = self.run_limits(profile);

        if req.test_cases.is_empty() {
            let outcome = run::run(&*self.isolator, profile, &workspace, "", &run_limits).await?;
            return Ok(ExecutionResult::raw_run(
                id,
                &outcome,
                run_limits.wall_time,
            ));
        }

        let results = run::run_cases(
            &*self.isolator,
            profile,
            &workspace,
            &req.test_cases,
            req.mode,
            &run_limits,
        )
        .await?;

        Ok(ExecutionResult::judged(id, results, run_limits.wall_time))
    }
}
