//! External tool execution.
//!
//! Every tool is started from an explicit argument vector. `ProcessRunner`
//! reports what happened and nothing more: whether a failure is fatal, and
//! whether the declared artifacts were really produced, is decided by the
//! calling stage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use duodok_common::{DuodokError, Result, ToolExecutionError, ToolFailure};

use crate::config::ToolchainConfig;
use crate::stage::Stage;

/// A fully rendered command ready to run.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl ToolInvocation {
    pub fn command_line(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Captured result of a process that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub exit_status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Anything that can carry out a `ToolInvocation`.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, invocation: &ToolInvocation) -> std::result::Result<ToolOutput, ToolExecutionError>;
}

// ── Process runner ────────────────────────────────────────────────────────────

/// Runs tools as child processes. No retries.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run one invocation to completion (or until its timeout elapses).
    pub async fn run(&self, invocation: &ToolInvocation) -> std::result::Result<ToolOutput, ToolExecutionError> {
        let fail = |kind| ToolExecutionError::new(invocation.tool.clone(), kind);

        let program = prepare_program(&invocation.program).await.map_err(fail)?;
        info!(tool = %invocation.tool, "Running {}", invocation.command_line().join(" "));

        let mut cmd = Command::new(&program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                fail(ToolFailure::NotFound(program.clone()))
            } else {
                fail(ToolFailure::Spawn(e))
            }
        })?;

        let waited = match invocation.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(res) => res,
                Err(_) => {
                    warn!(tool = %invocation.tool, "Timed out after {:?}; process killed", limit);
                    return Err(fail(ToolFailure::TimedOut(limit)));
                }
            },
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|e| fail(ToolFailure::Spawn(e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(fail(ToolFailure::ExitStatus { code: output.status.code(), stderr }));
        }

        debug!(tool = %invocation.tool, stdout_bytes = stdout.len(), "Tool completed");
        Ok(ToolOutput { exit_status: output.status.code(), stdout, stderr })
    }
}

#[async_trait]
impl ToolExecutor for ProcessRunner {
    async fn execute(&self, invocation: &ToolInvocation) -> std::result::Result<ToolOutput, ToolExecutionError> {
        self.run(invocation).await
    }
}

/// Pre-flight for locally bundled executables (any program given with a
/// directory part): it must exist, and gets its execute bits set if missing.
/// Bare names are left for `PATH` lookup.
async fn prepare_program(program: &Path) -> std::result::Result<PathBuf, ToolFailure> {
    let is_local = program.parent().is_some_and(|p| !p.as_os_str().is_empty());
    if !is_local {
        return Ok(program.to_path_buf());
    }

    // The child may run in another directory, so pin the path first.
    let path = std::path::absolute(program).map_err(ToolFailure::Spawn)?;
    let meta = match tokio::fs::metadata(&path).await {
        Ok(m) if m.is_file() => m,
        _ => return Err(ToolFailure::NotFound(path)),
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = meta.permissions();
        if perms.mode() & 0o100 == 0 {
            perms.set_mode(perms.mode() | 0o111);
            tokio::fs::set_permissions(&path, perms).await.map_err(ToolFailure::Spawn)?;
            info!("Set execute permission on {}", path.display());
        }
    }
    #[cfg(not(unix))]
    let _ = meta;

    Ok(path)
}

// ── Run steps ─────────────────────────────────────────────────────────────────

/// Record of one stage's tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStep {
    pub stage: Stage,
    pub command: Vec<String>,
    pub exit_status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Declared output artifacts of the stage.
    pub artifacts: Vec<PathBuf>,
    pub succeeded: bool,
    pub error: Option<String>,
}

// ── Toolchain ─────────────────────────────────────────────────────────────────

/// The configured tools plus the executor that runs them.
#[derive(Clone)]
pub struct Toolchain {
    config: ToolchainConfig,
    executor: Arc<dyn ToolExecutor>,
}

impl Toolchain {
    pub fn new(config: ToolchainConfig, executor: Arc<dyn ToolExecutor>) -> Self {
        Self { config, executor }
    }

    /// Toolchain backed by real child processes.
    pub fn with_processes(config: ToolchainConfig) -> Self {
        Self::new(config, Arc::new(ProcessRunner::new()))
    }

    pub fn config(&self) -> &ToolchainConfig {
        &self.config
    }

    /// Run the tool for `stage` and append a `RunStep` to `steps`.
    ///
    /// `produced` lists the declared artifacts the tool itself must write;
    /// a missing one fails the stage even if the tool exited cleanly.
    pub(crate) async fn invoke(
        &self,
        stage: Stage,
        vars: &[(&str, String)],
        working_dir: &Path,
        declared: Vec<PathBuf>,
        produced: &[PathBuf],
        steps: &mut Vec<RunStep>,
    ) -> Result<ToolOutput> {
        let spec = self.config.spec(stage);
        let tool = spec.name();

        let mut step = RunStep {
            stage,
            command: vec![spec.program.to_string_lossy().into_owned()],
            exit_status: None,
            stdout: String::new(),
            stderr: String::new(),
            artifacts: declared,
            succeeded: false,
            error: None,
        };

        let args = match spec.render(vars) {
            Ok(a) => a,
            Err(e) => {
                step.error = Some(e.to_string());
                steps.push(step);
                return Err(e);
            }
        };

        let invocation = ToolInvocation {
            tool: tool.clone(),
            program: spec.program.clone(),
            args,
            working_dir: Some(working_dir.to_path_buf()),
            timeout: self.config.timeout(),
        };
        step.command = invocation.command_line();

        let outcome = match self.executor.execute(&invocation).await {
            Ok(output) => check_produced(&tool, produced).await.map(|()| output),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(output) => {
                step.exit_status = output.exit_status;
                step.stdout = output.stdout.clone();
                step.stderr = output.stderr.clone();
                step.succeeded = true;
                steps.push(step);
                Ok(output)
            }
            Err(e) => {
                if let ToolFailure::ExitStatus { code, stderr } = &e.kind {
                    step.exit_status = *code;
                    step.stderr = stderr.clone();
                }
                step.error = Some(e.to_string());
                steps.push(step);
                Err(DuodokError::ToolExecution(e))
            }
        }
    }
}

async fn check_produced(tool: &str, produced: &[PathBuf]) -> std::result::Result<(), ToolExecutionError> {
    for path in produced {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ToolExecutionError::new(tool, ToolFailure::MissingArtifact(path.clone())));
        }
    }
    Ok(())
}
