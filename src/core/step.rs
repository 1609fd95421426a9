//! Pipeline steps - one external command each, in three flavours
//!
//! Every step runs a single process in its project directory and either
//! returns its success message or a [`StepError`] naming the step.

use super::error::{Cause, StepError};
use std::fmt;
use std::path::PathBuf;
use std::process::{ExitStatus, Output, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Timeout applied when a timeout step is built with a zero duration
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the command a timeout step will run.
///
/// Swapped out in tests to launch a stand-in process instead of the real tool.
pub type Launcher = Arc<dyn Fn(&str, &[String]) -> Command + Send + Sync>;

/// Launcher that runs the configured executable directly
pub fn system_launcher() -> Launcher {
    Arc::new(|exe: &str, args: &[String]| {
        let mut cmd = Command::new(exe);
        cmd.args(args);
        cmd
    })
}

/// Configuration shared by every step kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepConfig {
    pub name: String,
    pub exe: String,
    pub message: String,
    pub proj: PathBuf,
    pub args: Vec<String>,
}

impl StepConfig {
    /// Create a step configuration
    pub fn new(
        name: impl Into<String>,
        exe: impl Into<String>,
        message: impl Into<String>,
        proj: impl Into<PathBuf>,
        args: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            exe: exe.into(),
            message: message.into(),
            proj: proj.into(),
            args,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.exe);
        cmd.args(&self.args);
        cmd
    }

    fn exec_failed(&self, cause: Cause) -> StepError {
        StepError::new(&self.name, "failed to execute", Some(cause))
    }
}

/// A step bound to a hard wall-clock deadline
#[derive(Clone)]
pub struct TimeoutStep {
    pub config: StepConfig,
    timeout: Duration,
    launcher: Launcher,
}

impl TimeoutStep {
    /// Create a timeout step; a zero `timeout` means [`DEFAULT_TIMEOUT`]
    pub fn new(config: StepConfig, timeout: Duration) -> Self {
        let timeout = if timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            timeout
        };

        Self {
            config,
            timeout,
            launcher: system_launcher(),
        }
    }

    /// Replace the process launcher
    pub fn with_launcher(mut self, launcher: Launcher) -> Self {
        self.launcher = launcher;
        self
    }

    /// Effective deadline, never zero
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn execute(&self) -> Result<String, StepError> {
        let cfg = &self.config;
        let cmd = (self.launcher)(cfg.exe.as_str(), cfg.args.as_slice());

        // Dropping the pending status future on expiry kills the child and
        // releases the timer, so no exit path leaks either.
        match tokio::time::timeout(self.timeout, run(cmd, cfg)).await {
            Err(_) => {
                log::warn!("Step {} exceeded its {:?} deadline", cfg.name, self.timeout);
                Err(StepError::new(
                    &cfg.name,
                    "timeout, command failed",
                    Some(Cause::DeadlineExceeded(self.timeout)),
                ))
            }
            Ok(status) => {
                check_status(cfg, status?)?;
                Ok(cfg.message.clone())
            }
        }
    }
}

impl fmt::Debug for TimeoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeoutStep")
            .field("config", &self.config)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// One unit of pipeline work
#[derive(Debug, Clone)]
pub enum Step {
    /// Succeeds on a zero exit status
    Plain(StepConfig),
    /// Succeeds on a zero exit status with nothing written to stdout.
    /// Any stdout counts as a reported problem, even on exit code 0.
    OutputSensitive(StepConfig),
    /// Like `Plain`, but killed and failed once its deadline passes
    Timeout(TimeoutStep),
}

impl Step {
    /// Step that succeeds on a zero exit status
    pub fn plain(config: StepConfig) -> Self {
        Self::Plain(config)
    }

    /// Step that also fails when the command prints anything
    pub fn output_sensitive(config: StepConfig) -> Self {
        Self::OutputSensitive(config)
    }

    /// Step bound to `timeout`, using the system launcher
    pub fn timeout(config: StepConfig, timeout: Duration) -> Self {
        Self::Timeout(TimeoutStep::new(config, timeout))
    }

    /// Shared configuration of any step kind
    pub fn config(&self) -> &StepConfig {
        match self {
            Self::Plain(cfg) | Self::OutputSensitive(cfg) => cfg,
            Self::Timeout(step) => &step.config,
        }
    }

    /// Step name, used to identify its errors
    pub fn name(&self) -> &str {
        &self.config().name
    }

    /// Run the step's command and report its success message
    pub async fn execute(&self) -> Result<String, StepError> {
        log::info!("Running step: {}", self.name());

        match self {
            Self::Plain(cfg) => {
                let status = run(cfg.command(), cfg).await?;
                check_status(cfg, status)?;
                Ok(cfg.message.clone())
            }
            Self::OutputSensitive(cfg) => {
                let output = capture(cfg.command(), cfg).await?;
                check_status(cfg, output.status)?;

                if !output.stdout.is_empty() {
                    let text = String::from_utf8_lossy(&output.stdout);
                    return Err(StepError::new(
                        &cfg.name,
                        format!("invalid format: {}", text),
                        None,
                    ));
                }

                Ok(cfg.message.clone())
            }
            Self::Timeout(step) => step.execute().await,
        }
    }
}

/// Spawn `cmd` in the step's directory and wait for it to exit.
///
/// Output goes to null, so a background process left holding the child's
/// stdio cannot keep the step waiting once the command itself has exited.
async fn run(mut cmd: Command, cfg: &StepConfig) -> Result<ExitStatus, StepError> {
    cmd.current_dir(&cfg.proj)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    cmd.status()
        .await
        .map_err(|e| cfg.exec_failed(Cause::Spawn(e)))
}

/// Like [`run`], but collects stdout until the pipe closes
async fn capture(mut cmd: Command, cfg: &StepConfig) -> Result<Output, StepError> {
    cmd.current_dir(&cfg.proj)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    cmd.output()
        .await
        .map_err(|e| cfg.exec_failed(Cause::Spawn(e)))
}

fn check_status(cfg: &StepConfig, status: ExitStatus) -> Result<(), StepError> {
    if status.success() {
        return Ok(());
    }

    log::debug!("Step {} exited with {}", cfg.name, status);
    Err(cfg.exec_failed(Cause::Exit(status)))
}
