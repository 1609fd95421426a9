//! goci - local continuous-integration pipeline executor
//!
//! Runs an ordered list of build/test/lint/publish steps against a project
//! directory, stops at the first failure, and can be interrupted safely by an
//! operator signal or a per-step timeout.

pub mod core;
pub mod pipeline;

// Re-exports
pub use crate::core::{
    Cause, Error, Executor, Interrupts, Launcher, Pipeline, Signal, Step, StepConfig, StepError,
    TimeoutStep,
};
pub use pipeline::{go_pipeline, GoOptions, PipelineConfig, StepKind, StepSpec};

use std::io::Write;
use std::path::PathBuf;

/// Result type alias
pub type Result<T> = anyhow::Result<T>;

/// Inputs for one run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub project: Option<PathBuf>,
    /// Pipeline file; when unset `goci.yml` in the project is tried,
    /// then the built-in Go pipeline
    pub config: Option<PathBuf>,
    pub go: GoOptions,
}

/// Resolve the pipeline for `opts` without running it
pub fn load_pipeline(opts: &RunOptions) -> Result<Pipeline> {
    let proj = match &opts.project {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => {
            return Err(Error::Validation("project directory is required".to_string()).into());
        }
    };

    if !proj.is_dir() {
        return Err(Error::Validation(format!(
            "project directory {} does not exist",
            proj.display()
        ))
        .into());
    }

    if let Some(path) = &opts.config {
        log::info!("Loading pipeline from: {}", path.display());
        return PipelineConfig::from_file(path)?.into_pipeline(proj);
    }

    if let Some(config) = PipelineConfig::from_project(proj)? {
        log::info!("Using {} from {}", pipeline::PROJECT_CONFIG_FILE, proj.display());
        return config.into_pipeline(proj);
    }

    Ok(go_pipeline(proj, &opts.go)?)
}

/// Run the pipeline for `opts`, writing success messages to `out`.
///
/// Ctrl-C (and SIGTERM on Unix) stops the run. A [`Error`] can be
/// recovered from the returned error with `downcast_ref`.
pub async fn run<W: Write>(opts: &RunOptions, out: &mut W) -> Result<()> {
    let pipeline = load_pipeline(opts)?;
    let interrupts = Interrupts::os()?;

    Executor::new().run(&pipeline, out, interrupts).await?;
    Ok(())
}
