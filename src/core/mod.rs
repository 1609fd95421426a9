//! Core engine - steps, error model, interrupts, pipeline execution

mod error;
mod executor;
mod signal;
mod step;

pub use error::{Cause, Error, Signal, StepError};
pub use executor::{run_steps, Executor, Pipeline, PipelineEvent};
pub use signal::Interrupts;
pub use step::{system_launcher, Launcher, Step, StepConfig, TimeoutStep, DEFAULT_TIMEOUT};
