//! Pipeline Executor - runs steps in order and races them against interrupts
//!
//! The steps run one after another in a background task that reports each
//! outcome over a channel. The foreground loop writes success messages as they
//! arrive and stops at the first terminal event: all steps done, a step
//! failure, or an operator signal.

use super::error::{Error, StepError};
use super::signal::Interrupts;
use super::step::Step;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Ordered, immutable list of steps
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Arc<[Step]>,
}

impl Pipeline {
    /// Build a pipeline; it must contain at least one step
    pub fn new(steps: Vec<Step>) -> Result<Self, Error> {
        if steps.is_empty() {
            return Err(Error::Validation("pipeline has no steps".to_string()));
        }

        Ok(Self {
            steps: steps.into(),
        })
    }

    /// Steps in execution order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a constructed pipeline
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Progress reported by the background step loop
#[derive(Debug)]
pub enum PipelineEvent {
    StepSucceeded { step: String, message: String },
    StepFailed(StepError),
    Finished,
}

/// Run `steps` in order without cancellation, writing each success message
/// to `out`. Returns the first step failure unchanged.
pub async fn run_steps<W: Write>(steps: &[Step], out: &mut W) -> Result<(), Error> {
    for step in steps {
        let message = step.execute().await?;
        write_message(out, &message)?;
    }

    Ok(())
}

fn write_message<W: Write>(out: &mut W, message: &str) -> Result<(), Error> {
    writeln!(out, "{}", message)?;
    out.flush()?;
    Ok(())
}

/// Pipeline executor - one run at a time, cancellable by interrupts
#[derive(Debug, Default)]
pub struct Executor;

impl Executor {
    /// Create a new executor
    pub fn new() -> Self {
        Self
    }

    /// Run the pipeline until it finishes, a step fails, or a signal arrives.
    ///
    /// Exactly one result is returned. Once it is decided the interrupt source
    /// is disarmed and the background task is aborted, which kills any command
    /// still running.
    pub async fn run<W: Write>(
        &self,
        pipeline: &Pipeline,
        out: &mut W,
        mut interrupts: Interrupts,
    ) -> Result<(), Error> {
        log::info!("Starting pipeline with {} steps", pipeline.len());

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let steps = pipeline.steps.clone();

        let worker = tokio::spawn(async move {
            for step in steps.iter() {
                match step.execute().await {
                    Ok(message) => {
                        let event = PipelineEvent::StepSucceeded {
                            step: step.name().to_string(),
                            message,
                        };
                        if event_tx.send(event).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        let _ = event_tx.send(PipelineEvent::StepFailed(e));
                        return;
                    }
                }
            }

            let _ = event_tx.send(PipelineEvent::Finished);
        });

        let result = loop {
            tokio::select! {
                // Drain step events first so a finished step is never lost to
                // a signal that arrived at the same moment.
                biased;

                event = event_rx.recv() => match event {
                    Some(PipelineEvent::StepSucceeded { step, message }) => {
                        log::info!("Step {} succeeded", step);
                        if let Err(e) = write_message(out, &message) {
                            break Err(e);
                        }
                    }
                    Some(PipelineEvent::StepFailed(e)) => {
                        log::warn!("Step {} failed: {}", e.step(), e.message());
                        break Err(Error::Step(e));
                    }
                    Some(PipelineEvent::Finished) => {
                        log::info!("Pipeline completed");
                        break Ok(());
                    }
                    None => break Err(Error::WorkerLost),
                },

                Some(sig) = interrupts.recv() => {
                    log::warn!("Pipeline interrupted by signal: {}", sig);
                    break Err(Error::Signal(sig));
                }
            }
        };

        interrupts.disarm();
        worker.abort();

        result
    }
}
