//! Error model - structured, matchable failures for pipeline runs

use std::fmt;
use std::io;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Underlying reason a step failed
#[derive(Debug, Error)]
pub enum Cause {
    /// The command could not be started at all
    #[error("failed to spawn command: {0}")]
    Spawn(#[from] io::Error),
    /// The command ran but exited unsuccessfully
    #[error("{0}")]
    Exit(ExitStatus),
    /// The step's deadline elapsed before the command finished
    #[error("context deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),
}

/// Failure of a single pipeline step.
///
/// Identity is the step name alone: two `StepError`s compare equal when they
/// name the same step, whatever their message or cause. This lets callers
/// assert "the build step failed" without pinning the exact wording.
#[derive(Debug)]
pub struct StepError {
    step: String,
    message: String,
    cause: Option<Cause>,
}

impl StepError {
    /// Create a step error
    pub fn new(step: impl Into<String>, message: impl Into<String>, cause: Option<Cause>) -> Self {
        Self {
            step: step.into(),
            message: message.into(),
            cause,
        }
    }

    /// Matcher value for a step, for comparing against returned errors
    pub fn named(step: impl Into<String>) -> Self {
        Self::new(step, "", None)
    }

    /// Name of the failing step
    pub fn step(&self) -> &str {
        &self.step
    }

    /// Human description of the failure
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Underlying cause, if any
    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    /// True when the step was stopped by its deadline
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self.cause, Some(Cause::DeadlineExceeded(_)))
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step: {:?}: {}", self.step, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, ": Cause: {}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for StepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

impl PartialEq for StepError {
    fn eq(&self, other: &Self) -> bool {
        self.step == other.step
    }
}

impl Eq for StepError {}

/// Operator signal that stopped a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => write!(f, "interrupt"),
            Self::Terminate => write!(f, "terminated"),
        }
    }
}

/// Terminal error of a pipeline run
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Step(#[from] StepError),

    #[error("received signal: {0}")]
    Signal(Signal),

    #[error("failed to write step output: {0}")]
    Output(#[from] io::Error),

    #[error("pipeline worker stopped without reporting a result")]
    WorkerLost,
}

impl Error {
    /// True when this is a step failure for the named step
    pub fn is_step(&self, name: &str) -> bool {
        matches!(self, Self::Step(e) if e.step() == name)
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::Step(e) if e.is_deadline_exceeded())
    }

    pub fn signal(&self) -> Option<Signal> {
        match self {
            Self::Signal(sig) => Some(*sig),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_step_error_equality_by_name() {
        let a = StepError::new("go build", "failed to execute", None);
        let b = StepError::new(
            "go build",
            "something else",
            Some(Cause::DeadlineExceeded(Duration::from_secs(1))),
        );
        let c = StepError::new("go test", "failed to execute", None);

        assert_eq!(a, b);
        assert_eq!(a, StepError::named("go build"));
        assert_ne!(a, c);
    }

    #[test]
    fn test_step_error_display() {
        let err = StepError::new(
            "git push",
            "timeout, command failed",
            Some(Cause::DeadlineExceeded(Duration::from_secs(10))),
        );
        assert_eq!(
            err.to_string(),
            "Step: \"git push\": timeout, command failed: Cause: context deadline exceeded after 10s"
        );

        let err = StepError::new("go fmt", "invalid format: main.go\n", None);
        assert_eq!(err.to_string(), "Step: \"go fmt\": invalid format: main.go\n");
    }

    #[test]
    fn test_cause_is_reachable_through_source() {
        let err = StepError::new(
            "git push",
            "timeout, command failed",
            Some(Cause::DeadlineExceeded(Duration::from_secs(1))),
        );
        assert!(err.is_deadline_exceeded());

        let source = err.source().expect("cause should be exposed");
        assert!(matches!(
            source.downcast_ref::<Cause>(),
            Some(Cause::DeadlineExceeded(_))
        ));

        let no_cause = StepError::new("go fmt", "invalid format: x", None);
        assert!(no_cause.source().is_none());
        assert!(!no_cause.is_deadline_exceeded());
    }

    #[test]
    fn test_error_helpers() {
        let err = Error::from(StepError::named("go build"));
        assert!(err.is_step("go build"));
        assert!(!err.is_step("go test"));
        assert_eq!(err.signal(), None);

        let err = Error::Signal(Signal::Interrupt);
        assert_eq!(err.signal(), Some(Signal::Interrupt));
        assert_eq!(err.to_string(), "received signal: interrupt");
    }
}
