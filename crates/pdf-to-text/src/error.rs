//! Error types for extraction and scanning

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::process::ProcessOutput;

#[derive(Error, Debug)]
pub enum PdfTextError {
    #[error("Could not read `{}`", .path.display())]
    PdfNotFound { path: PathBuf },

    #[error("No PDF selected, call set_pdf first")]
    PdfNotSet,

    #[error("Could not extract text: {0}")]
    TextExtraction(ProcessFailure),

    #[error("Could not scan PDF: {0}")]
    Scan(ProcessFailure),

    #[error("Blocking call made from inside a tokio runtime, use the async variant")]
    NestedRuntime,

    #[error("Failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Invalid configuration in {}: {}", .path.display(), .message)]
    Config { path: PathBuf, message: String },
}

impl PdfTextError {
    /// Diagnostics of the failed process, if this error came from one
    pub fn process_failure(&self) -> Option<&ProcessFailure> {
        match self {
            Self::TextExtraction(failure) | Self::Scan(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Why an external tool run did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The tool exited with a code other than 0
    NonZeroExit,
    /// The tool was terminated by a signal
    Signaled,
    /// The deadline passed and the tool was killed
    TimedOut(Duration),
    /// The tool could not be started at all
    Spawn(String),
    /// The tool ran but its status or output could not be collected
    Io(String),
}

/// Captured diagnostics of a failed tool run
#[derive(Debug, Clone)]
pub struct ProcessFailure {
    command: String,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
    reason: FailureReason,
}

impl ProcessFailure {
    /// Failure for a process that ran to completion without success
    pub(crate) fn from_output(command: String, output: &ProcessOutput) -> Self {
        let reason = match output.exit_code {
            Some(_) => FailureReason::NonZeroExit,
            None => FailureReason::Signaled,
        };
        Self {
            command,
            exit_code: output.exit_code,
            stdout: output.stdout_lossy(),
            stderr: output.stderr_lossy(),
            reason,
        }
    }

    /// Failure for a process that was stopped before it finished
    ///
    /// Keeps whatever output was captured up to that point.
    pub(crate) fn interrupted(command: String, reason: FailureReason, partial: &ProcessOutput) -> Self {
        Self {
            command,
            exit_code: None,
            stdout: partial.stdout_lossy(),
            stderr: partial.stderr_lossy(),
            reason,
        }
    }

    /// Failure for a process that never produced an exit status
    pub(crate) fn without_output(command: String, reason: FailureReason) -> Self {
        Self {
            command,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            reason,
        }
    }

    /// Rendered command line
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn reason(&self) -> &FailureReason {
        &self.reason
    }

    pub fn timed_out(&self) -> bool {
        matches!(self.reason, FailureReason::TimedOut(_))
    }
}

impl fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            FailureReason::NonZeroExit => write!(
                f,
                "`{}` exited with code {}",
                self.command,
                self.exit_code.unwrap_or(-1)
            )?,
            FailureReason::Signaled => write!(f, "`{}` was terminated by a signal", self.command)?,
            FailureReason::TimedOut(timeout) => write!(
                f,
                "`{}` exceeded the timeout of {:?}",
                self.command, timeout
            )?,
            FailureReason::Spawn(message) => {
                write!(f, "`{}` could not be started: {}", self.command, message)?
            }
            FailureReason::Io(message) => write!(f, "`{}`: {}", self.command, message)?,
        }

        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            write!(f, "\n\nError output:\n{}", stderr)?;
        }
        Ok(())
    }
}
