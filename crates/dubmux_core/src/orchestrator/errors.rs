//! Error types for the assembly pipeline.
//!
//! Errors carry context that chains through layers:
//! Job → Step → Operation → Detail

use std::io;

use thiserror::Error;

use crate::captions::CaptionError;
use crate::collaborators::FetchError;
use crate::media::ToolError;
use crate::models::ErrorKind;

/// Default length of user-facing failure messages.
pub const DEFAULT_DIAGNOSTIC_LIMIT: usize = 200;

/// Top-level pipeline error with job context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required step failed.
    #[error("Job '{job_id}' failed at step '{step_name}': {source}")]
    StepFailed {
        job_id: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// Pipeline was cancelled at a step boundary.
    #[error("Job '{job_id}' was cancelled")]
    Cancelled { job_id: String },

    /// Failed to set up the job (workspace, log file).
    #[error("Job '{job_id}' setup failed: {message}")]
    SetupFailed { job_id: String, message: String },
}

impl PipelineError {
    pub fn step_failed(
        job_id: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            job_id: job_id.into(),
            step_name: step_name.into(),
            source,
        }
    }

    pub fn setup_failed(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            job_id: job_id.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(job_id: impl Into<String>) -> Self {
        Self::Cancelled {
            job_id: job_id.into(),
        }
    }

    /// Failure category for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::StepFailed { source, .. } => source.kind(),
            PipelineError::Cancelled { .. } => ErrorKind::Cancelled,
            PipelineError::SetupFailed { .. } => ErrorKind::Internal,
        }
    }

    /// Short message for users: the innermost cause, cut to `limit` chars.
    pub fn diagnostic(&self, limit: usize) -> String {
        let message = match self {
            PipelineError::StepFailed {
                step_name, source, ..
            } => format!("{}: {}", step_name, source),
            other => other.to_string(),
        };
        truncate_chars(&message, limit)
    }
}

/// Error from a pipeline step.
#[derive(Error, Debug)]
pub enum StepError {
    /// The source asset could not be obtained.
    #[error("Failed to fetch source: {0}")]
    Fetch(String),

    /// Metadata could not be read.
    #[error("Failed to probe {what}: {message}")]
    Probe { what: String, message: String },

    /// Audio decode or encode failed.
    #[error("Audio format error: {0}")]
    Format(String),

    /// Caption timestamps are malformed or out of order.
    #[error("Caption validation failed: {0}")]
    Validation(String),

    /// An encode stage failed.
    #[error("{stage} encode failed{}: {message}", exit_code_suffix(.exit_code))]
    Encode {
        stage: String,
        exit_code: Option<i32>,
        message: String,
    },

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),
}

impl StepError {
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch(message.into())
    }

    pub fn probe(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Probe {
            what: what.into(),
            message: message.into(),
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn encode(stage: impl Into<String>, exit_code: Option<i32>, message: impl Into<String>) -> Self {
        Self::Encode {
            stage: stage.into(),
            exit_code,
            message: message.into(),
        }
    }

    /// Wrap a failed tool run as an encode error of `stage`.
    pub fn encode_tool(stage: impl Into<String>, err: &ToolError) -> Self {
        let message = err.stderr().map(str::to_string).unwrap_or_else(|| err.to_string());
        Self::encode(stage, err.exit_code(), message)
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StepError::Fetch(_) => ErrorKind::Fetch,
            StepError::Probe { .. } => ErrorKind::Probe,
            StepError::Format(_) => ErrorKind::Format,
            StepError::Validation(_) => ErrorKind::Validation,
            StepError::Encode { .. } => ErrorKind::Encode,
            StepError::Io { .. } => ErrorKind::Io,
            StepError::InvalidInput(_) | StepError::InvalidOutput(_) => ErrorKind::Internal,
        }
    }
}

impl From<FetchError> for StepError {
    fn from(err: FetchError) -> Self {
        StepError::Fetch(err.to_string())
    }
}

impl From<CaptionError> for StepError {
    fn from(err: CaptionError) -> Self {
        StepError::Validation(err.to_string())
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

fn exit_code_suffix(exit_code: &Option<i32>) -> String {
    exit_code
        .map(|c| format!(" with exit code {}", c))
        .unwrap_or_default()
}

fn truncate_chars(message: &str, limit: usize) -> String {
    match message.char_indices().nth(limit) {
        None => message.to_string(),
        Some((cut, _)) => {
            let mut short = message[..cut].trim_end().to_string();
            short.push('…');
            short
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_error_displays_context() {
        let err = StepError::encode("Mux", Some(1), "Invalid data found when processing input");
        let msg = err.to_string();
        assert!(msg.contains("Mux"));
        assert!(msg.contains("exit code 1"));
        assert!(msg.contains("Invalid data"));
        assert_eq!(err.kind(), ErrorKind::Encode);

        let no_code = StepError::encode("Burn", None, "output missing").to_string();
        assert_eq!(no_code, "Burn encode failed: output missing");
    }

    #[test]
    fn pipeline_error_chains_context() {
        let err = PipelineError::step_failed("job-7", "Reconcile", StepError::format("empty PCM"));
        let msg = err.to_string();
        assert!(msg.contains("job-7"));
        assert!(msg.contains("Reconcile"));
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(PipelineError::cancelled("job-7").kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn diagnostic_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        let err = PipelineError::step_failed("j", "Mux", StepError::encode("Mux", Some(1), long));
        let diag = err.diagnostic(DEFAULT_DIAGNOSTIC_LIMIT);
        assert_eq!(diag.chars().count(), DEFAULT_DIAGNOSTIC_LIMIT + 1);
        assert!(diag.ends_with('…'));

        let short = PipelineError::cancelled("j").diagnostic(DEFAULT_DIAGNOSTIC_LIMIT);
        assert_eq!(short, "Job 'j' was cancelled");
    }

    #[test]
    fn tool_failure_keeps_stderr() {
        let tool = ToolError::failed("ffmpeg", 234, "Error opening output file");
        let err = StepError::encode_tool("Mux", &tool);
        match err {
            StepError::Encode { exit_code, message, .. } => {
                assert_eq!(exit_code, Some(234));
                assert_eq!(message, "Error opening output file");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
