//! Errors from external media tools.

use std::io;

use thiserror::Error;

/// Failure invoking `ffmpeg` or `ffprobe`.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The process could not be started at all.
    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The process ran and exited non-zero.
    #[error("{tool} failed with exit code {exit_code}: {stderr}")]
    Failed {
        tool: String,
        exit_code: i32,
        /// Last lines of stderr.
        stderr: String,
    },

    /// The process did not finish in time and was killed.
    #[error("{tool} timed out after {seconds}s")]
    Timeout { tool: String, seconds: u64 },

    /// The process succeeded but its output made no sense.
    #[error("Failed to parse {tool} output: {message}")]
    Parse { tool: String, message: String },

    /// Reading or writing process I/O failed.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl ToolError {
    pub fn spawn(tool: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            tool: tool.into(),
            source,
        }
    }

    pub fn failed(tool: impl Into<String>, exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::Failed {
            tool: tool.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    pub fn parse(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Exit code, when the process ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ToolError::Failed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    /// Captured stderr, when there is any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ToolError::Failed { stderr, .. } if !stderr.is_empty() => Some(stderr),
            _ => None,
        }
    }
}

/// Result type for tool invocations.
pub type ToolResult<T> = Result<T, ToolError>;
