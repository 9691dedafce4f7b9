use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DuodokError {
    /// Empty or unknown receptor/antibody selection. Raised before any tool runs.
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Invalid structure identifier {0:?}: {1}")]
    InvalidIdentifier(String, String),

    #[error(transparent)]
    ToolExecution(#[from] ToolExecutionError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Summary export or archive creation failed.
    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DuodokError>;

/// One external tool invocation that did not complete successfully.
#[derive(Debug, Error)]
#[error("{tool} failed: {kind}")]
pub struct ToolExecutionError {
    pub tool: String,
    pub kind: ToolFailure,
}

impl ToolExecutionError {
    pub fn new(tool: impl Into<String>, kind: ToolFailure) -> Self {
        Self { tool: tool.into(), kind }
    }

    /// Captured stderr, when the process got far enough to produce any.
    pub fn stderr(&self) -> Option<&str> {
        match &self.kind {
            ToolFailure::ExitStatus { stderr, .. } => Some(stderr.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolFailure {
    #[error("executable not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("could not start process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("exited with {}: {}", status_label(.code), .stderr.trim())]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("declared artifact {} was not produced", .0.display())]
    MissingArtifact(PathBuf),
}

fn status_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Malformed numeric text on a report line that did match its label.
/// Scoped to that one field; the rest of the report is still usable.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[error("could not parse {field} from {line:?}: {reason}")]
pub struct ParseError {
    pub field: String,
    pub line: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_message_carries_stderr() {
        let err = ToolExecutionError::new(
            "hdock",
            ToolFailure::ExitStatus { code: Some(2), stderr: "bad receptor\n".to_string() },
        );
        assert_eq!(err.to_string(), "hdock failed: exited with status 2: bad receptor");
        assert_eq!(err.stderr(), Some("bad receptor\n"));
    }

    #[test]
    fn test_signal_termination_has_no_code() {
        let err = ToolExecutionError::new(
            "createpl",
            ToolFailure::ExitStatus { code: None, stderr: String::new() },
        );
        assert!(err.to_string().contains("terminated by signal"));
    }

    #[test]
    fn test_tool_error_converts_into_duodok_error() {
        let err: DuodokError = ToolExecutionError::new(
            "plip",
            ToolFailure::TimedOut(Duration::from_secs(5)),
        ).into();
        assert!(matches!(err, DuodokError::ToolExecution(_)));
    }
}
