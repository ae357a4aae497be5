//! Shared types for flow script execution.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Execution parameters for a script run.
#[derive(Debug, Clone)]
pub struct RunInput {
    /// Additional environment variables set for the child process.
    pub env_vars: Vec<(String, String)>,
    /// Working directory for the child process (uses current dir if `None`).
    pub working_directory: Option<String>,
    /// Maximum wall-clock time before the process is killed.
    pub timeout: Duration,
}

/// Captured output from a completed script run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    /// Complete stdout captured from the process.
    pub stdout: String,
    /// Complete stderr captured from the process.
    pub stderr: String,
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl RunOutput {
    /// Whether the process exited cleanly with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Errors that can occur while running a script.
#[derive(Debug)]
pub enum RunError {
    /// The script file was not found at the specified path.
    NotFound(String),
    /// The script exceeded its configured timeout and was killed.
    Timeout {
        /// Elapsed wall-clock time before the process was killed.
        elapsed_ms: u64,
    },
    /// The run was cancelled and the process terminated.
    Cancelled {
        /// Elapsed wall-clock time before termination.
        elapsed_ms: u64,
    },
    /// An I/O error occurred while spawning or communicating with the process.
    Io(std::io::Error),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "Script not found: {path}"),
            Self::Timeout { elapsed_ms } => {
                write!(f, "Script timed out after {elapsed_ms}ms")
            }
            Self::Cancelled { elapsed_ms } => {
                write!(f, "Run cancelled after {elapsed_ms}ms")
            }
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_not_found() {
        let err = RunError::NotFound("/opt/flows/run.py".to_string());
        assert_eq!(err.to_string(), "Script not found: /opt/flows/run.py");
    }

    #[test]
    fn display_timeout() {
        let err = RunError::Timeout { elapsed_ms: 5000 };
        assert_eq!(err.to_string(), "Script timed out after 5000ms");
    }

    #[test]
    fn display_cancelled() {
        let err = RunError::Cancelled { elapsed_ms: 120 };
        assert_eq!(err.to_string(), "Run cancelled after 120ms");
    }

    #[test]
    fn error_source_io() {
        let inner = std::io::Error::other("boom");
        let err = RunError::Io(inner);
        assert!(
            std::error::Error::source(&err).is_some(),
            "Io variant should have a source"
        );
    }

    #[test]
    fn error_source_none_for_non_io() {
        let err = RunError::Cancelled { elapsed_ms: 1 };
        assert!(
            std::error::Error::source(&err).is_none(),
            "Cancelled variant should have no source"
        );
    }

    #[test]
    fn output_success_is_exit_code_zero() {
        let mut output = RunOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
            duration_ms: 1,
        };
        assert!(output.success());
        output.exit_code = 2;
        assert!(!output.success());
    }
}
