//! Execution Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::time::Duration;

/// An execution error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for execution operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum ErrorKind {
    /// The tool could not be located, neither at its resolved path nor on `PATH`.
    #[display("external tool not found: {_0}")]
    ToolNotFound(#[error(not(source))] String),
    /// The tool ran but exited unsuccessfully. `code` is `None` when the
    /// process was killed by a signal.
    #[display("{tool} exited with code {}", code.map_or_else(|| "(none)".to_string(), |c| c.to_string()))]
    ToolExecutionFailed { tool: String, code: Option<i32>, stderr: String },
    /// The tool did not finish within the allowed wall-clock time and was killed.
    #[display("{tool} timed out after {}s", timeout.as_secs())]
    Timeout { tool: String, timeout: Duration },
    /// Spawning or talking to the child process failed.
    #[display("I/O error while running {_0}")]
    Io(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // External tools are never retried automatically; the caller decides.
        false
    }
}
