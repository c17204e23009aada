//! Engine Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Errors from the lower crates are
//! re-raised as the matching [`ErrorKind`], keeping the original as a child.

use derive_more::{Display, Error};
use ptmux_disc::error::{Error as DiscError, ErrorKind as DiscErrorKind};
use ptmux_exec::error::{Error as ExecError, ErrorKind as ExecErrorKind};
use ptmux_policy::error::{Error as PolicyError, ErrorKind as PolicyErrorKind};
use std::path::PathBuf;
use std::time::Duration;

/// An engine error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("disc structure not found under {}", _0.display())]
    StructureMissing(#[error(not(source))] PathBuf),
    #[display("no playlist found under {}", _0.display())]
    NoPlaylistFound(#[error(not(source))] PathBuf),
    #[display("external tool not found: {_0}")]
    ToolNotFound(#[error(not(source))] String),
    #[display("{tool} exited with code {}", code.map_or_else(|| "(none)".to_string(), |c| c.to_string()))]
    ToolExecutionFailed { tool: String, code: Option<i32>, stderr: String },
    #[display("{tool} timed out after {}s", timeout.as_secs())]
    Timeout { tool: String, timeout: Duration },
    /// A produced file is missing or empty.
    #[display("output failed verification: {}", _0.display())]
    VerificationFailed(#[error(not(source))] PathBuf),
    #[display("failed to parse: {_0}")]
    ParseFailed(#[error(not(source))] String),
    /// An input file does not exist, or no inputs were given at all.
    #[display("missing input: {_0}")]
    InputMissing(#[error(not(source))] String),
    /// The output name could not be produced.
    #[display("unusable output name: {_0}")]
    Template(#[error(not(source))] String),
    /// The temporary working directory could not be created, removed or
    /// allocated (it is allocated exactly once per job).
    #[display("working directory error: {}", _0.display())]
    Workdir(#[error(not(source))] PathBuf),
    /// The output file is already there; it is never overwritten.
    #[display("output already exists: {}", _0.display())]
    OutputExists(#[error(not(source))] PathBuf),
    #[display("I/O error: {_0}")]
    Io(#[error(not(source))] String),
}
impl ErrorKind {
    #[track_caller]
    pub fn exec(err: ExecError) -> Error {
        let kind = Self::from_exec_kind(&err);
        err.raise(kind)
    }

    #[track_caller]
    pub fn disc(err: DiscError) -> Error {
        let kind = match &*err {
            DiscErrorKind::StructureMissing(path) => Self::StructureMissing(path.clone()),
            DiscErrorKind::NoPlaylistFound(path) => Self::NoPlaylistFound(path.clone()),
            DiscErrorKind::ParseFailed(message) => Self::ParseFailed(message.clone()),
            DiscErrorKind::Tool(inner) => Self::from_exec_kind(inner),
            DiscErrorKind::Io(path) => Self::Io(path.display().to_string()),
        };
        err.raise(kind)
    }

    #[track_caller]
    pub fn policy(err: PolicyError) -> Error {
        let kind = match &*err {
            PolicyErrorKind::Template(site) | PolicyErrorKind::DuplicateSite(site) => Self::Template(site.clone()),
        };
        err.raise(kind)
    }

    fn from_exec_kind(kind: &ExecErrorKind) -> Self {
        match kind {
            ExecErrorKind::ToolNotFound(tool) => Self::ToolNotFound(tool.clone()),
            ExecErrorKind::ToolExecutionFailed { tool, code, stderr } => {
                Self::ToolExecutionFailed { tool: tool.clone(), code: *code, stderr: stderr.clone() }
            },
            ExecErrorKind::Timeout { tool, timeout } => Self::Timeout { tool: tool.clone(), timeout: *timeout },
            ExecErrorKind::Io(tool) => Self::Io(format!("while running {tool}")),
        }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
