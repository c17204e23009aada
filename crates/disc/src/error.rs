//! Disc Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use ptmux_exec::error::{Error as ExecError, ErrorKind as ExecErrorKind};
use std::path::PathBuf;

/// A disc error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for disc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The root does not contain the disc structure directory.
    #[display("disc structure not found under {}", _0.display())]
    StructureMissing(#[error(not(source))] PathBuf),
    /// The disc structure has no playlists to choose from.
    #[display("no playlist found under {}", _0.display())]
    NoPlaylistFound(#[error(not(source))] PathBuf),
    /// Track metadata could not be produced from the given file.
    #[display("failed to parse: {_0}")]
    ParseFailed(#[error(not(source))] String),
    /// An external tool used during parsing failed.
    #[display("external tool error: {_0}")]
    Tool(ExecErrorKind),
    /// A directory inside the disc structure could not be read.
    #[display("could not read {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
}
impl ErrorKind {
    /// Convert an execution error into a disc error, keeping the executor's
    /// `Exn` frame as a child in the error tree.
    #[track_caller]
    pub fn tool(err: ExecError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Tool(inner))
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Tool(inner) => inner.is_retryable(),
            _ => false,
        }
    }
}
