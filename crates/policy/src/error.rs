//! Policy Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A policy error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for policy operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A site's name template failed to compile or render.
    #[display("invalid name template for site `{_0}`")]
    Template(#[error(not(source))] String),
    /// Two sites were registered under the same identifier.
    #[display("site `{_0}` is already registered")]
    DuplicateSite(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
