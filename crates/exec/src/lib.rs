//! External tool discovery and execution.
//!
//! [`Tools`] resolves where each external tool lives once, at startup, and
//! [`Executor`] runs them either fully buffered (with a timeout) or streaming
//! output to a callback as it arrives.

pub mod error;
mod executor;
mod tools;

pub use crate::executor::{Channel, DEFAULT_TIMEOUT, Executor};
pub use crate::tools::{Tool, ToolPath, Tools, bundled_candidates};
