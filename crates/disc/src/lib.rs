//! Blu-ray disc structures and the tracks they contain.

pub mod error;
pub mod library;
mod mkvmerge;
pub mod models;
mod parser;

pub use crate::library::{Entry, Library};
pub use crate::mkvmerge::MkvmergeParser;
pub use crate::models::{PlaylistInfo, Resolution, Track, TrackFlags, TrackKind, UNDETERMINED_LANGUAGE};
pub use crate::parser::{ParserHandle, PlaylistParser};
