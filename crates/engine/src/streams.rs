//! File naming for demuxed elementary streams.
//!
//! ```text
//! 01.video.und.h264
//! 02.audio.eng.dts
//! 05.subtitle.jpn.forced.sup
//! ```
//!
//! Remuxing reads the same names back to recover what the container can't
//! carry: the language of raw streams, and the forced flag.

use ptmux_disc::{Track, TrackKind, UNDETERMINED_LANGUAGE};
use std::fmt;

const FORCED: &str = "forced";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamName {
    pub id: u32,
    pub kind: TrackKind,
    pub language: String,
    pub forced: bool,
    pub extension: String,
}
impl StreamName {
    pub fn for_track(track: &Track, extension: impl Into<String>) -> Self {
        let language = if is_language(&track.language) { track.language.clone() } else { UNDETERMINED_LANGUAGE.into() };
        Self { id: track.id, kind: track.kind, language, forced: track.flags.forced, extension: extension.into() }
    }

    /// Recognizes a file name written by [`Display`](fmt::Display); anything
    /// else yields `None`.
    pub fn parse(file_name: &str) -> Option<Self> {
        let parts: Vec<&str> = file_name.split('.').collect();
        let (id, kind, language, rest) = match parts.as_slice() {
            [id, kind, language, rest @ ..] if !rest.is_empty() => (id, kind, language, rest),
            _ => return None,
        };
        let forced = match rest {
            [_] => false,
            [flag, _] if *flag == FORCED => true,
            _ => return None,
        };
        let extension = rest.last()?;
        if extension.is_empty() || !is_language(language) || !id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            id: id.parse().ok()?,
            kind: kind.parse().ok()?,
            language: language.to_string(),
            forced,
            extension: extension.to_string(),
        })
    }
}
impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{}.{}", self.id, self.kind, self.language)?;
        if self.forced {
            write!(f, ".{FORCED}")?;
        }
        write!(f, ".{}", self.extension)
    }
}

fn is_language(code: &str) -> bool {
    matches!(code.len(), 2 | 3) && code.bytes().all(|b| b.is_ascii_lowercase())
}
