use crate::error::{Error, ErrorKind};
use derive_more::Display;
use exn::OptionExt;
use std::path::PathBuf;
use std::str::FromStr;

/// Language code used when a track doesn't declare one.
pub const UNDETERMINED_LANGUAGE: &str = "und";

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackKind {
    #[display("video")]
    Video,
    #[display("audio")]
    Audio,
    #[display("subtitle")]
    Subtitle,
}
impl TrackKind {
    /// Extraction order: video, then audio, then subtitles.
    pub const ALL: [TrackKind; 3] = [TrackKind::Video, TrackKind::Audio, TrackKind::Subtitle];
}
impl FromStr for TrackKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "subtitle" | "subtitles" => Ok(Self::Subtitle),
            other => exn::bail!(ErrorKind::ParseFailed(format!("unknown track kind `{other}`"))),
        }
    }
}

/// Frame dimensions of a video track.
///
/// Ordered by height first, so `1920x1080` ranks above `1440x1080` which ranks
/// above `3840x720`.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("{width}x{height}")]
pub struct Resolution {
    pub height: u32,
    pub width: u32,
}
impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { height, width }
    }
}
impl FromStr for Resolution {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ErrorKind::ParseFailed(format!("invalid resolution `{s}`"));
        let (width, height) = s.trim().split_once(['x', 'X']).ok_or_raise(invalid)?;
        let width = width.trim().parse().ok().ok_or_raise(invalid)?;
        let height = height.trim().parse().ok().ok_or_raise(invalid)?;
        Ok(Self::new(width, height))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TrackFlags {
    pub default: bool,
    pub forced: bool,
    /// The track lives in a file of its own rather than the main stream.
    pub external: bool,
}

/// A single elementary stream described by a playlist or container.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    /// Unique within the [`PlaylistInfo`](crate::PlaylistInfo) it came from.
    pub id: u32,
    pub kind: TrackKind,
    /// Normalized short codec name, e.g. `h264`, `dts`, `pgs`.
    pub codec: String,
    /// ISO 639-2 code; [`UNDETERMINED_LANGUAGE`] when unknown.
    pub language: String,
    pub title: Option<String>,
    pub resolution: Option<Resolution>,
    pub frame_rate: Option<f64>,
    pub bit_rate: Option<u64>,
    pub channels: Option<u32>,
    pub sample_rate: Option<u32>,
    pub flags: TrackFlags,
    /// Container-level stream number; the PID for MPEG transport streams.
    pub stream_id: Option<u32>,
    pub source: PathBuf,
}
impl Track {
    pub fn new(id: u32, kind: TrackKind, codec: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            id,
            kind,
            codec: codec.into(),
            language: UNDETERMINED_LANGUAGE.to_string(),
            title: None,
            resolution: None,
            frame_rate: None,
            bit_rate: None,
            channels: None,
            sample_rate: None,
            flags: TrackFlags::default(),
            stream_id: None,
            source: source.into(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }

    pub fn with_channels(mut self, channels: u32) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_flags(mut self, flags: TrackFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_stream_id(mut self, stream_id: u32) -> Self {
        self.stream_id = Some(stream_id);
        self
    }

    pub fn has_language(&self) -> bool {
        !self.language.is_empty() && self.language != UNDETERMINED_LANGUAGE
    }
}
