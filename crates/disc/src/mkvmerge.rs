//! Track identification through `mkvmerge -J`.

use crate::error::{ErrorKind, Result};
use crate::models::{PlaylistInfo, Resolution, Track, TrackFlags, TrackKind, UNDETERMINED_LANGUAGE};
use crate::parser::PlaylistParser;
use async_trait::async_trait;
use exn::ResultExt;
use ptmux_exec::{Executor, Tool};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::instrument;

const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// [`PlaylistParser`] backed by mkvmerge's JSON identification report.
///
/// Works for `.mpls` playlists (mkvmerge follows them to their stream files)
/// as well as for any single container or elementary stream mkvmerge can read.
#[derive(Clone, Debug)]
pub struct MkvmergeParser {
    executor: Executor,
}
impl MkvmergeParser {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl PlaylistParser for MkvmergeParser {
    #[instrument(skip_all, fields(path = %path.display()))]
    async fn parse(&self, path: &Path) -> Result<PlaylistInfo> {
        let report = self
            .executor
            .run(Tool::Mkvmerge, [std::ffi::OsStr::new("-J"), path.as_os_str()])
            .await
            .map_err(ErrorKind::tool)?;
        let info = parse_identification(path, &report)?;
        tracing::debug!(
            duration_ms = info.duration_ms(),
            tracks = info.tracks().len(),
            streams = info.stream_files().len(),
            "Identified playlist"
        );
        Ok(info)
    }
}

#[derive(Debug, Deserialize)]
struct Identification {
    container: Container,
    #[serde(default)]
    tracks: Vec<RawTrack>,
}

#[derive(Debug, Deserialize)]
struct Container {
    #[serde(default)]
    recognized: bool,
    #[serde(default)]
    properties: ContainerProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContainerProperties {
    duration: Option<u64>,
    playlist_duration: Option<u64>,
    playlist_file: Option<Vec<PathBuf>>,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
    id: u32,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    codec: String,
    #[serde(default)]
    properties: TrackProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TrackProperties {
    codec_id: Option<String>,
    language: Option<String>,
    track_name: Option<String>,
    pixel_dimensions: Option<String>,
    default_duration: Option<u64>,
    tag_bps: Option<Lenient>,
    audio_channels: Option<u32>,
    audio_sampling_frequency: Option<u32>,
    default_track: bool,
    forced_track: bool,
    number: Option<u32>,
}

/// mkvmerge reports tag values as strings, but older versions used numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Lenient {
    Number(u64),
    Text(String),
}
impl Lenient {
    fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Decodes an identification report produced for `source`.
fn parse_identification(source: &Path, report: &str) -> Result<PlaylistInfo> {
    let identification: Identification = serde_json::from_str(report)
        .or_raise(|| ErrorKind::ParseFailed(format!("unreadable mkvmerge report for {}", source.display())))?;
    if !identification.container.recognized {
        exn::bail!(ErrorKind::ParseFailed(format!("mkvmerge does not recognize {}", source.display())));
    }
    let properties = identification.container.properties;
    let duration_ms = properties.playlist_duration.or(properties.duration).unwrap_or(0) / NANOS_PER_MILLI;
    let stream_files = properties.playlist_file.unwrap_or_else(|| vec![source.to_path_buf()]);
    let tracks = identification.tracks.into_iter().filter_map(|raw| convert(source, raw)).collect();
    PlaylistInfo::new(duration_ms, tracks, stream_files)
}

fn convert(source: &Path, raw: RawTrack) -> Option<Track> {
    let kind: TrackKind = match raw.kind.parse() {
        Ok(kind) => kind,
        Err(_) => {
            tracing::trace!(id = raw.id, kind = %raw.kind, "Skipping unsupported track type");
            return None;
        },
    };
    let p = raw.properties;
    let codec = normalize_codec(p.codec_id.as_deref().unwrap_or_default(), &raw.codec);
    let mut track = Track::new(raw.id, kind, codec, source);
    track.language = p.language.filter(|l| !l.is_empty()).unwrap_or_else(|| UNDETERMINED_LANGUAGE.to_string());
    track.title = p.track_name.filter(|t| !t.is_empty());
    track.resolution = p.pixel_dimensions.and_then(|d| d.parse::<Resolution>().ok());
    track.frame_rate = p.default_duration.filter(|d| *d > 0).map(|d| NANOS_PER_SECOND / d as f64);
    track.bit_rate = p.tag_bps.as_ref().and_then(Lenient::as_u64);
    track.channels = p.audio_channels;
    track.sample_rate = p.audio_sampling_frequency;
    track.flags = TrackFlags { default: p.default_track, forced: p.forced_track, external: false };
    track.stream_id = p.number;
    Some(track)
}

/// Maps mkvmerge's codec id and human-readable codec name to a short key.
///
/// Blu-ray transport streams frequently come without a codec id, so the name
/// is consulted as well. Order matters: `E-AC-3` contains `AC-3`, and
/// `DTS-HD` starts with `DTS`.
pub(crate) fn normalize_codec(codec_id: &str, codec: &str) -> String {
    let id = codec_id.to_ascii_uppercase();
    let name = codec.to_ascii_lowercase();
    let key = if id.contains("AVC") || name.contains("h.264") || name.contains("avc") {
        "h264"
    } else if id.contains("HEVC") || name.contains("h.265") || name.contains("hevc") {
        "h265"
    } else if id.starts_with("V_MPEG1") || id.starts_with("V_MPEG2") || name.contains("mpeg-1/2") {
        "mpeg2"
    } else if id.contains("VC1") || name.contains("vc-1") || name.contains("vc1") {
        "vc1"
    } else if id == "A_EAC3" || name.contains("e-ac-3") {
        "eac3"
    } else if id == "A_TRUEHD" || name.contains("truehd") {
        "truehd"
    } else if id == "A_AC3" || name.contains("ac-3") {
        "ac3"
    } else if name.contains("dts-hd") {
        "dtshd"
    } else if id.starts_with("A_DTS") || name.starts_with("dts") {
        "dts"
    } else if id.starts_with("A_PCM") || name.contains("pcm") {
        "lpcm"
    } else if id.starts_with("A_AAC") || name == "aac" {
        "aac"
    } else if id == "A_FLAC" || name == "flac" {
        "flac"
    } else if id == "S_HDMV/PGS" || name.contains("pgs") {
        "pgs"
    } else if id == "S_TEXT/UTF8" || name.contains("subrip") || name == "srt" {
        "srt"
    } else if id == "S_TEXT/ASS" || id == "S_TEXT/SSA" || name.contains("substationalpha") {
        "ass"
    } else {
        return name;
    };
    key.to_string()
}
