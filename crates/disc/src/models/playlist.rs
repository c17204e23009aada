use crate::error::{ErrorKind, Result};
use crate::models::{Track, TrackKind};
use std::collections::HashSet;
use std::path::PathBuf;

/// Everything known about a playlist: how long it runs, which tracks it
/// carries, and which stream files make it up (in playback order).
#[derive(Clone, Debug, PartialEq)]
pub struct PlaylistInfo {
    duration_ms: u64,
    tracks: Vec<Track>,
    stream_files: Vec<PathBuf>,
}
impl PlaylistInfo {
    /// Fails with [`ErrorKind::ParseFailed`] if two tracks share an id.
    pub fn new(duration_ms: u64, tracks: Vec<Track>, stream_files: Vec<PathBuf>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(tracks.len());
        for track in &tracks {
            if !seen.insert(track.id) {
                exn::bail!(ErrorKind::ParseFailed(format!("duplicate track id {}", track.id)));
            }
        }
        Ok(Self { duration_ms, tracks, stream_files })
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }

    pub fn stream_files(&self) -> &[PathBuf] {
        &self.stream_files
    }

    /// Tracks of one kind, in their original order.
    pub fn tracks_of(&self, kind: TrackKind) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(move |t| t.kind == kind)
    }
}
