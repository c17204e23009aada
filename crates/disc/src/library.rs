//! Blu-ray disc structure scanning.
//!
//! A disc backup is a directory containing `BDMV`, which in turn holds up to
//! three subdirectories of interest:
//!
//! ```text
//! <root>/BDMV/PLAYLIST/*.mpls
//! <root>/BDMV/STREAM/*.m2ts
//! <root>/BDMV/CLIPINF/*.clpi
//! ```

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

pub const BDMV_DIR: &str = "BDMV";
pub const PLAYLIST_DIR: &str = "PLAYLIST";
pub const STREAM_DIR: &str = "STREAM";
pub const CLIPINF_DIR: &str = "CLIPINF";

const PLAYLIST_EXT: &str = "mpls";
const STREAM_EXT: &str = "m2ts";
const CLIPINF_EXT: &str = "clpi";

/// A classified file, with its size captured at scan time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    path: PathBuf,
    size: u64,
}
impl Entry {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    fn file_name(&self) -> &std::ffi::OsStr {
        self.path.file_name().unwrap_or_default()
    }
}

/// Snapshot of a disc structure.
#[derive(Clone, Debug)]
pub struct Library {
    root: PathBuf,
    playlists: Vec<Entry>,
    streams: Vec<Entry>,
    clip_info: Vec<Entry>,
}
impl Library {
    /// Classifies the files of a disc structure rooted at `root`.
    ///
    /// Fails with [`ErrorKind::StructureMissing`] when `root/BDMV` is not a
    /// directory. Missing subdirectories are not an error; they simply
    /// produce empty lists.
    #[instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn scan(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let bdmv = root.join(BDMV_DIR);
        if !bdmv.is_dir() {
            exn::bail!(ErrorKind::StructureMissing(root.to_path_buf()));
        }
        let library = Self {
            root: root.to_path_buf(),
            playlists: classify(&bdmv.join(PLAYLIST_DIR), PLAYLIST_EXT)?,
            streams: classify(&bdmv.join(STREAM_DIR), STREAM_EXT)?,
            clip_info: classify(&bdmv.join(CLIPINF_DIR), CLIPINF_EXT)?,
        };
        tracing::info!(
            playlists = library.playlists.len(),
            streams = library.streams.len(),
            clip_info = library.clip_info.len(),
            "Scanned disc structure"
        );
        Ok(library)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn playlists(&self) -> &[Entry] {
        &self.playlists
    }

    pub fn streams(&self) -> &[Entry] {
        &self.streams
    }

    pub fn clip_info(&self) -> &[Entry] {
        &self.clip_info
    }

    /// The largest playlist, assumed to be the main feature.
    ///
    /// Equal sizes resolve to the lexicographically-first file name.
    pub fn main_playlist(&self) -> Result<&Entry> {
        // Lists are sorted by name, so keeping the first of equal maxima is enough.
        let mut best: Option<&Entry> = None;
        for entry in &self.playlists {
            if best.is_none_or(|b| entry.size > b.size) {
                best = Some(entry);
            }
        }
        let best = best.ok_or_raise(|| ErrorKind::NoPlaylistFound(self.root.clone()))?;
        tracing::debug!(path = %best.path.display(), size = best.size, "Selected main playlist");
        Ok(best)
    }
}

fn classify(dir: &Path, extension: &str) -> Result<Vec<Entry>> {
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "Directory absent; nothing to classify");
        return Ok(Vec::new());
    }
    let mut entries = Vec::new();
    for item in fs::read_dir(dir).or_raise(|| ErrorKind::Io(dir.to_path_buf()))? {
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory entry");
                continue;
            },
        };
        let path = item.path();
        if !has_extension(&path, extension) {
            continue;
        }
        match item.metadata() {
            Ok(metadata) if metadata.is_file() => entries.push(Entry { path, size: metadata.len() }),
            Ok(_) => {},
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping file with unreadable metadata"),
        }
    }
    entries.sort_by(|a, b| a.file_name().cmp(b.file_name()));
    Ok(entries)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case(extension))
}
