//! Splitting a disc structure into elementary streams.

use crate::codec::{self, Extraction};
use crate::context::Context;
use crate::driver::Engine;
use crate::error::{ErrorKind, Result};
use crate::job::{DemuxOptions, Job, JobResult, JobState};
use crate::streams::StreamName;
use crate::verify;
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use ptmux_disc::{Library, Track, TrackKind};
use ptmux_exec::Tool;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

const PREFIX: &str = "demux";
/// Copy of the main playlist left next to the streams; mkvmerge reads its
/// chapters directly.
pub const CHAPTERS_FILE: &str = "chapters.mpls";

pub struct MovieDemuxer<'a> {
    job: &'a mut Job<DemuxOptions>,
    ctx: &'a Context,
}
impl<'a> MovieDemuxer<'a> {
    pub fn new(job: &'a mut Job<DemuxOptions>, ctx: &'a Context) -> Self {
        Self { job, ctx }
    }
}

#[async_trait]
impl Engine for MovieDemuxer<'_> {
    async fn run(&mut self) -> Result<()> {
        let outcome = demux(self.job, self.ctx, PREFIX).await;
        if outcome.is_err() {
            self.job.fail();
        }
        outcome
    }

    fn cleanup(&mut self) -> Result<()> {
        self.job.cleanup()
    }

    fn report(&self) -> JobResult {
        self.job.report()
    }
}

/// Extracts exactly like [`MovieDemuxer`]; the working directory carries the
/// episode label of the job's media kind.
pub struct SeriesDemuxer<'a> {
    job: &'a mut Job<DemuxOptions>,
    ctx: &'a Context,
}
impl<'a> SeriesDemuxer<'a> {
    pub fn new(job: &'a mut Job<DemuxOptions>, ctx: &'a Context) -> Self {
        Self { job, ctx }
    }
}

#[async_trait]
impl Engine for SeriesDemuxer<'_> {
    async fn run(&mut self) -> Result<()> {
        let prefix = match self.job.media().label() {
            Some(label) => format!("{PREFIX}-{label}"),
            None => PREFIX.to_string(),
        };
        let outcome = demux(self.job, self.ctx, &prefix).await;
        if outcome.is_err() {
            self.job.fail();
        }
        outcome
    }

    fn cleanup(&mut self) -> Result<()> {
        self.job.cleanup()
    }

    fn report(&self) -> JobResult {
        self.job.report()
    }
}

#[instrument(skip_all, fields(root = %job.options().root.display()))]
async fn demux(job: &mut Job<DemuxOptions>, ctx: &Context, prefix: &str) -> Result<()> {
    let options = job.options().clone();
    let workdir = job.allocate(&options.output_dir, prefix)?;

    let library = Library::scan(&options.root).map_err(ErrorKind::disc)?;
    let playlist = library.main_playlist().map_err(ErrorKind::disc)?;
    let info = ctx.parser.parse(playlist.path()).await.map_err(ErrorKind::disc)?;
    job.transition(JobState::Parsed);
    if info.tracks().is_empty() {
        exn::bail!(ErrorKind::ParseFailed(format!("{} has no tracks", playlist.path().display())));
    }
    let input = ffmpeg_input(info.stream_files())
        .ok_or_raise(|| ErrorKind::ParseFailed(format!("{} references no stream files", playlist.path().display())))?;

    job.transition(JobState::Processing);
    let mut produced = Vec::with_capacity(info.tracks().len());
    // Video first, then audio, then subtitles; later tools depend on this order.
    for kind in TrackKind::ALL {
        let tracks: Vec<&Track> = info.tracks_of(kind).collect();
        tracing::info!(%kind, count = tracks.len(), "Extracting tracks");
        for (index, track) in tracks.into_iter().enumerate() {
            produced.push(extract(ctx, &input, &workdir, index, track).await?);
        }
    }

    let chapters = workdir.join(CHAPTERS_FILE);
    fs::copy(playlist.path(), &chapters).or_raise(|| ErrorKind::Io(format!("copying {}", playlist.path().display())))?;

    job.transition(JobState::Verifying);
    verify(&produced)?;
    job.succeed(workdir)
}

/// A single stream file, or ffmpeg's `concat:` protocol over several.
fn ffmpeg_input(streams: &[PathBuf]) -> Option<OsString> {
    match streams {
        [] => None,
        [single] => Some(single.clone().into_os_string()),
        many => {
            let mut input = OsString::from("concat:");
            for (i, stream) in many.iter().enumerate() {
                if i > 0 {
                    input.push("|");
                }
                input.push(stream);
            }
            Some(input)
        },
    }
}

/// Runs ffmpeg once for a single track. Tracks are selected by PID when
/// known, otherwise as the `index`-th of their kind.
#[instrument(skip_all, fields(id = track.id, kind = %track.kind, codec = %track.codec))]
async fn extract(ctx: &Context, input: &OsStr, workdir: &Path, index: usize, track: &Track) -> Result<PathBuf> {
    let Extraction { extension, codec_args } = codec::extraction(track);
    let target = workdir.join(StreamName::for_track(track, extension).to_string());
    let mut args: Vec<OsString> =
        ["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"].into_iter().map(OsString::from).collect();
    args.push(input.to_os_string());
    args.push("-map".into());
    args.push(stream_map(track, index).into());
    args.extend(codec_args.iter().map(OsString::from));
    args.push(target.clone().into_os_string());
    ctx.executor.run(Tool::Ffmpeg, &args).await.map_err(ErrorKind::exec)?;
    Ok(target)
}

fn stream_map(track: &Track, index: usize) -> String {
    match track.stream_id {
        Some(pid) => format!("0:i:{pid}"),
        None => format!("0:{}:{index}", codec::specifier(track.kind)),
    }
}
