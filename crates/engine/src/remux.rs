//! Combining elementary streams into a single Matroska file.

use crate::context::Context;
use crate::driver::Engine;
use crate::error::{ErrorKind, Result};
use crate::job::{Job, JobResult, JobState, MediaKind, RemuxOptions};
use crate::streams::StreamName;
use crate::verify;
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use ptmux_disc::{Track, UNDETERMINED_LANGUAGE};
use ptmux_exec::{Channel, Tool};
use ptmux_policy::{NameParams, SitePolicy};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

const PREFIX: &str = "remux";
/// Characters that can't appear in a file name on at least one platform.
const RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

pub struct MovieRemuxer<'a> {
    job: &'a mut Job<RemuxOptions>,
    ctx: &'a Context,
}
impl<'a> MovieRemuxer<'a> {
    pub fn new(job: &'a mut Job<RemuxOptions>, ctx: &'a Context) -> Self {
        Self { job, ctx }
    }
}

#[async_trait]
impl Engine for MovieRemuxer<'_> {
    async fn run(&mut self) -> Result<()> {
        let params = NameParams::movie(&self.job.options().title, self.job.options().year);
        let outcome = remux(self.job, self.ctx, params).await;
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

/// Names the output after the season and episode of the job's media kind.
pub struct SeriesRemuxer<'a> {
    job: &'a mut Job<RemuxOptions>,
    ctx: &'a Context,
}
impl<'a> SeriesRemuxer<'a> {
    pub fn new(job: &'a mut Job<RemuxOptions>, ctx: &'a Context) -> Self {
        Self { job, ctx }
    }
}

#[async_trait]
impl Engine for SeriesRemuxer<'_> {
    async fn run(&mut self) -> Result<()> {
        let options = self.job.options();
        let params = match self.job.media() {
            MediaKind::Series { season, episode } => NameParams::episode(&options.title, options.year, season, episode),
            MediaKind::Movie => NameParams::movie(&options.title, options.year),
        };
        let outcome = remux(self.job, self.ctx, params).await;
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

/// Where a renumbered track came from: its input's position and its id
/// within that input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Origin {
    file: usize,
    track: u32,
}

#[instrument(skip_all, fields(title = %params.title, season = params.season, episode = params.episode))]
async fn remux(job: &mut Job<RemuxOptions>, ctx: &Context, params: NameParams) -> Result<()> {
    let options = job.options().clone();
    check_inputs(&options.inputs, options.chapters.as_deref())?;
    let workdir = job.allocate(&options.output_dir, PREFIX)?;

    let (tracks, origins) = identify(ctx, &options.inputs).await?;
    job.transition(JobState::Parsed);

    let site = ctx.sites.resolve(options.site.as_deref());
    let formatted = site.format_name(&params);
    let name = sanitize(&formatted).ok_or_raise(|| ErrorKind::Template(formatted.clone()))?;
    tracing::info!(site = site.name(), %name, "Generated output name");
    let ordered = site.order(&tracks);
    let target = options.output_dir.join(format!("{name}.mkv"));
    if target.exists() {
        exn::bail!(ErrorKind::OutputExists(target));
    }

    let produced = workdir.join(format!("{name}.mkv"));
    let args = Mkvmerge {
        output: &produced,
        title: &name,
        chapters: options.chapters.as_deref(),
        inputs: &options.inputs,
        tracks: &tracks,
        ordered: &ordered,
        origins: &origins,
    }
    .args();
    job.transition(JobState::Processing);
    ctx.executor.stream(Tool::Mkvmerge, &args, log_output).await.map_err(ErrorKind::exec)?;

    job.transition(JobState::Verifying);
    verify(std::slice::from_ref(&produced))?;
    fs::rename(&produced, &target).or_raise(|| ErrorKind::Io(format!("moving {}", produced.display())))?;
    job.succeed(target)
}

fn check_inputs(inputs: &[PathBuf], chapters: Option<&Path>) -> Result<()> {
    if inputs.is_empty() {
        exn::bail!(ErrorKind::InputMissing("no input files given".to_string()));
    }
    if let Some(missing) = inputs.iter().map(PathBuf::as_path).chain(chapters).find(|input| !input.is_file()) {
        exn::bail!(ErrorKind::InputMissing(missing.display().to_string()));
    }
    Ok(())
}

/// Identifies every input, renumbering tracks so ids are unique across all
/// of them.
async fn identify(ctx: &Context, inputs: &[PathBuf]) -> Result<(Vec<Track>, Vec<Origin>)> {
    let mut tracks = Vec::new();
    let mut origins = Vec::new();
    for (file, input) in inputs.iter().enumerate() {
        let info = ctx.parser.parse(input).await.map_err(ErrorKind::disc)?;
        let hint = input.file_name().and_then(|n| n.to_str()).and_then(StreamName::parse);
        for mut track in info.into_tracks() {
            origins.push(Origin { file, track: track.id });
            track.id = u32::try_from(tracks.len()).unwrap_or(u32::MAX);
            if let Some(hint) = hint.as_ref().filter(|h| h.kind == track.kind) {
                apply_hint(&mut track, hint);
            }
            tracks.push(track);
        }
    }
    tracing::debug!(inputs = inputs.len(), tracks = tracks.len(), "Identified inputs");
    Ok((tracks, origins))
}

fn apply_hint(track: &mut Track, hint: &StreamName) {
    if !track.has_language() && hint.language != UNDETERMINED_LANGUAGE {
        track.language = hint.language.clone();
    }
    if hint.forced {
        track.flags.forced = true;
    }
}

/// Reduces a name to a single path component: reserved and control
/// characters are dropped, whitespace is collapsed, and leading or trailing
/// dots are trimmed. `None` if nothing is left.
fn sanitize(name: &str) -> Option<String> {
    let kept: String = name.chars().filter(|c| !c.is_control() && !RESERVED.contains(c)).collect();
    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(|c: char| c == '.' || c.is_whitespace());
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Everything that goes into a single mkvmerge invocation.
struct Mkvmerge<'a> {
    output: &'a Path,
    title: &'a str,
    chapters: Option<&'a Path>,
    inputs: &'a [PathBuf],
    tracks: &'a [Track],
    ordered: &'a [Track],
    origins: &'a [Origin],
}
impl Mkvmerge<'_> {
    fn args(&self) -> Vec<OsString> {
        let flag = |enabled: bool| if enabled { "1" } else { "0" };
        let mut args: Vec<OsString> = vec!["--output".into(), self.output.into(), "--title".into(), self.title.into()];
        if let Some(chapters) = self.chapters {
            args.push("--chapters".into());
            args.push(chapters.into());
        }
        for (file, input) in self.inputs.iter().enumerate() {
            for (track, origin) in self.tracks.iter().zip(self.origins).filter(|(_, o)| o.file == file) {
                let id = origin.track;
                args.push("--language".into());
                args.push(format!("{id}:{}", track.language).into());
                args.push("--default-track-flag".into());
                args.push(format!("{id}:{}", flag(track.flags.default)).into());
                args.push("--forced-display-flag".into());
                args.push(format!("{id}:{}", flag(track.flags.forced)).into());
            }
            args.push(input.into());
        }
        let order: Vec<String> = self
            .ordered
            .iter()
            .filter_map(|track| self.origins.get(track.id as usize))
            .map(|origin| format!("{}:{}", origin.file, origin.track))
            .collect();
        if !order.is_empty() {
            args.push("--track-order".into());
            args.push(order.join(",").into());
        }
        args
    }
}

fn log_output(channel: Channel, chunk: &str) {
    for line in chunk.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match channel {
            Channel::Stdout => tracing::debug!(target: "mkvmerge", "{line}"),
            Channel::Stderr => tracing::warn!(target: "mkvmerge", "{line}"),
        }
    }
}
