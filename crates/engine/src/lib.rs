//! Job orchestration.
//!
//! A [`Job`] owns the options for one run, its state and its working
//! directory. An [`Engine`] borrows the job and drives it to a terminal state:
//!
//! - [`MovieDemuxer`] and [`SeriesDemuxer`] split the main playlist of a disc
//!   structure into one elementary stream per track.
//! - [`MovieRemuxer`] and [`SeriesRemuxer`] combine streams into a single
//!   Matroska file, named and ordered according to a release site.
//!
//! Use [`drive`] rather than calling [`Engine::run`] directly: it also removes
//! the working directory of a job that didn't succeed.

mod codec;
mod context;
mod demux;
mod driver;
pub mod error;
mod job;
mod remux;
mod streams;
#[cfg(all(test, unix))]
mod testing;

pub use crate::context::Context;
pub use crate::demux::{CHAPTERS_FILE, MovieDemuxer, SeriesDemuxer};
pub use crate::driver::{Engine, drive};
pub use crate::job::{DemuxOptions, Job, JobResult, JobState, MediaKind, RemuxOptions};
pub use crate::remux::{MovieRemuxer, SeriesRemuxer};
pub use crate::streams::StreamName;

use crate::error::{ErrorKind, Result};
use std::path::Path;

/// Picks the demux engine matching the job's media kind.
pub fn demuxer<'a>(job: &'a mut Job<DemuxOptions>, ctx: &'a Context) -> Box<dyn Engine + 'a> {
    match job.media() {
        MediaKind::Movie => Box::new(MovieDemuxer::new(job, ctx)),
        MediaKind::Series { .. } => Box::new(SeriesDemuxer::new(job, ctx)),
    }
}

/// Picks the remux engine matching the job's media kind.
pub fn remuxer<'a>(job: &'a mut Job<RemuxOptions>, ctx: &'a Context) -> Box<dyn Engine + 'a> {
    match job.media() {
        MediaKind::Movie => Box::new(MovieRemuxer::new(job, ctx)),
        MediaKind::Series { .. } => Box::new(SeriesRemuxer::new(job, ctx)),
    }
}

/// Every path must name an existing, non-empty file.
pub(crate) fn verify<P: AsRef<Path>>(paths: &[P]) -> Result<()> {
    for path in paths {
        let path: &Path = path.as_ref();
        match path.metadata() {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {},
            _ => {
                tracing::error!(path = %path.display(), "Produced file is missing or empty");
                exn::bail!(ErrorKind::VerificationFailed(path.to_path_buf()));
            },
        }
    }
    tracing::debug!(count = paths.len(), "Verified produced files");
    Ok(())
}
