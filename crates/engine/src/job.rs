use crate::error::{Error, ErrorKind, Result};
use derive_more::Display;
use exn::{OptionExt, ResultExt};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Movie,
    Series { season: u32, episode: u32 },
}
impl MediaKind {
    /// `SxxEyy` for series, nothing for movies.
    pub fn label(&self) -> Option<String> {
        match self {
            Self::Movie => None,
            Self::Series { season, episode } => Some(format!("S{season:02}E{episode:02}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum JobState {
    Created,
    Prepared,
    Parsed,
    Processing,
    Verifying,
    Succeeded,
    Failed,
}

#[derive(Clone, Debug)]
pub struct DemuxOptions {
    /// Directory containing `BDMV`.
    pub root: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct RemuxOptions {
    /// Combined in this order; `--track-order` refers to positions in this list.
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub title: String,
    pub year: u32,
    /// Release site whose conventions apply; see [`ptmux_policy::Registry::resolve`].
    pub site: Option<String>,
    /// Chapters handed to mkvmerge as-is, such as the playlist a demux run leaves behind.
    pub chapters: Option<PathBuf>,
}

#[derive(Debug)]
enum Workdir {
    Unallocated,
    /// Deleted when dropped.
    Temporary(TempDir),
    /// Left on disk: handed over after success, or it could not be removed.
    Retained(PathBuf),
    Removed(PathBuf),
}
impl Workdir {
    fn path(&self) -> Option<&Path> {
        match self {
            Self::Unallocated => None,
            Self::Temporary(dir) => Some(dir.path()),
            Self::Retained(path) | Self::Removed(path) => Some(path),
        }
    }
}

/// State shared by every engine variant for a single run.
///
/// A job allocates exactly one working directory. Whether it survives is
/// decided solely by the success flag, which can only ever go from `false` to
/// `true`: a job that never succeeds takes its working directory with it,
/// through [`cleanup`](Self::cleanup) or, failing that, when dropped.
#[derive(Debug)]
pub struct Job<O> {
    options: O,
    media: MediaKind,
    state: JobState,
    workdir: Workdir,
    succeeded: bool,
    output: Option<PathBuf>,
}
impl<O> Job<O> {
    pub fn new(options: O, media: MediaKind) -> Self {
        Self {
            options,
            media,
            state: JobState::Created,
            workdir: Workdir::Unallocated,
            succeeded: false,
            output: None,
        }
    }

    pub fn options(&self) -> &O {
        &self.options
    }

    pub fn media(&self) -> MediaKind {
        self.media
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Where the working directory is (or was, once removed).
    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.path()
    }

    pub(crate) fn transition(&mut self, state: JobState) {
        tracing::debug!(from = %self.state, to = %state, "Job state changed");
        self.state = state;
    }

    /// Creates `parent` if needed, then a uniquely-named `<prefix>-XXXXXX`
    /// directory inside it.
    pub(crate) fn allocate(&mut self, parent: &Path, prefix: &str) -> Result<PathBuf> {
        if !matches!(self.workdir, Workdir::Unallocated) {
            exn::bail!(ErrorKind::Workdir(self.workdir().map(Path::to_path_buf).unwrap_or_default()));
        }
        fs::create_dir_all(parent).or_raise(|| ErrorKind::Workdir(parent.to_path_buf()))?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{prefix}-"))
            .tempdir_in(parent)
            .or_raise(|| ErrorKind::Workdir(parent.to_path_buf()))?;
        let path = dir.path().to_path_buf();
        tracing::info!(workdir = %path.display(), "Allocated working directory");
        self.workdir = Workdir::Temporary(dir);
        self.transition(JobState::Prepared);
        Ok(path)
    }

    /// Marks the job as succeeded and releases the working directory to the
    /// caller. Irreversible.
    pub(crate) fn succeed(&mut self, output: PathBuf) -> Result<()> {
        let retained = match std::mem::replace(&mut self.workdir, Workdir::Unallocated) {
            Workdir::Temporary(dir) => dir.keep(),
            Workdir::Retained(path) => path,
            other => {
                self.workdir = other;
                exn::bail!(ErrorKind::Workdir(self.workdir().map(Path::to_path_buf).unwrap_or_default()));
            },
        };
        self.workdir = Workdir::Retained(retained);
        self.succeeded = true;
        tracing::info!(output = %output.display(), "Job succeeded");
        self.output = Some(output);
        self.transition(JobState::Succeeded);
        Ok(())
    }

    pub(crate) fn fail(&mut self) {
        if self.succeeded {
            tracing::warn!("Ignoring failure of a job that already succeeded");
            return;
        }
        self.transition(JobState::Failed);
    }

    /// Deletes the working directory unless the job succeeded.
    pub fn cleanup(&mut self) -> Result<()> {
        if self.succeeded {
            tracing::debug!("Job succeeded; leaving working directory in place");
            return Ok(());
        }
        self.workdir = match std::mem::replace(&mut self.workdir, Workdir::Unallocated) {
            Workdir::Temporary(dir) => {
                let path = dir.path().to_path_buf();
                tracing::info!(workdir = %path.display(), "Removing working directory of unsuccessful job");
                if let Err(e) = dir.close() {
                    self.workdir = Workdir::Retained(path.clone());
                    return Err(e).or_raise(|| ErrorKind::Workdir(path.clone()));
                }
                Workdir::Removed(path)
            },
            other => other,
        };
        Ok(())
    }

    /// Snapshot of the terminal outcome, without the error.
    pub fn report(&self) -> JobResult {
        JobResult {
            success: self.succeeded,
            output: self.output.clone(),
            workdir: self.workdir().map(Path::to_path_buf),
            error: None,
        }
    }
}

/// Terminal outcome of a job.
#[derive(Debug)]
pub struct JobResult {
    pub success: bool,
    /// The produced directory (demux) or file (remux).
    pub output: Option<PathBuf>,
    pub workdir: Option<PathBuf>,
    pub error: Option<Error>,
}
impl JobResult {
    pub fn into_result(self) -> Result<PathBuf> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.output.ok_or_raise(|| ErrorKind::VerificationFailed(self.workdir.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_label() {
        assert_eq!(MediaKind::Movie.label(), None);
        assert_eq!(MediaKind::Series { season: 1, episode: 3 }.label().as_deref(), Some("S01E03"));
    }

    #[test]
    fn test_allocates_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = Job::new((), MediaKind::Movie);
        let workdir = job.allocate(&dir.path().join("out"), "demux").unwrap();
        assert!(workdir.is_dir());
        assert!(workdir.file_name().unwrap().to_str().unwrap().starts_with("demux-"));
        assert_eq!(job.state(), JobState::Prepared);
        let err = job.allocate(dir.path(), "demux").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Workdir(_)));
    }

    #[test]
    fn test_cleanup_removes_unsuccessful_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = Job::new((), MediaKind::Movie);
        let workdir = job.allocate(dir.path(), "remux").unwrap();
        fs::write(workdir.join("partial.mkv"), b"x").unwrap();
        job.fail();
        job.cleanup().unwrap();
        assert!(!workdir.exists());
        assert_eq!(job.workdir(), Some(workdir.as_path()));
        assert_eq!(job.state(), JobState::Failed);
        // Idempotent.
        job.cleanup().unwrap();
    }

    #[test]
    fn test_failed_removal_keeps_workdir_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = Job::new((), MediaKind::Movie);
        let workdir = job.allocate(dir.path(), "remux").unwrap();
        fs::remove_dir_all(&workdir).unwrap();
        job.fail();
        let err = job.cleanup().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Workdir(path) if *path == workdir));
        assert_eq!(job.workdir(), Some(workdir.as_path()));
        assert_eq!(job.report().workdir, Some(workdir));
        job.cleanup().unwrap();
    }

    #[test]
    fn test_success_is_monotonic_and_retains_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = Job::new((), MediaKind::Movie);
        let workdir = job.allocate(dir.path(), "demux").unwrap();
        job.succeed(workdir.clone()).unwrap();
        job.fail();
        assert!(job.succeeded());
        assert_eq!(job.state(), JobState::Succeeded);
        job.cleanup().unwrap();
        drop(job);
        assert!(workdir.is_dir());
    }

    #[test]
    fn test_drop_removes_unsuccessful_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = Job::new((), MediaKind::Movie);
        let workdir = job.allocate(dir.path(), "demux").unwrap();
        drop(job);
        assert!(!workdir.exists());
    }

    #[test]
    fn test_cannot_succeed_without_workdir() {
        let mut job = Job::new((), MediaKind::Movie);
        assert!(job.succeed(PathBuf::from("/tmp/out")).is_err());
        assert!(!job.succeeded());
    }
}
