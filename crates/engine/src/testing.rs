//! Doubles for the external collaborators of an engine.

use crate::context::Context;
use async_trait::async_trait;
use exn::OptionExt;
use ptmux_disc::error::{ErrorKind as DiscErrorKind, Result as DiscResult};
use ptmux_disc::{PlaylistInfo, PlaylistParser};
use ptmux_exec::{Executor, Tool, ToolPath, Tools};
use ptmux_policy::Registry;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Answer = dyn Fn(&Path) -> Option<PlaylistInfo> + Send + Sync;

/// Answers with canned playlist info and records how it was called.
pub(crate) struct FakeParser {
    answer: Box<Answer>,
    pub calls: AtomicUsize,
    last: Mutex<Option<PathBuf>>,
}
impl FakeParser {
    pub fn fixed(info: PlaylistInfo) -> Arc<Self> {
        Self::with(move |_| Some(info.clone()))
    }

    /// `None` from `answer` is reported as a parse failure.
    pub fn with(answer: impl Fn(&Path) -> Option<PlaylistInfo> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self { answer: Box::new(answer), calls: AtomicUsize::new(0), last: Mutex::new(None) })
    }

    pub fn last_path(&self) -> Option<PathBuf> {
        self.last.lock().unwrap().clone()
    }

    pub fn context(self: &Arc<Self>, tools: Tools) -> Context {
        self.context_with(tools, Registry::default())
    }

    pub fn context_with(self: &Arc<Self>, tools: Tools, sites: Registry) -> Context {
        Context::new(Executor::new(tools), self.clone(), sites)
    }
}

#[async_trait]
impl PlaylistParser for FakeParser {
    async fn parse(&self, path: &Path) -> DiscResult<PlaylistInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(path.to_path_buf());
        (self.answer)(path).ok_or_raise(|| DiscErrorKind::ParseFailed(path.display().to_string()))
    }
}

/// Every tool pointed somewhere that doesn't exist, so a test can never
/// reach a real binary by accident.
pub(crate) fn tools() -> Tools {
    Tool::ALL.into_iter().fold(Tools::default(), |tools, tool| {
        tools.with(tool, ToolPath::Configured(PathBuf::from("/nonexistent/ptmux").join(tool.name())))
    })
}

/// Writes an executable `/bin/sh` script standing in for a tool.
pub(crate) fn script(dir: &Path, name: &str, body: &str) -> ToolPath {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    ToolPath::Configured(path)
}
