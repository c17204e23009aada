use crate::error::{ErrorKind, Result};
use derive_more::Display;
use ptmux_config::ToolsConfig;
use std::path::{Path, PathBuf};

/// The external tools ptmux knows how to drive.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Tool {
    #[display("ffmpeg")]
    Ffmpeg,
    #[display("mkvmerge")]
    Mkvmerge,
    #[display("eac3to")]
    Eac3to,
    #[display("dgdemux")]
    Dgdemux,
}
impl Tool {
    pub const ALL: [Tool; 4] = [Tool::Ffmpeg, Tool::Mkvmerge, Tool::Eac3to, Tool::Dgdemux];

    /// Executable name without any platform suffix.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ffmpeg => "ffmpeg",
            Self::Mkvmerge => "mkvmerge",
            Self::Eac3to => "eac3to",
            Self::Dgdemux => "dgdemux",
        }
    }

    fn configured(self, config: &ToolsConfig) -> Option<&Path> {
        match self {
            Self::Ffmpeg => config.ffmpeg.as_deref(),
            Self::Mkvmerge => config.mkvmerge.as_deref(),
            Self::Eac3to => config.eac3to.as_deref(),
            Self::Dgdemux => config.dgdemux.as_deref(),
        }
    }
}

/// Where a tool's executable was found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolPath {
    /// Explicitly configured; used as-is even if it didn't exist at startup.
    Configured(PathBuf),
    /// Found inside the bundled tools directory.
    Bundled(PathBuf),
    /// Not found anywhere yet; looked up on `PATH` when executed.
    Bare(&'static str),
}
impl ToolPath {
    /// Produces the program to hand to the OS.
    ///
    /// Bare names are resolved against `PATH` now, so a missing tool surfaces
    /// as [`ErrorKind::ToolNotFound`] rather than an opaque spawn failure.
    pub fn program(&self) -> Result<PathBuf> {
        match self {
            Self::Configured(path) | Self::Bundled(path) => Ok(path.clone()),
            Self::Bare(name) => match which::which(name) {
                Ok(path) => Ok(path),
                Err(_) => exn::bail!(ErrorKind::ToolNotFound(name.to_string())),
            },
        }
    }
}

/// Immutable table of resolved tool locations.
///
/// Built once at startup and handed to whatever needs to run tools; there is
/// no process-wide lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tools {
    ffmpeg: ToolPath,
    mkvmerge: ToolPath,
    eac3to: ToolPath,
    dgdemux: ToolPath,
}
impl Default for Tools {
    /// Every tool looked up on `PATH`.
    fn default() -> Self {
        Self {
            ffmpeg: ToolPath::Bare(Tool::Ffmpeg.name()),
            mkvmerge: ToolPath::Bare(Tool::Mkvmerge.name()),
            eac3to: ToolPath::Bare(Tool::Eac3to.name()),
            dgdemux: ToolPath::Bare(Tool::Dgdemux.name()),
        }
    }
}
impl Tools {
    /// Resolves every tool, in order of preference, from:
    ///
    /// 1. its explicitly configured path (a warning is logged if missing),
    /// 2. the bundled tools directory (see [`bundled_candidates`]),
    /// 3. its bare name, deferred to `PATH` lookup at execution time.
    pub fn resolve(config: &ToolsConfig) -> Self {
        let bundle = config.bundle_dir.clone().or_else(default_bundle_dir);
        let mut tools = Self::default();
        for tool in Tool::ALL {
            let path = resolve_one(tool, config, bundle.as_deref());
            tools = tools.with(tool, path);
        }
        tools
    }

    /// Replaces the location of a single tool.
    pub fn with(mut self, tool: Tool, path: ToolPath) -> Self {
        *self.slot(tool) = path;
        self
    }

    pub fn get(&self, tool: Tool) -> &ToolPath {
        match tool {
            Tool::Ffmpeg => &self.ffmpeg,
            Tool::Mkvmerge => &self.mkvmerge,
            Tool::Eac3to => &self.eac3to,
            Tool::Dgdemux => &self.dgdemux,
        }
    }

    fn slot(&mut self, tool: Tool) -> &mut ToolPath {
        match tool {
            Tool::Ffmpeg => &mut self.ffmpeg,
            Tool::Mkvmerge => &mut self.mkvmerge,
            Tool::Eac3to => &mut self.eac3to,
            Tool::Dgdemux => &mut self.dgdemux,
        }
    }
}

fn resolve_one(tool: Tool, config: &ToolsConfig, bundle: Option<&Path>) -> ToolPath {
    if let Some(path) = tool.configured(config) {
        if !path.exists() {
            tracing::warn!(%tool, path = %path.display(), "Configured tool path does not exist");
        }
        return ToolPath::Configured(path.to_path_buf());
    }
    if let Some(bundle) = bundle
        && let Some(found) = bundled_candidates(bundle, tool).into_iter().find(|p| p.is_file())
    {
        tracing::info!(%tool, path = %found.display(), "Found bundled tool");
        return ToolPath::Bundled(found);
    }
    tracing::debug!(%tool, "Tool not configured or bundled; deferring to PATH");
    ToolPath::Bare(tool.name())
}

/// Candidate locations for a tool inside the bundle directory, best first.
///
/// ```text
/// <bundle>/<tool>/<Platform>/<tool>
/// <bundle>/<tool>/<tool>
/// <bundle>/<tool>/<Platform>/<tool>.exe   (Windows only)
/// <bundle>/<tool>/<tool>.exe              (Windows only)
/// ```
pub fn bundled_candidates(bundle: &Path, tool: Tool) -> Vec<PathBuf> {
    let name = tool.name();
    let dir = bundle.join(name);
    let mut candidates = vec![dir.join(PLATFORM).join(name), dir.join(name)];
    if cfg!(windows) {
        let exe = format!("{name}.exe");
        candidates.push(dir.join(PLATFORM).join(&exe));
        candidates.push(dir.join(exe));
    }
    candidates
}

#[cfg(windows)]
const PLATFORM: &str = "Windows";
#[cfg(target_os = "macos")]
const PLATFORM: &str = "macOS";
#[cfg(not(any(windows, target_os = "macos")))]
const PLATFORM: &str = "Linux";

fn default_bundle_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join("tools"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_configured_wins_even_when_missing() {
        let bundle = tempfile::tempdir().unwrap();
        touch(&bundle.path().join("ffmpeg").join("ffmpeg"));
        let config = ToolsConfig {
            ffmpeg: Some(PathBuf::from("/does/not/exist/ffmpeg")),
            bundle_dir: Some(bundle.path().to_path_buf()),
            ..Default::default()
        };
        let tools = Tools::resolve(&config);
        assert_eq!(tools.get(Tool::Ffmpeg), &ToolPath::Configured(PathBuf::from("/does/not/exist/ffmpeg")));
    }

    #[test]
    fn test_platform_directory_preferred() {
        let bundle = tempfile::tempdir().unwrap();
        let platform = bundle.path().join("mkvmerge").join(PLATFORM).join("mkvmerge");
        touch(&platform);
        touch(&bundle.path().join("mkvmerge").join("mkvmerge"));
        let config = ToolsConfig { bundle_dir: Some(bundle.path().to_path_buf()), ..Default::default() };
        let tools = Tools::resolve(&config);
        assert_eq!(tools.get(Tool::Mkvmerge), &ToolPath::Bundled(platform));
    }

    #[test]
    fn test_bare_name_directory() {
        let bundle = tempfile::tempdir().unwrap();
        let bare = bundle.path().join("eac3to").join("eac3to");
        touch(&bare);
        let config = ToolsConfig { bundle_dir: Some(bundle.path().to_path_buf()), ..Default::default() };
        let tools = Tools::resolve(&config);
        assert_eq!(tools.get(Tool::Eac3to), &ToolPath::Bundled(bare));
    }

    #[test]
    fn test_falls_back_to_bare_name() {
        let bundle = tempfile::tempdir().unwrap();
        let config = ToolsConfig { bundle_dir: Some(bundle.path().to_path_buf()), ..Default::default() };
        let tools = Tools::resolve(&config);
        for tool in Tool::ALL {
            assert_eq!(tools.get(tool), &ToolPath::Bare(tool.name()));
        }
    }

    #[test]
    fn test_directories_are_not_tools() {
        let bundle = tempfile::tempdir().unwrap();
        fs::create_dir_all(bundle.path().join("dgdemux").join("dgdemux")).unwrap();
        let config = ToolsConfig { bundle_dir: Some(bundle.path().to_path_buf()), ..Default::default() };
        assert_eq!(Tools::resolve(&config).get(Tool::Dgdemux), &ToolPath::Bare("dgdemux"));
    }

    #[test]
    fn test_bare_program_not_on_path() {
        let err = ToolPath::Bare("ptmux-definitely-not-a-real-tool").program().unwrap_err();
        assert!(matches!(&*err, ErrorKind::ToolNotFound(name) if name == "ptmux-definitely-not-a-real-tool"));
    }

    #[test]
    fn test_candidate_order() {
        let candidates = bundled_candidates(Path::new("/b"), Tool::Ffmpeg);
        assert_eq!(candidates[0], Path::new("/b/ffmpeg").join(PLATFORM).join("ffmpeg"));
        assert_eq!(candidates[1], Path::new("/b/ffmpeg/ffmpeg"));
        assert_eq!(candidates.len(), if cfg!(windows) { 4 } else { 2 });
    }
}
