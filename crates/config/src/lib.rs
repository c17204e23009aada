//! Layered configuration for ptmux.
//!
//! Values are merged, lowest priority first, from:
//!
//! 1. built-in defaults,
//! 2. `config.toml` / `config.yaml` in the user configuration directory,
//! 3. an explicitly requested file (format chosen by extension),
//! 4. `PTMUX_*` environment variables, nested with `__` (for example
//!    `PTMUX_GENERAL__LOG_LEVEL=debug`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::instrument;

const ENV_PREFIX: &str = "PTMUX_";
const APPLICATION: &str = "ptmux";

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub tools: ToolsConfig,
    pub sites: SitesConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct General {
    /// Where job output lands when the command-line doesn't say otherwise.
    pub output_dir: PathBuf,
    /// A `tracing` filter directive, usually just a level.
    pub log_level: String,
}
impl Default for General {
    fn default() -> Self {
        Self { output_dir: PathBuf::from("./output"), log_level: "info".to_string() }
    }
}

/// Explicit locations of the external tools.
///
/// Anything left unset is searched for in the bundled tools directory, and
/// failing that, on `PATH` at the time the tool is executed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: Option<PathBuf>,
    pub mkvmerge: Option<PathBuf>,
    pub eac3to: Option<PathBuf>,
    pub dgdemux: Option<PathBuf>,
    /// Overrides the `tools` directory next to the executable.
    pub bundle_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SitesConfig {
    /// Site used when the requested one isn't registered.
    pub default: Option<String>,
    /// Additional sites defined by name and output templates.
    pub custom: BTreeMap<String, CustomSite>,
}
impl Default for SitesConfig {
    fn default() -> Self {
        Self { default: Some("beyondhd".to_string()), custom: BTreeMap::new() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct CustomSite {
    /// Name template for movies.
    pub movie: String,
    /// Name template for series episodes.
    pub series: String,
    #[serde(default)]
    pub order: TrackOrder,
}

/// Built-in track orderings that a custom site can borrow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackOrder {
    /// Keep tracks in the order they were found.
    #[default]
    Identity,
    BeyondHd,
}

impl Config {
    /// Loads defaults, the user configuration directory, the given file (if
    /// any) and the environment, in that order of precedence.
    #[instrument(skip_all)]
    pub fn load(path: Option<impl AsRef<Path>>) -> Result<Self> {
        let mut figment = Self::defaults();
        if let Some(dir) = Self::user_dir() {
            tracing::trace!(dir = %dir.display(), "Merging user configuration directory");
            figment = figment.merge(Toml::file(dir.join("config.toml"))).merge(Yaml::file(dir.join("config.yaml")));
        }
        if let Some(path) = path {
            figment = Self::merge_file(figment, path.as_ref())?;
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        figment.extract().or_raise(|| ErrorKind::Invalid)
    }

    /// Loads defaults overlaid with a single file, ignoring the user
    /// configuration directory and the environment.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::merge_file(Self::defaults(), path.as_ref())?.extract().or_raise(|| ErrorKind::Invalid)
    }

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        Ok(match extension.as_deref() {
            Some("toml") => figment.merge(Toml::file(path)),
            Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
        })
    }

    fn user_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", APPLICATION).map(|dirs| dirs.config_dir().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.general.output_dir, PathBuf::from("./output"));
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.sites.default.as_deref(), Some("beyondhd"));
        assert!(config.tools.ffmpeg.is_none());
        assert!(config.sites.custom.is_empty());
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
                [general]
                log_level = "debug"

                [tools]
                mkvmerge = "/opt/mkvtoolnix/mkvmerge"

                [sites]
                default = "mysite"

                [sites.custom.mysite]
                movie = "{{ title }} ({{ year }})"
                series = "{{ title }} {{ season }}x{{ episode|pad }}"
                order = "beyondhd"
            "#,
        )
        .unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // Untouched values keep their defaults.
        assert_eq!(config.general.output_dir, PathBuf::from("./output"));
        assert_eq!(config.tools.mkvmerge, Some(PathBuf::from("/opt/mkvtoolnix/mkvmerge")));
        assert_eq!(config.sites.default.as_deref(), Some("mysite"));
        let site = &config.sites.custom["mysite"];
        assert_eq!(site.order, TrackOrder::BeyondHd);
        assert_eq!(site.movie, "{{ title }} ({{ year }})");
    }

    #[test]
    fn test_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "general:\n  output_dir: /srv/remux\nsites:\n  custom:\n    plain:\n      movie: \"{{ title }}\"\n      series: \"{{ title }}\"\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.general.output_dir, PathBuf::from("/srv/remux"));
        assert_eq!(config.sites.custom["plain"].order, TrackOrder::Identity);
    }

    #[test]
    fn test_environment_overrides_file() {
        figment::Jail::expect_with(|jail| {
            let xdg = jail.directory().join("xdg");
            jail.set_env("XDG_CONFIG_HOME", xdg.display());
            jail.create_file("ptmux.toml", "[general]\nlog_level = \"debug\"\noutput_dir = \"/srv/out\"\n")?;
            jail.set_env("PTMUX_GENERAL__LOG_LEVEL", "trace");
            jail.set_env("PTMUX_TOOLS__MKVMERGE", "/opt/mkvmerge");

            let config = Config::load(Some("ptmux.toml")).unwrap();
            assert_eq!(config.general.log_level, "trace");
            assert_eq!(config.general.output_dir, PathBuf::from("/srv/out"));
            assert_eq!(config.tools.mkvmerge, Some(PathBuf::from("/opt/mkvmerge")));
            assert_eq!(config.sites.default.as_deref(), Some("beyondhd"));
            Ok(())
        });
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_file_overrides_user_directory() {
        figment::Jail::expect_with(|jail| {
            let xdg = jail.directory().join("xdg");
            jail.set_env("XDG_CONFIG_HOME", xdg.display());
            fs::create_dir_all(xdg.join("ptmux")).unwrap();
            jail.create_file("xdg/ptmux/config.toml", "[general]\nlog_level = \"warn\"\noutput_dir = \"/home/out\"\n")?;
            jail.create_file("ptmux.yaml", "general:\n  log_level: debug\n")?;

            let config = Config::load(None::<&Path>).unwrap();
            assert_eq!(config.general.log_level, "warn");
            let config = Config::load(Some("ptmux.yaml")).unwrap();
            assert_eq!(config.general.log_level, "debug");
            assert_eq!(config.general.output_dir, PathBuf::from("/home/out"));
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[rstest]
    #[case("config.ini")]
    #[case("config")]
    fn test_unsupported_format(#[case] name: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        fs::write(&path, "").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_invalid_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[sites.custom.broken]\nmovie = \"x\"\nseries = \"y\"\norder = \"alphabetical\"\n").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid));
    }
}
