//! Release-site conventions: how tracks are ordered inside a remuxed file and
//! what that file is called.
//!
//! Every site is a [`SitePolicy`]. The built-in sites are variants of [`Site`];
//! anything else (such as the template sites read from configuration) plugs in
//! through [`Site::Custom`]. A [`Registry`] maps identifiers to sites and is
//! frozen once built.

pub mod error;
mod naming;
mod order;
mod registry;
mod template;

pub use crate::naming::{baseline_name, beyondhd_name};
pub use crate::order::{beyondhd_compare, beyondhd_order, identity_order};
pub use crate::registry::{BEYONDHD, Registry, RegistryBuilder};
pub use crate::template::TemplateSite;
use ptmux_disc::Track;
use std::fmt;
use std::sync::Arc;

/// Inputs to output naming. Movies carry zero for both season and episode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameParams {
    pub title: String,
    pub year: u32,
    pub season: u32,
    pub episode: u32,
}
impl NameParams {
    pub fn movie(title: impl Into<String>, year: u32) -> Self {
        Self { title: title.into(), year, season: 0, episode: 0 }
    }

    pub fn episode(title: impl Into<String>, year: u32, season: u32, episode: u32) -> Self {
        Self { title: title.into(), year, season, episode }
    }

    /// Both season and episode are set.
    pub fn is_episode(&self) -> bool {
        self.season > 0 && self.episode > 0
    }
}

/// The conventions of a single release site.
///
/// Both operations must be pure: the same input always produces the same
/// output, and neither may fail.
pub trait SitePolicy: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the tracks in the order they should appear in the output.
    fn order(&self, tracks: &[Track]) -> Vec<Track>;

    /// Returns the output name, without any file extension.
    fn format_name(&self, params: &NameParams) -> String;
}

#[derive(Clone)]
pub enum Site {
    /// Identity order; the name is the title alone.
    Baseline,
    BeyondHd,
    Custom(Arc<dyn SitePolicy>),
}
impl SitePolicy for Site {
    fn name(&self) -> &str {
        match self {
            Self::Baseline => "baseline",
            Self::BeyondHd => BEYONDHD,
            Self::Custom(site) => site.name(),
        }
    }

    fn order(&self, tracks: &[Track]) -> Vec<Track> {
        match self {
            Self::Baseline => identity_order(tracks),
            Self::BeyondHd => beyondhd_order(tracks),
            Self::Custom(site) => site.order(tracks),
        }
    }

    fn format_name(&self, params: &NameParams) -> String {
        match self {
            Self::Baseline => baseline_name(params),
            Self::BeyondHd => beyondhd_name(params),
            Self::Custom(site) => site.format_name(params),
        }
    }
}
impl fmt::Debug for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Baseline => f.write_str("Baseline"),
            Self::BeyondHd => f.write_str("BeyondHd"),
            Self::Custom(site) => f.debug_tuple("Custom").field(&site.name()).finish(),
        }
    }
}
