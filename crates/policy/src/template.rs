//! Sites defined entirely in configuration.
//!
//! Names are produced by [upon] templates, one for movies and one for series
//! episodes. The following variables are available:
//!
//! | Variable  | Type     | Description                        |
//! |-----------|----------|------------------------------------|
//! | `title`   | `String` | Title as given on the command line |
//! | `year`    | `u64`    | Release year, `0` when unknown     |
//! | `season`  | `u64`    | Season number, `0` for movies      |
//! | `episode` | `u64`    | Episode number, `0` for movies     |
//!
//! The `pad` formatter zero-pads numbers to two digits:
//!
//! ```
//! use ptmux_config::{CustomSite, TrackOrder};
//! use ptmux_policy::{NameParams, SitePolicy, TemplateSite};
//!
//! let config = CustomSite {
//!     movie: "{{ title }}.{{ year }}".into(),
//!     series: "{{ title }} - {{ season }}x{{ episode|pad }}".into(),
//!     order: TrackOrder::Identity,
//! };
//! let site = TemplateSite::new("mysite", &config).unwrap();
//! assert_eq!(site.format_name(&NameParams::episode("Show", 2020, 1, 3)), "Show - 1x03");
//! ```

use crate::error::{ErrorKind, Result};
use crate::order::{beyondhd_order, identity_order};
use crate::{NameParams, SitePolicy};
use exn::ResultExt;
use ptmux_config::{CustomSite, TrackOrder};
use ptmux_disc::Track;
use tracing::instrument;
use upon::{Engine, Template};

pub struct TemplateSite {
    name: String,
    engine: Engine<'static>,
    movie: Template<'static>,
    series: Template<'static>,
    order: TrackOrder,
}
impl TemplateSite {
    /// Compiles both templates and renders each once against sample values,
    /// so that a broken template fails here rather than halfway through a job.
    #[instrument(skip(config))]
    pub fn new(name: &str, config: &CustomSite) -> Result<Self> {
        let mut engine = Engine::new();
        addons::configure(&mut engine);
        let movie = engine.compile(config.movie.clone()).or_raise(|| ErrorKind::Template(name.to_string()))?;
        let series = engine.compile(config.series.clone()).or_raise(|| ErrorKind::Template(name.to_string()))?;
        let site = Self { name: name.to_string(), engine, movie, series, order: config.order };
        site.render(&NameParams::movie("Sample", 2000))?;
        site.render(&NameParams::episode("Sample", 2000, 1, 1))?;
        Ok(site)
    }

    fn render(&self, params: &NameParams) -> Result<String> {
        let template = if params.is_episode() { &self.series } else { &self.movie };
        let rendered = template
            .render(&self.engine, Self::parameters(params))
            .to_string()
            .or_raise(|| ErrorKind::Template(self.name.clone()))?;
        Ok(rendered.trim().to_string())
    }

    fn parameters(params: &NameParams) -> upon::Value {
        upon::value! {
            title: params.title.as_str(),
            year: u64::from(params.year),
            season: u64::from(params.season),
            episode: u64::from(params.episode),
        }
    }
}
impl SitePolicy for TemplateSite {
    fn name(&self) -> &str {
        &self.name
    }

    fn order(&self, tracks: &[Track]) -> Vec<Track> {
        match self.order {
            TrackOrder::Identity => identity_order(tracks),
            TrackOrder::BeyondHd => beyondhd_order(tracks),
        }
    }

    fn format_name(&self, params: &NameParams) -> String {
        match self.render(params) {
            Ok(name) => name,
            Err(err) => {
                // Templates were test-rendered at construction; only odd values land here.
                tracing::warn!(site = %self.name, error = ?err, "Falling back to the bare title");
                params.title.clone()
            },
        }
    }
}

/// Custom [`upon`] extensions for release names.
mod addons {
    use std::fmt::Write;
    use upon::{Engine, Value, fmt as upon_fmt};

    /// Zero-pads integers (and integer-looking strings) to two digits.
    fn pad_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::Integer(n) => write!(f, "{n:02}")?,
            Value::String(s) => match s.trim().parse::<i64>() {
                Ok(n) => write!(f, "{n:02}")?,
                Err(_) => write!(f, "{s}")?,
            },
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    pub(crate) fn configure(engine: &mut Engine<'_>) {
        engine.add_formatter("pad", pad_formatter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptmux_disc::TrackKind;
    use rstest::rstest;

    fn site(movie: &str, series: &str, order: TrackOrder) -> Result<TemplateSite> {
        TemplateSite::new("mysite", &CustomSite { movie: movie.to_string(), series: series.to_string(), order })
    }

    #[rstest]
    #[case(NameParams::movie("Heat", 1995), "Heat (1995)")]
    #[case(NameParams::episode("Show", 2020, 2, 7), "Show S02E07")]
    #[case(NameParams::episode("Show", 2020, 10, 123), "Show S10E123")]
    fn test_renders_templates(#[case] params: NameParams, #[case] expected: &str) {
        let site = site("{{ title }} ({{ year }})", "{{ title }} S{{ season|pad }}E{{ episode|pad }}", TrackOrder::Identity)
            .unwrap();
        assert_eq!(site.format_name(&params), expected);
    }

    #[test]
    fn test_trims_whitespace() {
        let site = site("  {{ title }}  ", "{{ title }}", TrackOrder::Identity).unwrap();
        assert_eq!(site.format_name(&NameParams::movie("Heat", 1995)), "Heat");
    }

    #[rstest]
    #[case("{{ title ", "{{ title }}")]
    #[case("{{ title }}", "{{ title|nope }}")]
    #[case("{{ director }}", "{{ title }}")]
    fn test_broken_templates(#[case] movie: &str, #[case] series: &str) {
        let err = site(movie, series, TrackOrder::Identity).err().unwrap();
        assert!(matches!(&*err, ErrorKind::Template(name) if name == "mysite"));
    }

    #[test]
    fn test_borrows_builtin_order() {
        let tracks = vec![
            Track::new(0, TrackKind::Subtitle, "pgs", "in.m2ts"),
            Track::new(1, TrackKind::Video, "h264", "in.m2ts"),
        ];
        let identity = site("{{ title }}", "{{ title }}", TrackOrder::Identity).unwrap();
        let beyondhd = site("{{ title }}", "{{ title }}", TrackOrder::BeyondHd).unwrap();
        assert_eq!(identity.order(&tracks)[0].id, 0);
        assert_eq!(beyondhd.order(&tracks)[0].id, 1);
    }
}
