use crate::error::{ErrorKind, Result};
use crate::template::TemplateSite;
use crate::{Site, SitePolicy};
use ptmux_config::SitesConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

pub const BEYONDHD: &str = "beyondhd";

static BASELINE: Site = Site::Baseline;

/// Collects sites before freezing them into a [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    sites: HashMap<String, Site>,
    order: Vec<String>,
    default: Option<String>,
}
impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every site that ships with ptmux.
    pub fn with_builtins(self) -> Result<Self> {
        self.register(BEYONDHD, Site::BeyondHd)
    }

    pub fn register(mut self, id: impl Into<String>, site: Site) -> Result<Self> {
        let id = id.into();
        if self.sites.contains_key(&id) {
            exn::bail!(ErrorKind::DuplicateSite(id));
        }
        tracing::trace!(%id, "Registered site");
        self.order.push(id.clone());
        self.sites.insert(id, site);
        Ok(self)
    }

    pub fn default_site(mut self, id: Option<impl Into<String>>) -> Self {
        self.default = id.map(Into::into);
        self
    }

    pub fn build(self) -> Registry {
        if let Some(default) = &self.default
            && !self.sites.contains_key(default)
        {
            tracing::warn!(%default, "Default site is not registered; it will be ignored");
        }
        Registry { sites: self.sites, order: self.order, default: self.default }
    }
}

/// Immutable lookup table from site identifier to [`Site`].
#[derive(Debug)]
pub struct Registry {
    sites: HashMap<String, Site>,
    order: Vec<String>,
    default: Option<String>,
}
impl Default for Registry {
    /// Built-in sites only, with [`BEYONDHD`] as the default.
    fn default() -> Self {
        Self::from_config(&SitesConfig::default()).unwrap_or_else(|_| RegistryBuilder::new().build())
    }
}
impl Registry {
    /// Built-in sites first, then a [`TemplateSite`] for every configured
    /// custom site, in name order.
    #[instrument(skip_all)]
    pub fn from_config(config: &SitesConfig) -> Result<Self> {
        let mut builder = RegistryBuilder::new().with_builtins()?;
        for (name, custom) in &config.custom {
            let site = TemplateSite::new(name, custom)?;
            builder = builder.register(name.as_str(), Site::Custom(Arc::new(site)))?;
        }
        let registry = builder.default_site(config.default.as_deref()).build();
        tracing::debug!(sites = ?registry.order, default = ?registry.default, "Built site registry");
        Ok(registry)
    }

    /// Identifiers in registration order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn get(&self, id: &str) -> Option<&Site> {
        self.sites.get(id)
    }

    /// Resolves a site, falling back in turn to the configured default, the
    /// first registered site and finally [`Site::Baseline`].
    pub fn resolve(&self, id: Option<&str>) -> &Site {
        if let Some(id) = id {
            if let Some(site) = self.get(id) {
                return site;
            }
            tracing::warn!(%id, "Unknown site requested; falling back");
        }
        let site = self
            .default
            .as_deref()
            .and_then(|id| self.get(id))
            .or_else(|| self.order.first().and_then(|id| self.get(id)))
            .unwrap_or(&BASELINE);
        tracing::debug!(site = site.name(), "Resolved site");
        site
    }
}
