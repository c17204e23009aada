use ptmux_disc::ParserHandle;
use ptmux_exec::Executor;
use ptmux_policy::Registry;
use std::sync::Arc;

/// Immutable dependencies shared by every job.
#[derive(Clone)]
pub struct Context {
    pub(crate) executor: Executor,
    pub(crate) parser: ParserHandle,
    pub(crate) sites: Arc<Registry>,
}
impl Context {
    pub fn new(executor: Executor, parser: ParserHandle, sites: Registry) -> Self {
        Self { executor, parser, sites: Arc::new(sites) }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn sites(&self) -> &Registry {
        &self.sites
    }
}
