//! # External collaborator contracts.
//!
//! The run core does not open browsers, take screenshots or compare them. It
//! drives two collaborators through these traits:
//!
//! - [`StateProcessor`]: prepares the per-state work (e.g. a diff engine pool)
//!   and is passed on to the session layer.
//! - [`SessionOrchestrator`]: runs suites in browsers and reports progress and
//!   results on its own (inner) [`EventBus`]. Built per run by a [`SessionFactory`].
//!
//! Any parallelism across browsers lives inside the orchestrator; the core
//! only sees its event stream and waits for `run` to complete.

use std::sync::Arc;

use async_trait::async_trait;

use crate::browser::BrowserId;
use crate::config::RunConfig;
use crate::events::EventBus;
use crate::suite::SuiteCollection;

use super::handle::RunnerRef;

/// Per-state processing backend, prepared once per run.
#[async_trait]
pub trait StateProcessor: Send + Sync + 'static {
    /// Prepares the processor before any suite runs.
    ///
    /// A failure aborts the run before execution.
    async fn prepare(&self, runner: &RunnerRef) -> anyhow::Result<()>;
}

/// Session layer façade: drives suites through browsers.
#[async_trait]
pub trait SessionOrchestrator: Send + Sync + 'static {
    /// Inner bus the orchestrator publishes session and result events on.
    fn bus(&self) -> &EventBus;

    /// Runs every suite of `suites`, completing when all browsers are done.
    async fn run(
        &self,
        suites: Arc<SuiteCollection>,
        processor: Arc<dyn StateProcessor>,
    ) -> anyhow::Result<()>;
}

/// Builds the session orchestrator of a run, scoped to the test browsers.
pub trait SessionFactory: Send + Sync + 'static {
    fn create(&self, config: &Arc<RunConfig>, browsers: &[BrowserId]) -> Arc<dyn SessionOrchestrator>;
}

impl<F> SessionFactory for F
where
    F: Fn(&Arc<RunConfig>, &[BrowserId]) -> Arc<dyn SessionOrchestrator> + Send + Sync + 'static,
{
    fn create(&self, config: &Arc<RunConfig>, browsers: &[BrowserId]) -> Arc<dyn SessionOrchestrator> {
        self(config, browsers)
    }
}
