//! # RunController: staged run with guaranteed finalization.
//!
//! The [`RunController`] owns the outer [`EventBus`], the coverage aggregator
//! and the run configuration. It drives one run through four stages and always
//! finalizes, whichever stage failed.
//!
//! ## Stages
//! ```text
//! run(suites)
//!   ├─► announce:  emit_and_wait(StartRunner)   (a failing listener vetoes the run)
//!   │              emit(Begin{config, total_states, browser_ids})
//!   ├─► prepare:   state_processor.prepare(runner)
//!   ├─► execute:   session = factory.create(config, test_browsers)
//!   │              outer.passthrough(session.bus(), PASSTHROUGH_EVENTS)
//!   │              ResultPipeline.attach(session.bus())
//!   │              session.run(suites, state_processor)
//!   │              drain bridge + pipeline            (every exit path)
//!   └─► finalize:  coverage.finalize() → emit(Coverage)  (if enabled)
//!                  emit(End)
//!                  emit_and_wait(EndRunner)
//! ```
//!
//! ## Rules
//! - The first failing stage short-circuits the remaining stages; finalize still runs.
//! - Panics in stages are caught and reported as execution failures.
//! - The original error is returned after finalize; a finalize failure is attached
//!   to it ([`RunError::Compound`]), never substituted for it.
//! - A controller runs once; a second `run` returns [`RunError::AlreadyStarted`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::browser::BrowserId;
use crate::config::RunConfig;
use crate::coverage::{CoverageAggregator, CoverageLibrary, CoverageReport};
use crate::error::{RunError, panic_message};
use crate::events::{BeginInfo, Event, EventBus, EventKind, KindSet};
use crate::suite::SuiteCollection;

use super::handle::RunnerRef;
use super::pipeline::ResultPipeline;
use super::session::{SessionFactory, StateProcessor};
use super::state::RunState;

/// Session events forwarded verbatim from the inner bus to the outer bus.
pub const PASSTHROUGH_EVENTS: KindSet = KindSet::of(&[
    EventKind::BeginSession,
    EventKind::EndSession,
    EventKind::StartBrowser,
    EventKind::StopBrowser,
    EventKind::Info,
    EventKind::BeginSuite,
    EventKind::EndSuite,
    EventKind::SkipState,
    EventKind::BeginState,
    EventKind::EndState,
    EventKind::Error,
    EventKind::Warning,
    EventKind::Retry,
    EventKind::End,
    EventKind::EndRunner,
]);

/// Result record events routed through the [`ResultPipeline`].
pub const RESULT_EVENTS: KindSet = KindSet::of(&[
    EventKind::TestResult,
    EventKind::Capture,
    EventKind::UpdateResult,
]);

/// Top-level orchestrator of a visual-regression run.
pub struct RunController {
    config: Arc<RunConfig>,
    bus: EventBus,
    processor: Arc<dyn StateProcessor>,
    sessions: Arc<dyn SessionFactory>,
    coverage: Arc<CoverageAggregator>,
    test_browsers: Mutex<Option<Vec<BrowserId>>>,
    state: Mutex<RunState>,
    started: AtomicBool,
    report: Mutex<Option<Arc<CoverageReport>>>,
}

impl RunController {
    /// Creates a controller with its own outer bus.
    ///
    /// Coverage uses the built-in [`LevelCoverage`](crate::LevelCoverage) rules,
    /// enabled per [`RunConfig::coverage`].
    pub fn new(
        config: RunConfig,
        processor: Arc<dyn StateProcessor>,
        sessions: Arc<dyn SessionFactory>,
    ) -> Self {
        let coverage = Arc::new(CoverageAggregator::from_config(&config));
        let bus = EventBus::for_config(&config);
        Self {
            config: Arc::new(config),
            bus,
            processor,
            sessions,
            coverage,
            test_browsers: Mutex::new(None),
            state: Mutex::new(RunState::Created),
            started: AtomicBool::new(false),
            report: Mutex::new(None),
        }
    }

    /// Replaces the coverage merge rules.
    ///
    /// Coverage stays off unless [`RunConfig::coverage`] enables it.
    #[must_use]
    pub fn with_coverage_library(mut self, library: Arc<dyn CoverageLibrary>) -> Self {
        self.coverage = Arc::new(CoverageAggregator::with_library(&self.config, library));
        self
    }

    /// Outer bus; subscribe reporters here before calling [`run`](Self::run).
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn config(&self) -> &Arc<RunConfig> {
        &self.config
    }

    /// Restricts the session layer to a subset of the configured browsers.
    ///
    /// `Begin` still reports every configured browser id.
    pub fn set_test_browsers<I, B>(&self, browsers: I)
    where
        I: IntoIterator<Item = B>,
        B: Into<BrowserId>,
    {
        *self.test_browsers.lock() = Some(browsers.into_iter().map(Into::into).collect());
    }

    /// Stage reached so far.
    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    /// Coverage report produced by the finalize stage, if coverage is enabled.
    pub fn coverage_report(&self) -> Option<Arc<CoverageReport>> {
        self.report.lock().clone()
    }

    /// Handle passed to `StartRunner` / `EndRunner` listeners.
    pub fn runner_ref(&self) -> RunnerRef {
        RunnerRef::new("run", Arc::clone(&self.config), self.bus.clone())
    }

    /// Runs every suite of `suites` and finalizes.
    ///
    /// Returns the first stage failure (after finalization), or the
    /// finalization failure if only finalization failed.
    pub async fn run(&self, suites: SuiteCollection) -> Result<(), RunError> {
        if self.started.swap(true, AtomicOrdering::SeqCst) {
            return Err(RunError::AlreadyStarted);
        }
        let suites = Arc::new(suites);
        info!(
            suites = suites.len(),
            states = suites.total_states(),
            "run starting"
        );

        let outcome = match AssertUnwindSafe(self.drive(&suites)).catch_unwind().await {
            Ok(res) => res,
            Err(panic) => Err(RunError::Execution {
                error: format!("panicked: {}", panic_message(panic.as_ref())),
            }),
        };
        if let Err(e) = &outcome {
            warn!(stage = %self.state(), label = e.as_label(), error = %e, "run aborted; finalizing");
        }

        let finalized = self.finalize().await;
        self.advance(RunState::Finalized);

        let result = RunError::merge(outcome, finalized);
        match &result {
            Ok(()) => info!("run finished"),
            Err(e) => warn!(label = e.as_label(), error = %e, "run failed"),
        }
        result
    }

    async fn drive(&self, suites: &Arc<SuiteCollection>) -> Result<(), RunError> {
        let total_states = suites.total_states();
        self.announce(total_states).await?;
        self.prepare().await?;
        self.execute(suites).await
    }

    async fn announce(&self, total_states: usize) -> Result<(), RunError> {
        self.bus
            .emit_and_wait(Event::StartRunner(self.runner_ref()))
            .await
            .map_err(RunError::Vetoed)?;

        self.bus.emit(Event::Begin(Arc::new(BeginInfo {
            config: Arc::clone(&self.config),
            total_states,
            browser_ids: self.config.browser_ids(),
        })));
        self.advance(RunState::Announced);
        Ok(())
    }

    async fn prepare(&self) -> Result<(), RunError> {
        self.processor
            .prepare(&self.runner_ref())
            .await
            .map_err(|e| RunError::Prepare {
                error: format!("{e:#}"),
            })?;
        self.advance(RunState::Prepared);
        Ok(())
    }

    async fn execute(&self, suites: &Arc<SuiteCollection>) -> Result<(), RunError> {
        let browsers = self.test_browsers();
        let session = self.sessions.create(&self.config, &browsers);
        let inner = session.bus().clone();

        let bridge = self.bus.passthrough(&inner, PASSTHROUGH_EVENTS);
        let pipeline =
            ResultPipeline::new(self.bus.clone(), Arc::clone(&self.coverage)).attach(&inner);
        self.advance(RunState::Executing);

        let res = AssertUnwindSafe(session.run(Arc::clone(suites), Arc::clone(&self.processor)))
            .catch_unwind()
            .await;

        // Everything the session emitted reaches the outer bus before finalization.
        tokio::join!(inner.drain(bridge), inner.drain(pipeline));

        match res {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(RunError::Execution {
                error: format!("{e:#}"),
            }),
            Err(panic) => Err(RunError::Execution {
                error: format!("session panicked: {}", panic_message(panic.as_ref())),
            }),
        }
    }

    async fn finalize(&self) -> Result<(), RunError> {
        if self.coverage.is_enabled() {
            if let Some(report) = self.coverage.finalize() {
                let report = Arc::new(report);
                info!(
                    browsers = report.len(),
                    merged = self.coverage.merged_count(),
                    "coverage aggregated"
                );
                *self.report.lock() = Some(Arc::clone(&report));
                self.bus.emit(Event::Coverage(report));
            }
        }

        self.bus.emit(Event::End);
        self.bus
            .emit_and_wait(Event::EndRunner(self.runner_ref()))
            .await
            .map_err(RunError::Finalization)
    }

    fn test_browsers(&self) -> Vec<BrowserId> {
        self.test_browsers
            .lock()
            .clone()
            .unwrap_or_else(|| self.config.browser_ids())
    }

    fn advance(&self, next: RunState) {
        let mut state = self.state.lock();
        debug!(from = %*state, to = %next, "run state");
        *state = next;
    }
}
