//! # snapvisor
//!
//! **Snapvisor** is the event orchestration core of a visual-regression test
//! runner.
//!
//! It drives one run through its stages, bridges the events of the session
//! layer (browsers, suites, states) to the run's consumers, and folds the CSS
//! coverage collected with every result record into one report per browser.
//! Opening browsers, taking screenshots and comparing images are left to the
//! collaborators behind [`SessionOrchestrator`] and [`StateProcessor`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌──────────────────────────────────────────────────────────────────┐
//!  │  RunController (staged run, guaranteed finalize)                 │
//!  │  - outer EventBus (reporters, LogWriter)                         │
//!  │  - CoverageAggregator (per-browser CoverageReport)               │
//!  │  - SessionFactory ──► SessionOrchestrator (inner EventBus)       │
//!  └──────┬───────────────────────────────┬───────────────────────────┘
//!         │ emit_and_wait(StartRunner)    │ passthrough(inner, whitelist)
//!         │ emit(Begin)                   │ ResultPipeline.attach(inner)
//!         ▼                               ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                EventBus (per-listener FIFO queues)                │
//! │               (capacity: RunConfig::queue_capacity)               │
//! └──────┬─────────────────┬─────────────────┬────────────────────────┘
//!        ▼                 ▼                 ▼
//!     worker1           worker2           workerN
//!        ▼                 ▼                 ▼
//!   on_event()        on_event()        on_event()
//! ```
//!
//! ### Lifecycle
//! ```text
//! RunController::run(suites)
//!   ├─► Created   ── emit_and_wait(StartRunner) ─► veto? ──► finalize
//!   ├─► Announced ── emit(Begin{total_states})
//!   ├─► Prepared  ── state_processor.prepare()  ─► error? ──► finalize
//!   ├─► Executing ── session.run(suites)        ─► error/panic? ──► finalize
//!   │                  inner: session events ──► outer (same payload)
//!   │                  inner: result records ──► coverage + outer
//!   └─► Finalized ── emit(Coverage) ─► emit(End) ─► emit_and_wait(EndRunner)
//! ```
//!
//! ## Features
//! | Area           | Description                                                   | Key types / traits                        |
//! |----------------|---------------------------------------------------------------|-------------------------------------------|
//! | **Run**        | Staged run with guaranteed finalization.                      | [`RunController`], [`RunState`]           |
//! | **Events**     | Typed events, kind filters, waitable bus.                     | [`Event`], [`KindSet`], [`EventBus`]      |
//! | **Listeners**  | Hook into run events (reporters, loggers).                    | [`Listen`], [`ListenFn`]                  |
//! | **Coverage**   | Per-browser merge of rule coverage.                           | [`CoverageAggregator`], [`CoverageReport`]|
//! | **Errors**     | Typed errors for run stages and listeners.                    | [`RunError`], [`ListenerError`]           |
//! | **Configuration** | Browsers, coverage flag, listener queue capacity.          | [`RunConfig`]                             |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use snapvisor::{
//!     BrowserId, Event, EventBus, EventKind, RunConfig, RunController, RunnerRef,
//!     SessionOrchestrator, State, StateProcessor, Suite, SuiteCollection,
//! };
//!
//! struct NoopProcessor;
//!
//! #[async_trait]
//! impl StateProcessor for NoopProcessor {
//!     async fn prepare(&self, _runner: &RunnerRef) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! struct DrySession {
//!     bus: EventBus,
//! }
//!
//! #[async_trait]
//! impl SessionOrchestrator for DrySession {
//!     fn bus(&self) -> &EventBus {
//!         &self.bus
//!     }
//!
//!     async fn run(
//!         &self,
//!         _suites: Arc<SuiteCollection>,
//!         _processor: Arc<dyn StateProcessor>,
//!     ) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = RunConfig::default().with_browser("chrome").with_coverage(true);
//!
//!     let factory = |cfg: &Arc<RunConfig>, _browsers: &[BrowserId]| -> Arc<dyn SessionOrchestrator> {
//!         Arc::new(DrySession { bus: EventBus::for_config(cfg) })
//!     };
//!     let run = RunController::new(cfg, Arc::new(NoopProcessor), Arc::new(factory));
//!
//!     run.bus().on(EventKind::Begin, "progress", |ev: Event| async move {
//!         if let Event::Begin(info) = ev {
//!             println!("running {} states", info.total_states);
//!         }
//!         Ok(())
//!     });
//!
//!     let suites: SuiteCollection = [Suite::new("header").with_state(State::new("plain"))]
//!         .into_iter()
//!         .collect();
//!     run.run(suites).await?;
//!     assert!(run.coverage_report().is_some());
//!     Ok(())
//! }
//! ```
mod browser;
mod config;
mod coverage;
mod error;
mod events;
mod listeners;
mod records;
mod runner;
mod suite;

// ---- Public re-exports ----

pub use browser::BrowserId;
pub use config::{BrowserConfig, RunConfig, SuiteSource};
pub use coverage::{
    CoverageAggregator, CoverageLevel, CoverageLibrary, CoverageReport, CoverageSnapshot,
    LevelCoverage,
};
pub use error::{FailureKind, ListenerError, RunError};
pub use events::{
    BeginInfo, BrowserInfo, ErrorInfo, Event, EventBus, EventKind, KindSet, Notice, OverflowInfo,
    RetryInfo, SessionInfo, StateInfo, SubscriptionId, SuiteInfo,
};
pub use listeners::{Listen, ListenFn};
pub use records::{CaptureResult, ResultRecord, TestResult, UpdateResult};
pub use runner::{
    PASSTHROUGH_EVENTS, RESULT_EVENTS, ResultPipeline, RunController, RunState, RunnerRef,
    SessionFactory, SessionOrchestrator, StateProcessor,
};
pub use suite::{State, Suite, SuiteCollection};

// Optional: expose a simple built-in logger listener (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use listeners::LogWriter;
