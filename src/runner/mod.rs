//! Run core: staged orchestration and result routing.
//!
//! The only entry point from this module is [`RunController`], which drives a
//! run through its stages and owns the outer bus.
//!
//! Internal modules:
//! - [`controller`]: stage sequencing, bus bridging, guaranteed finalization;
//! - [`pipeline`]: routes result records to coverage and the outer bus;
//! - [`session`]: contracts of the external state processor and session layer;
//! - [`handle`]: the runner handle passed to `StartRunner`/`EndRunner` listeners;
//! - [`state`]: run state machine.
//!
//! ## Wiring
//! ```text
//!  RunController ── owns ──► outer EventBus ◄── reporters / LogWriter
//!        │                        ▲    ▲
//!        │ SessionFactory         │    │ emit (same payload)
//!        ▼                        │    │
//!  SessionOrchestrator            │  ResultPipeline ──► CoverageAggregator
//!        │                        │    ▲
//!        └── inner EventBus ──────┘    │ TestResult / Capture / UpdateResult
//!             (passthrough whitelist)  │
//!                        └─────────────┘
//! ```

mod controller;
mod handle;
mod pipeline;
mod session;
mod state;

pub use controller::{PASSTHROUGH_EVENTS, RESULT_EVENTS, RunController};
pub use handle::RunnerRef;
pub use pipeline::ResultPipeline;
pub use session::{SessionFactory, SessionOrchestrator, StateProcessor};
pub use state::RunState;
