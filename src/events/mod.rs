//! Run events: types and the waitable bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to run events emitted by the run controller, the session
//! layer and the result pipeline.
//!
//! ## Contents
//! - [`EventKind`], [`KindSet`], [`Event`] event classification and typed payloads
//! - [`EventBus`] per-listener queues with `emit` / `emit_and_wait`
//!
//! ## Quick reference
//! - **Outer bus** (owned by `RunController`): runner events, forwarded session
//!   events, republished result records. Consumed by reporters and loggers.
//! - **Inner bus** (owned by the session layer): session and result events.
//!   Consumed by the passthrough bridge and the `ResultPipeline`.

mod bus;
mod event;
mod payload;

pub use bus::{EventBus, SubscriptionId};
pub use event::{Event, EventKind, KindSet};
pub use payload::{
    BeginInfo, BrowserInfo, ErrorInfo, Notice, OverflowInfo, RetryInfo, SessionInfo, StateInfo,
    SuiteInfo,
};
