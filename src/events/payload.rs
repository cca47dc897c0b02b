//! Payloads carried by lifecycle events.
//!
//! Result records live in [`records`](crate::records); runner handles in
//! [`runner`](crate::runner). Everything here is plain data produced either by
//! the run controller (`BeginInfo`), the session layer (everything else) or the
//! bus itself (`OverflowInfo`).

use std::sync::Arc;

use crate::browser::BrowserId;
use crate::config::RunConfig;

use super::EventKind;

/// Payload of `Begin`.
#[derive(Debug, Clone)]
pub struct BeginInfo {
    /// Run configuration.
    pub config: Arc<RunConfig>,
    /// Sum of state counts across every suite of the run.
    pub total_states: usize,
    /// Ids of the configured browsers.
    pub browser_ids: Vec<BrowserId>,
}

/// Payload of `BeginSession` / `EndSession`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub browser_id: BrowserId,
    /// Driver-assigned session id.
    pub session_id: String,
}

/// Payload of `StartBrowser` / `StopBrowser`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserInfo {
    pub browser_id: BrowserId,
}

/// Payload of `BeginSuite` / `EndSuite`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteInfo {
    pub browser_id: BrowserId,
    /// Full suite path, outermost first.
    pub suite: Vec<String>,
}

/// Payload of `SkipState` / `BeginState` / `EndState`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateInfo {
    pub browser_id: BrowserId,
    pub suite: Vec<String>,
    pub state: String,
}

/// Payload of `Info` / `Warning`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Browser the notice relates to, if any.
    pub browser_id: Option<BrowserId>,
    pub message: String,
}

/// Payload of `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub browser_id: BrowserId,
    pub suite: Option<Vec<String>>,
    pub state: Option<String>,
    pub message: String,
}

/// Payload of `Retry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryInfo {
    pub browser_id: BrowserId,
    pub suite: Vec<String>,
    pub state: String,
    /// Failure that triggered the retry.
    pub message: String,
    /// Attempt that failed (1-based).
    pub attempt: u32,
    /// Retries left after this one.
    pub retries_left: u32,
}

/// Payload of `ListenerOverflow`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverflowInfo {
    /// Name of the listener that missed the event.
    pub listener: &'static str,
    /// Kind of the dropped event.
    pub dropped: EventKind,
    /// `"full"` or `"closed"`.
    pub reason: &'static str,
}
