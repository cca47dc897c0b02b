//! # Run events published on the outer and inner buses.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Runner events**: run framing (`StartRunner`, `Begin`, `Coverage`, `End`, `EndRunner`)
//! - **Session events**: browser/session/suite/state progress, emitted by the session layer
//! - **Result events**: result records (`TestResult`, `Capture`, `UpdateResult`, `EndTest`)
//! - **Bus events**: error signals raised by the bus itself (`ListenerFailed`, `ListenerOverflow`)
//!
//! The [`Event`] enum carries one typed payload per kind. Payloads are behind `Arc`,
//! so cloning an event (or forwarding it to another bus) never copies or alters them.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use snapvisor::{BrowserInfo, Event, EventKind, KindSet};
//!
//! let ev = Event::StartBrowser(Arc::new(BrowserInfo { browser_id: "chrome".into() }));
//! assert_eq!(ev.kind(), EventKind::StartBrowser);
//!
//! let kinds = KindSet::from([EventKind::StartBrowser, EventKind::StopBrowser]);
//! assert!(kinds.contains(ev.kind()));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::coverage::CoverageReport;
use crate::error::ListenerError;
use crate::records::{CaptureResult, TestResult, UpdateResult};
use crate::runner::RunnerRef;

use super::payload::{
    BeginInfo, BrowserInfo, ErrorInfo, Notice, OverflowInfo, RetryInfo, SessionInfo, StateInfo,
    SuiteInfo,
};

/// Classification of run events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Runner events ===
    /// Runner is about to start; awaited, listeners may veto by failing.
    StartRunner,
    /// Run announced with its config, total state count and browser ids.
    Begin,
    /// Aggregated coverage report, published during finalization.
    Coverage,
    /// Run finished (success or failure).
    End,
    /// Runner is done; awaited, listeners may flush reports.
    EndRunner,

    // === Session events ===
    BeginSession,
    EndSession,
    StartBrowser,
    StopBrowser,
    Info,
    BeginSuite,
    EndSuite,
    SkipState,
    BeginState,
    EndState,
    Error,
    Warning,
    Retry,

    // === Result events ===
    /// Screenshot comparison result for one state.
    TestResult,
    /// New reference image captured.
    Capture,
    /// Reference image update decision.
    UpdateResult,
    /// Generic "test finished" signal, published alongside every `TestResult`.
    EndTest,

    // === Bus events ===
    /// A listener failed while handling a non-awaited event.
    ListenerFailed,
    /// A listener queue was full or closed and an event was dropped for it.
    ListenerOverflow,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 24] = [
        EventKind::StartRunner,
        EventKind::Begin,
        EventKind::Coverage,
        EventKind::End,
        EventKind::EndRunner,
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
        EventKind::TestResult,
        EventKind::Capture,
        EventKind::UpdateResult,
        EventKind::EndTest,
        EventKind::ListenerFailed,
        EventKind::ListenerOverflow,
    ];

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::StartRunner => "start_runner",
            EventKind::Begin => "begin",
            EventKind::Coverage => "coverage",
            EventKind::End => "end",
            EventKind::EndRunner => "end_runner",
            EventKind::BeginSession => "begin_session",
            EventKind::EndSession => "end_session",
            EventKind::StartBrowser => "start_browser",
            EventKind::StopBrowser => "stop_browser",
            EventKind::Info => "info",
            EventKind::BeginSuite => "begin_suite",
            EventKind::EndSuite => "end_suite",
            EventKind::SkipState => "skip_state",
            EventKind::BeginState => "begin_state",
            EventKind::EndState => "end_state",
            EventKind::Error => "error",
            EventKind::Warning => "warning",
            EventKind::Retry => "retry",
            EventKind::TestResult => "test_result",
            EventKind::Capture => "capture",
            EventKind::UpdateResult => "update_result",
            EventKind::EndTest => "end_test",
            EventKind::ListenerFailed => "listener_failed",
            EventKind::ListenerOverflow => "listener_overflow",
        }
    }

    #[inline]
    const fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of [`EventKind`]s a subscription listens to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindSet(u32);

impl KindSet {
    /// Set with no kinds.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Set with every kind.
    pub const fn all() -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < EventKind::ALL.len() {
            bits |= EventKind::ALL[i].bit();
            i += 1;
        }
        Self(bits)
    }

    /// Builds a set from a list of kinds.
    pub const fn of(kinds: &[EventKind]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < kinds.len() {
            bits |= kinds[i].bit();
            i += 1;
        }
        Self(bits)
    }

    /// Returns the set with `kind` added.
    #[must_use]
    pub const fn with(self, kind: EventKind) -> Self {
        Self(self.0 | kind.bit())
    }

    #[inline]
    pub const fn contains(self, kind: EventKind) -> bool {
        self.0 & kind.bit() != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates over the kinds in the set, in declaration order.
    pub fn iter(self) -> impl Iterator<Item = EventKind> {
        EventKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl From<EventKind> for KindSet {
    fn from(kind: EventKind) -> Self {
        Self(kind.bit())
    }
}

impl From<&[EventKind]> for KindSet {
    fn from(kinds: &[EventKind]) -> Self {
        Self::of(kinds)
    }
}

impl<const N: usize> From<[EventKind; N]> for KindSet {
    fn from(kinds: [EventKind; N]) -> Self {
        Self::of(&kinds)
    }
}

impl FromIterator<EventKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = EventKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), KindSet::with)
    }
}

/// Run event with its typed payload.
///
/// Each variant maps to exactly one [`EventKind`]; a listener subscribed to a
/// kind only ever sees the variant of that kind.
#[derive(Clone, Debug)]
pub enum Event {
    StartRunner(RunnerRef),
    Begin(Arc<BeginInfo>),
    Coverage(Arc<CoverageReport>),
    End,
    EndRunner(RunnerRef),

    BeginSession(Arc<SessionInfo>),
    EndSession(Arc<SessionInfo>),
    StartBrowser(Arc<BrowserInfo>),
    StopBrowser(Arc<BrowserInfo>),
    Info(Arc<Notice>),
    BeginSuite(Arc<SuiteInfo>),
    EndSuite(Arc<SuiteInfo>),
    SkipState(Arc<StateInfo>),
    BeginState(Arc<StateInfo>),
    EndState(Arc<StateInfo>),
    Error(Arc<ErrorInfo>),
    Warning(Arc<Notice>),
    Retry(Arc<RetryInfo>),

    TestResult(Arc<TestResult>),
    Capture(Arc<CaptureResult>),
    UpdateResult(Arc<UpdateResult>),
    EndTest(Arc<TestResult>),

    ListenerFailed(Arc<ListenerError>),
    ListenerOverflow(Arc<OverflowInfo>),
}

impl Event {
    /// Returns the classification of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::StartRunner(_) => EventKind::StartRunner,
            Event::Begin(_) => EventKind::Begin,
            Event::Coverage(_) => EventKind::Coverage,
            Event::End => EventKind::End,
            Event::EndRunner(_) => EventKind::EndRunner,
            Event::BeginSession(_) => EventKind::BeginSession,
            Event::EndSession(_) => EventKind::EndSession,
            Event::StartBrowser(_) => EventKind::StartBrowser,
            Event::StopBrowser(_) => EventKind::StopBrowser,
            Event::Info(_) => EventKind::Info,
            Event::BeginSuite(_) => EventKind::BeginSuite,
            Event::EndSuite(_) => EventKind::EndSuite,
            Event::SkipState(_) => EventKind::SkipState,
            Event::BeginState(_) => EventKind::BeginState,
            Event::EndState(_) => EventKind::EndState,
            Event::Error(_) => EventKind::Error,
            Event::Warning(_) => EventKind::Warning,
            Event::Retry(_) => EventKind::Retry,
            Event::TestResult(_) => EventKind::TestResult,
            Event::Capture(_) => EventKind::Capture,
            Event::UpdateResult(_) => EventKind::UpdateResult,
            Event::EndTest(_) => EventKind::EndTest,
            Event::ListenerFailed(_) => EventKind::ListenerFailed,
            Event::ListenerOverflow(_) => EventKind::ListenerOverflow,
        }
    }

    /// Creates a listener overflow event.
    #[inline]
    pub fn listener_overflow(listener: &'static str, dropped: EventKind, reason: &'static str) -> Self {
        Event::ListenerOverflow(Arc::new(OverflowInfo {
            listener,
            dropped,
            reason,
        }))
    }

    /// Creates a listener failure event.
    #[inline]
    pub fn listener_failed(err: ListenerError) -> Self {
        Event::ListenerFailed(Arc::new(err))
    }

    #[inline]
    pub fn is_bus_signal(&self) -> bool {
        matches!(self, Event::ListenerFailed(_) | Event::ListenerOverflow(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_kinds_fit_the_set() {
        let all = KindSet::all();
        for kind in EventKind::ALL {
            assert!(all.contains(kind), "{kind} missing");
        }
        assert_eq!(all.iter().count(), EventKind::ALL.len());
    }

    #[test]
    fn test_kind_set_membership() {
        let set = KindSet::from([EventKind::Begin, EventKind::End]);
        assert!(set.contains(EventKind::Begin));
        assert!(set.contains(EventKind::End));
        assert!(!set.contains(EventKind::EndRunner));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![EventKind::Begin, EventKind::End]
        );
        assert!(KindSet::empty().is_empty());
        let collected: KindSet = [EventKind::Info, EventKind::Warning].into_iter().collect();
        assert_eq!(collected, KindSet::of(&[EventKind::Warning, EventKind::Info]));
    }

    #[test]
    fn test_event_kind_matches_variant() {
        assert_eq!(Event::End.kind(), EventKind::End);
        let ov = Event::listener_overflow("html", EventKind::TestResult, "full");
        assert_eq!(ov.kind(), EventKind::ListenerOverflow);
        assert!(ov.is_bus_signal());
        assert!(!Event::End.is_bus_signal());
    }
}
