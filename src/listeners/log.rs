//! # LogWriter: tracing-backed event logger
//!
//! A minimal listener that turns every [`Event`] into a `tracing` record.
//! Use it for debugging or as a starting point for a console reporter.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO [begin] total_states=5 browsers=["chrome", "firefox"]
//! INFO [begin-state] browser=chrome suite=["root"] state="plain"
//! INFO [test-result] browser=chrome state="plain" equal=false
//! WARN [retry] browser=chrome state="plain" attempt=1 retries_left=2 err="timeout"
//! INFO [end]
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, KindSet};
use crate::listeners::Listen;

/// Event writer listener.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Kinds a `LogWriter` is meant to be subscribed with (all of them).
    pub fn kinds() -> KindSet {
        KindSet::all()
    }
}

#[async_trait]
impl Listen for LogWriter {
    async fn on_event(&self, e: &Event) -> anyhow::Result<()> {
        match e {
            Event::StartRunner(r) => info!(runner = r.name(), "[start-runner]"),
            Event::Begin(b) => {
                info!(total_states = b.total_states, browsers = ?b.browser_ids, "[begin]")
            }
            Event::Coverage(report) => info!(browsers = report.len(), "[coverage]"),
            Event::End => info!("[end]"),
            Event::EndRunner(r) => info!(runner = r.name(), "[end-runner]"),
            Event::BeginSession(s) => {
                debug!(browser = %s.browser_id, session = %s.session_id, "[begin-session]")
            }
            Event::EndSession(s) => {
                debug!(browser = %s.browser_id, session = %s.session_id, "[end-session]")
            }
            Event::StartBrowser(b) => debug!(browser = %b.browser_id, "[start-browser]"),
            Event::StopBrowser(b) => debug!(browser = %b.browser_id, "[stop-browser]"),
            Event::Info(n) => info!(browser = ?n.browser_id, "[info] {}", n.message),
            Event::Warning(n) => warn!(browser = ?n.browser_id, "[warning] {}", n.message),
            Event::BeginSuite(s) => debug!(browser = %s.browser_id, suite = ?s.suite, "[begin-suite]"),
            Event::EndSuite(s) => debug!(browser = %s.browser_id, suite = ?s.suite, "[end-suite]"),
            Event::SkipState(s) => {
                info!(browser = %s.browser_id, suite = ?s.suite, state = %s.state, "[skip-state]")
            }
            Event::BeginState(s) => {
                debug!(browser = %s.browser_id, suite = ?s.suite, state = %s.state, "[begin-state]")
            }
            Event::EndState(s) => {
                debug!(browser = %s.browser_id, suite = ?s.suite, state = %s.state, "[end-state]")
            }
            Event::Error(err) => error!(
                browser = %err.browser_id,
                suite = ?err.suite,
                state = ?err.state,
                "[error] {}",
                err.message
            ),
            Event::Retry(r) => warn!(
                browser = %r.browser_id,
                state = %r.state,
                attempt = r.attempt,
                retries_left = r.retries_left,
                err = %r.message,
                "[retry]"
            ),
            Event::TestResult(r) | Event::EndTest(r) => info!(
                browser = %r.browser_id,
                state = %r.state,
                equal = r.equal,
                "[{}]",
                e.kind()
            ),
            Event::Capture(r) => {
                info!(browser = %r.browser_id, state = %r.state, path = ?r.image_path, "[capture]")
            }
            Event::UpdateResult(r) => {
                info!(browser = %r.browser_id, state = %r.state, updated = r.updated, "[update-result]")
            }
            Event::ListenerFailed(err) => {
                warn!(listener = err.listener(), error = %err, "[listener-failed]")
            }
            Event::ListenerOverflow(o) => warn!(
                listener = o.listener,
                dropped = %o.dropped,
                reason = o.reason,
                "[listener-overflow]"
            ),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::events::{EventBus, Notice};

    #[tokio::test]
    async fn test_log_writer_accepts_every_kind() {
        let bus = EventBus::new(8);
        let id = bus.subscribe(LogWriter::kinds(), Arc::new(LogWriter::new()));

        bus.emit(Event::Warning(Arc::new(Notice {
            browser_id: Some("chrome".into()),
            message: "slow page".into(),
        })));
        bus.emit_and_wait(Event::End).await.unwrap();
        assert!(bus.drain(id).await);
    }
}
