//! # Result pipeline: coverage attribution and republishing.
//!
//! [`ResultPipeline`] listens on the inner (session) bus for the three result
//! record kinds. For every record it:
//! 1. hands the record's coverage snapshot to the [`CoverageAggregator`];
//! 2. re-emits the **same** payload on the outer bus under the record's kind.
//!
//! ```text
//! inner: TestResult(r)   ──► add_snapshot(r) ──► outer: EndTest(r), TestResult(r)
//! inner: Capture(r)      ──► add_snapshot(r) ──► outer: Capture(r)
//! inner: UpdateResult(r) ──► add_snapshot(r) ──► outer: UpdateResult(r)
//! ```
//!
//! This is the only place coverage is attributed; every record kind goes
//! through the same `save_coverage` step. The subscription is lossless, so
//! each record is attributed exactly once however far the pipeline lags.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::coverage::CoverageAggregator;
use crate::events::{Event, EventBus, SubscriptionId};
use crate::listeners::Listen;
use crate::records::ResultRecord;

use super::controller::RESULT_EVENTS;

/// Routes result records from the session bus to coverage and the outer bus.
pub struct ResultPipeline {
    outer: EventBus,
    coverage: Arc<CoverageAggregator>,
}

impl ResultPipeline {
    pub fn new(outer: EventBus, coverage: Arc<CoverageAggregator>) -> Self {
        Self { outer, coverage }
    }

    /// Subscribes the pipeline to the result events of `inner`.
    pub fn attach(self, inner: &EventBus) -> SubscriptionId {
        inner.subscribe(RESULT_EVENTS, Arc::new(self))
    }

    fn save_coverage<R: ResultRecord + ?Sized>(&self, record: &R) {
        self.coverage
            .add_snapshot(record.browser_id(), record.coverage());
    }
}

#[async_trait]
impl Listen for ResultPipeline {
    async fn on_event(&self, event: &Event) -> anyhow::Result<()> {
        match event {
            Event::TestResult(result) => {
                self.save_coverage(result.as_ref());
                self.outer.emit(Event::EndTest(Arc::clone(result)));
                self.outer.emit(Event::TestResult(Arc::clone(result)));
            }
            Event::Capture(result) => {
                self.save_coverage(result.as_ref());
                self.outer.emit(Event::Capture(Arc::clone(result)));
            }
            Event::UpdateResult(result) => {
                self.save_coverage(result.as_ref());
                self.outer.emit(Event::UpdateResult(Arc::clone(result)));
            }
            other => debug!(event = %other.kind(), "result pipeline ignored event"),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "result-pipeline"
    }

    fn lossless(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use parking_lot::Mutex;

    use super::*;
    use crate::coverage::{CoverageLevel, CoverageSnapshot, LevelCoverage};
    use crate::events::{EventKind, KindSet};
    use crate::records::{CaptureResult, TestResult, UpdateResult};

    fn cov(rule: &str) -> Option<CoverageSnapshot> {
        Some(CoverageSnapshot::new().with_rule("main.css", rule, CoverageLevel::Full))
    }

    fn test_result(equal: bool) -> Arc<TestResult> {
        Arc::new(TestResult {
            browser_id: "chrome".into(),
            session_id: Some("s-1".into()),
            suite: vec!["header".into()],
            state: "plain".into(),
            reference_path: PathBuf::from("ref/plain.png"),
            current_path: PathBuf::from("tmp/plain.png"),
            equal,
            coverage: cov(".test"),
        })
    }

    #[tokio::test]
    async fn test_every_record_kind_feeds_coverage_and_is_republished() {
        let inner = EventBus::new(16);
        let outer = EventBus::new(16);
        let coverage = Arc::new(CoverageAggregator::new(Arc::new(LevelCoverage::new(true))));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let rec = outer.on(KindSet::all(), "recorder", move |ev: Event| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().push(ev);
                Ok(())
            }
        });
        let pipe = ResultPipeline::new(outer.clone(), Arc::clone(&coverage)).attach(&inner);

        let tr = test_result(false);
        let cap = Arc::new(CaptureResult {
            browser_id: "chrome".into(),
            suite: vec!["header".into()],
            state: "plain".into(),
            image_path: PathBuf::from("ref/plain.png"),
            coverage: cov(".capture"),
        });
        let upd = Arc::new(UpdateResult {
            browser_id: "firefox".into(),
            suite: vec!["header".into()],
            state: "plain".into(),
            reference_path: PathBuf::from("ref/plain.png"),
            updated: true,
            coverage: cov(".update"),
        });

        inner.emit(Event::TestResult(Arc::clone(&tr)));
        inner.emit(Event::Capture(Arc::clone(&cap)));
        inner.emit(Event::UpdateResult(Arc::clone(&upd)));
        inner.emit(Event::End);

        inner.drain(pipe).await;
        outer.drain(rec).await;

        assert_eq!(coverage.merged_count(), 3);

        let seen = seen.lock();
        let kinds: Vec<_> = seen.iter().map(Event::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::EndTest,
                EventKind::TestResult,
                EventKind::Capture,
                EventKind::UpdateResult
            ]
        );
        match (&seen[0], &seen[1], &seen[2], &seen[3]) {
            (Event::EndTest(a), Event::TestResult(b), Event::Capture(c), Event::UpdateResult(d)) => {
                assert!(Arc::ptr_eq(a, &tr));
                assert!(Arc::ptr_eq(b, &tr));
                assert!(Arc::ptr_eq(c, &cap));
                assert!(Arc::ptr_eq(d, &upd));
            }
            other => panic!("unexpected events: {other:?}"),
        }

        let report = coverage.finalize().unwrap();
        let chrome = report.get(&"chrome".into()).unwrap();
        assert_eq!(chrome.level("main.css", ".test"), Some(CoverageLevel::Full));
        assert_eq!(chrome.level("main.css", ".capture"), Some(CoverageLevel::Full));
        assert_eq!(chrome.level("main.css", ".update"), None);
        assert!(report.get(&"firefox".into()).unwrap().level("main.css", ".update").is_some());
    }

    #[tokio::test]
    async fn test_record_without_coverage_is_still_republished() {
        let inner = EventBus::new(16);
        let outer = EventBus::new(16);
        let coverage = Arc::new(CoverageAggregator::new(Arc::new(LevelCoverage::new(true))));

        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);
        let rec = outer.on(EventKind::TestResult, "counter", move |_ev: Event| {
            let sink = Arc::clone(&sink);
            async move {
                *sink.lock() += 1;
                Ok(())
            }
        });
        let pipe = ResultPipeline::new(outer.clone(), Arc::clone(&coverage)).attach(&inner);

        let mut plain = (*test_result(true)).clone();
        plain.coverage = None;
        inner.emit(Event::TestResult(Arc::new(plain)));

        inner.drain(pipe).await;
        outer.drain(rec).await;

        assert_eq!(*seen.lock(), 1);
        assert_eq!(coverage.merged_count(), 0);
    }
}
