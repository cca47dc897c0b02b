//! # Coverage aggregator.
//!
//! Accumulates the coverage snapshots of every result record of a run into a
//! single [`CoverageReport`], keyed by browser.
//!
//! ## Rules
//! - Absent or empty snapshots are ignored (coverage is optional per record).
//! - With coverage disabled (by the run config or by the library), every call
//!   is a no-op and `finalize` returns `None`.
//! - `finalize` hands the report out once; later calls return `None`.
//! - Snapshots arriving after `finalize` are dropped with a warning.
//!
//! Concurrent `add_snapshot` calls (several browsers reporting at once) are
//! serialized by a mutex; each call merges one snapshot into one slot.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::browser::BrowserId;
use crate::config::RunConfig;

use super::library::{CoverageLibrary, LevelCoverage};
use super::snapshot::{CoverageReport, CoverageSnapshot};

/// Thread-safe accumulator of per-browser coverage.
pub struct CoverageAggregator {
    library: Arc<dyn CoverageLibrary>,
    enabled: bool,
    /// `None` once finalized.
    report: Mutex<Option<CoverageReport>>,
    merged: AtomicUsize,
}

impl CoverageAggregator {
    /// Creates an aggregator using the merge rules of `library`.
    ///
    /// Enabled whenever the library is; see [`with_library`](Self::with_library)
    /// to also honour the run config.
    pub fn new(library: Arc<dyn CoverageLibrary>) -> Self {
        let enabled = library.is_enabled();
        Self {
            library,
            enabled,
            report: Mutex::new(Some(CoverageReport::new())),
            merged: AtomicUsize::new(0),
        }
    }

    /// Creates an aggregator with [`LevelCoverage`] rules, enabled per `cfg`.
    pub fn from_config(cfg: &RunConfig) -> Self {
        Self::with_library(cfg, Arc::new(LevelCoverage::from_config(cfg)))
    }

    /// Creates an aggregator with the rules of `library`, enabled only if both
    /// `cfg` and the library enable coverage.
    pub fn with_library(cfg: &RunConfig, library: Arc<dyn CoverageLibrary>) -> Self {
        let mut aggregator = Self::new(library);
        aggregator.enabled &= cfg.coverage_enabled();
        aggregator
    }

    /// Returns `true` if coverage is collected.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Merges `snapshot` into the slot of `browser_id`.
    ///
    /// Returns `true` if the snapshot was merged.
    pub fn add_snapshot(&self, browser_id: &BrowserId, snapshot: Option<&CoverageSnapshot>) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let Some(snapshot) = snapshot.filter(|s| !s.is_empty()) else {
            return false;
        };

        let mut guard = self.report.lock();
        match guard.as_mut() {
            Some(report) => {
                self.library.merge_snapshot(report, browser_id, snapshot);
                self.merged.fetch_add(1, AtomicOrdering::Relaxed);
                debug!(browser = %browser_id, rules = snapshot.rule_count(), "coverage merged");
                true
            }
            None => {
                warn!(browser = %browser_id, "coverage snapshot arrived after finalize; dropped");
                false
            }
        }
    }

    /// Number of snapshots merged so far.
    pub fn merged_count(&self) -> usize {
        self.merged.load(AtomicOrdering::Relaxed)
    }

    /// Returns the accumulated report.
    ///
    /// - `None` if coverage is disabled.
    /// - `None` on every call after the first.
    pub fn finalize(&self) -> Option<CoverageReport> {
        if !self.is_enabled() {
            return None;
        }
        let report = self.report.lock().take();
        if report.is_none() {
            warn!("coverage already finalized");
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::CoverageLevel;

    fn snap(rule: &str, level: CoverageLevel) -> CoverageSnapshot {
        CoverageSnapshot::new().with_rule("main.css", rule, level)
    }

    fn enabled() -> CoverageAggregator {
        CoverageAggregator::new(Arc::new(LevelCoverage::new(true)))
    }

    #[test]
    fn test_disabled_is_noop() {
        let agg = CoverageAggregator::from_config(&RunConfig::default());
        assert!(!agg.is_enabled());
        assert!(!agg.add_snapshot(&"chrome".into(), Some(&snap(".a", CoverageLevel::Full))));
        assert_eq!(agg.merged_count(), 0);
        assert!(agg.finalize().is_none());
    }

    #[test]
    fn test_config_gates_custom_library() {
        let library = Arc::new(LevelCoverage::new(true));

        let off = CoverageAggregator::with_library(&RunConfig::default(), library.clone());
        assert!(!off.is_enabled());
        assert!(!off.add_snapshot(&"chrome".into(), Some(&snap(".a", CoverageLevel::Full))));
        assert!(off.finalize().is_none());

        let on = CoverageAggregator::with_library(&RunConfig::default().with_coverage(true), library);
        assert!(on.is_enabled());
        assert!(on.add_snapshot(&"chrome".into(), Some(&snap(".a", CoverageLevel::Full))));

        let disabled_library = Arc::new(LevelCoverage::new(false));
        let cfg = RunConfig::default().with_coverage(true);
        assert!(!CoverageAggregator::with_library(&cfg, disabled_library).is_enabled());
    }

    #[test]
    fn test_absent_or_empty_snapshot_is_ignored() {
        let agg = enabled();
        assert!(!agg.add_snapshot(&"chrome".into(), None));
        assert!(!agg.add_snapshot(&"chrome".into(), Some(&CoverageSnapshot::new())));
        let report = agg.finalize().unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_slots_are_merged_per_browser() {
        let agg = enabled();
        let chrome = BrowserId::from("chrome");
        let firefox = BrowserId::from("firefox");

        agg.add_snapshot(&chrome, Some(&snap(".a", CoverageLevel::Partial)));
        agg.add_snapshot(&firefox, Some(&snap(".a", CoverageLevel::None)));
        agg.add_snapshot(&chrome, Some(&snap(".a", CoverageLevel::Full)));
        assert_eq!(agg.merged_count(), 3);

        let report = agg.finalize().unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(
            report.get(&chrome).unwrap().level("main.css", ".a"),
            Some(CoverageLevel::Full)
        );
        assert_eq!(
            report.get(&firefox).unwrap().level("main.css", ".a"),
            Some(CoverageLevel::None)
        );
    }

    #[test]
    fn test_finalize_once() {
        let agg = enabled();
        agg.add_snapshot(&"chrome".into(), Some(&snap(".a", CoverageLevel::Full)));
        assert!(agg.finalize().is_some());
        assert!(agg.finalize().is_none());
        assert!(!agg.add_snapshot(&"chrome".into(), Some(&snap(".b", CoverageLevel::Full))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_arrivals_merge_like_sequential() {
        let agg = Arc::new(enabled());
        let levels = [CoverageLevel::None, CoverageLevel::Partial, CoverageLevel::Full];

        let mut handles = Vec::new();
        for i in 0..64usize {
            let agg = Arc::clone(&agg);
            let browser = if i % 2 == 0 { "chrome" } else { "firefox" };
            let snapshot = snap(&format!(".r{}", i % 8), levels[i % 3]);
            handles.push(tokio::spawn(async move {
                agg.add_snapshot(&BrowserId::from(browser), Some(&snapshot));
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let mut expected = CoverageReport::new();
        for i in 0..64usize {
            let browser = if i % 2 == 0 { "chrome" } else { "firefox" };
            expected
                .slot_mut(&BrowserId::from(browser))
                .merge(&snap(&format!(".r{}", i % 8), levels[i % 3]));
        }

        assert_eq!(agg.merged_count(), 64);
        assert_eq!(agg.finalize().unwrap(), expected);
    }
}
