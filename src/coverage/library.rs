//! # Coverage merge contract.
//!
//! The instrumentation layer owns the snapshot format and its merge rules. The
//! aggregator only needs to know whether coverage is on and how to fold one
//! snapshot into a report slot; [`CoverageLibrary`] is that seam.

use crate::browser::BrowserId;
use crate::config::RunConfig;

use super::snapshot::{CoverageReport, CoverageSnapshot};

/// Merge rules for coverage snapshots.
///
/// `merge_snapshot` must be commutative and associative for a fixed browser:
/// records from several browsers arrive in arbitrary interleavings.
pub trait CoverageLibrary: Send + Sync + 'static {
    /// Returns `true` if coverage is collected for this run.
    fn is_enabled(&self) -> bool;

    /// Folds `snapshot` into the slot of `browser_id` in `report`.
    fn merge_snapshot(
        &self,
        report: &mut CoverageReport,
        browser_id: &BrowserId,
        snapshot: &CoverageSnapshot,
    );
}

/// Built-in rules: per (source, rule), keep the highest [`CoverageLevel`](super::CoverageLevel).
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelCoverage {
    enabled: bool,
}

impl LevelCoverage {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Enabled iff the run config asks for coverage.
    pub fn from_config(cfg: &RunConfig) -> Self {
        Self::new(cfg.coverage_enabled())
    }
}

impl CoverageLibrary for LevelCoverage {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn merge_snapshot(
        &self,
        report: &mut CoverageReport,
        browser_id: &BrowserId,
        snapshot: &CoverageSnapshot,
    ) {
        report.slot_mut(browser_id).merge(snapshot);
    }
}
