//! Coverage aggregation.
//!
//! Result records may carry a [`CoverageSnapshot`] collected by the
//! instrumentation layer in the browser. The [`CoverageAggregator`] folds every
//! snapshot into a [`CoverageReport`] keyed by [`BrowserId`](crate::BrowserId),
//! using the merge rules of a [`CoverageLibrary`].
//!
//! ## Contents
//! - [`CoverageLevel`], [`CoverageSnapshot`], [`CoverageReport`] data model
//! - [`CoverageLibrary`] merge contract, [`LevelCoverage`] built-in rules
//! - [`CoverageAggregator`] thread-safe accumulator finalized once per run

mod aggregator;
mod library;
mod snapshot;

pub use aggregator::CoverageAggregator;
pub use library::{CoverageLibrary, LevelCoverage};
pub use snapshot::{CoverageLevel, CoverageReport, CoverageSnapshot};
