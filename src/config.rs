//! # Run configuration.
//!
//! [`RunConfig`] is the immutable description of one visual-regression run:
//! which browsers take part, whether coverage is collected, where suites come
//! from, and how deep each listener queue is.
//!
//! The controller only reads it. Loading and validating it from files or CLI
//! flags is left to the caller; the serde derives are there for that.
//!
//! ## Sentinel values
//! - `queue_capacity = 0` → clamped to 1 by the bus
//!
//! # Example
//! ```
//! use snapvisor::RunConfig;
//!
//! let cfg = RunConfig::default()
//!     .with_browser("chrome")
//!     .with_browser("firefox")
//!     .with_coverage(true);
//!
//! assert_eq!(cfg.browser_ids().len(), 2);
//! assert!(cfg.coverage_enabled());
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::browser::BrowserId;

/// Where suites are collected from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteSource {
    /// Root directory of the test files.
    pub root: PathBuf,
    /// Glob patterns relative to `root`; empty means everything.
    pub patterns: Vec<String>,
}

/// One configured browser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Identifier used in events, results and the coverage report.
    pub id: BrowserId,
    /// Page root the session driver opens for this browser.
    #[serde(default)]
    pub root_url: Option<String>,
}

/// Configuration for a single run.
///
/// ## Field semantics
/// - `browsers`: browsers enabled for the run, in declaration order
/// - `coverage`: collect and aggregate coverage snapshots
/// - `source`: suite source handed to whoever builds the [`SuiteCollection`](crate::SuiteCollection)
/// - `queue_capacity`: per-listener queue depth on the buses (min 1)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Browsers enabled for the run.
    pub browsers: Vec<BrowserConfig>,
    /// Whether coverage is collected.
    pub coverage: bool,
    /// Suite source.
    pub source: SuiteSource,
    /// Per-listener queue capacity for every bus of the run.
    ///
    /// Listeners that fall further behind than this drop events (`ListenerOverflow`).
    pub queue_capacity: usize,
}

impl RunConfig {
    /// Adds a browser by id.
    #[must_use]
    pub fn with_browser(mut self, id: impl Into<BrowserId>) -> Self {
        self.browsers.push(BrowserConfig {
            id: id.into(),
            root_url: None,
        });
        self
    }

    /// Enables or disables coverage collection.
    #[must_use]
    pub fn with_coverage(mut self, enabled: bool) -> Self {
        self.coverage = enabled;
        self
    }

    /// Sets the per-listener queue capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Ids of all configured browsers, in declaration order.
    pub fn browser_ids(&self) -> Vec<BrowserId> {
        self.browsers.iter().map(|b| b.id.clone()).collect()
    }

    /// Returns `true` if coverage is collected for this run.
    #[inline]
    pub fn coverage_enabled(&self) -> bool {
        self.coverage
    }

    /// Returns a queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        self.queue_capacity.max(1)
    }
}

impl Default for RunConfig {
    /// Default configuration:
    ///
    /// - no browsers
    /// - `coverage = false`
    /// - `queue_capacity = 1024`
    fn default() -> Self {
        Self {
            browsers: Vec::new(),
            coverage: false,
            source: SuiteSource::default(),
            queue_capacity: 1024,
        }
    }
}
