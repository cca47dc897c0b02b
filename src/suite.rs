//! # Suites and states.
//!
//! A [`SuiteCollection`] is the ordered set of [`Suite`]s a run executes; each
//! suite holds its [`State`]s (one screenshot check each) in declaration order.
//! Collections are built by whoever reads the suite source; the run controller
//! only counts states and hands the collection to the session layer.
//!
//! ## Example
//! ```
//! use snapvisor::{State, Suite, SuiteCollection};
//!
//! let suites = SuiteCollection::new(vec![
//!     Suite::new("header").with_state(State::new("plain")).with_state(State::new("hovered")),
//!     Suite::new("footer").with_state(State::new("plain")),
//! ]);
//! assert_eq!(suites.total_states(), 3);
//! ```

use crate::browser::BrowserId;

/// One screenshot check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub name: String,
    /// Browsers this state is skipped in.
    pub skipped_in: Vec<BrowserId>,
}

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            skipped_in: Vec::new(),
        }
    }

    /// Marks the state as skipped in `browser`.
    #[must_use]
    pub fn skip_in(mut self, browser: impl Into<BrowserId>) -> Self {
        self.skipped_in.push(browser.into());
        self
    }

    pub fn is_skipped_in(&self, browser: &BrowserId) -> bool {
        self.skipped_in.contains(browser)
    }
}

/// Named group of ordered states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    /// Full path, outermost suite first; the last element is this suite's name.
    pub path: Vec<String>,
    pub states: Vec<State>,
}

impl Suite {
    /// Creates a top-level suite.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            path: vec![name.into()],
            states: Vec::new(),
        }
    }

    /// Creates a suite nested in `parent`.
    pub fn nested(parent: &Suite, name: impl Into<String>) -> Self {
        let mut path = parent.path.clone();
        path.push(name.into());
        Self {
            path,
            states: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: State) -> Self {
        self.states.push(state);
        self
    }

    pub fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }
}

/// Ordered collection of suites for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteCollection {
    suites: Vec<Suite>,
}

impl SuiteCollection {
    pub fn new(suites: Vec<Suite>) -> Self {
        Self { suites }
    }

    pub fn push(&mut self, suite: Suite) {
        self.suites.push(suite);
    }

    /// All suites, in order.
    pub fn all_suites(&self) -> &[Suite] {
        &self.suites
    }

    /// Sum of state counts across every suite.
    pub fn total_states(&self) -> usize {
        self.suites.iter().map(|s| s.states.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }
}

impl FromIterator<Suite> for SuiteCollection {
    fn from_iter<I: IntoIterator<Item = Suite>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
