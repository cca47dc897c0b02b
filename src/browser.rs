//! Browser identifiers.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// External identifier of an execution environment (a configured browser).
///
/// Results, lifecycle events and the coverage report are all partitioned by it.
/// Cheap to clone.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrowserId(Arc<str>);

impl BrowserId {
    /// Creates an id from any string.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Borrows the id as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BrowserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BrowserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for BrowserId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for BrowserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
