//! # Result records.
//!
//! Three record types flow from the session layer to reporters:
//! - [`TestResult`]: outcome of comparing a fresh screenshot with its reference
//! - [`CaptureResult`]: a new reference image was captured
//! - [`UpdateResult`]: decision taken when updating a reference image
//!
//! All of them carry a browser id and an optional coverage snapshot, exposed
//! through [`ResultRecord`] so coverage attribution never depends on the variant.

use std::path::PathBuf;

use crate::browser::BrowserId;
use crate::coverage::CoverageSnapshot;

/// Fields shared by every result record.
pub trait ResultRecord: Send + Sync + 'static {
    /// Browser that produced the record.
    fn browser_id(&self) -> &BrowserId;

    /// Coverage collected while producing the record, if any.
    fn coverage(&self) -> Option<&CoverageSnapshot>;
}

/// Screenshot comparison result for one state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub browser_id: BrowserId,
    pub session_id: Option<String>,
    pub suite: Vec<String>,
    pub state: String,
    pub reference_path: PathBuf,
    pub current_path: PathBuf,
    /// `true` if the screenshots matched.
    pub equal: bool,
    pub coverage: Option<CoverageSnapshot>,
}

/// New reference image captured for one state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureResult {
    pub browser_id: BrowserId,
    pub suite: Vec<String>,
    pub state: String,
    pub image_path: PathBuf,
    pub coverage: Option<CoverageSnapshot>,
}

/// Reference image update decision for one state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    pub browser_id: BrowserId,
    pub suite: Vec<String>,
    pub state: String,
    pub reference_path: PathBuf,
    /// `false` if the reference was already up to date.
    pub updated: bool,
    pub coverage: Option<CoverageSnapshot>,
}

macro_rules! impl_result_record {
    ($($ty:ty),+ $(,)?) => {$(
        impl ResultRecord for $ty {
            #[inline]
            fn browser_id(&self) -> &BrowserId {
                &self.browser_id
            }

            #[inline]
            fn coverage(&self) -> Option<&CoverageSnapshot> {
                self.coverage.as_ref()
            }
        }
    )+};
}

impl_result_record!(TestResult, CaptureResult, UpdateResult);
