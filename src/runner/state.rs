//! # Run state machine.
//!
//! ```text
//! Created ──► Announced ──► Prepared ──► Executing ──► Finalized
//!    │            │            │                          ▲
//!    └────────────┴────────────┴──── (failure) ───────────┘
//! ```
//!
//! `Finalized` is terminal and reached exactly once per controller, whatever
//! stage failed.

use std::fmt;

/// Stage reached by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunState {
    /// Controller built, `run` not called yet.
    Created,
    /// `StartRunner` accepted and `Begin` published.
    Announced,
    /// State processor prepared.
    Prepared,
    /// Session layer running suites.
    Executing,
    /// Finalization done (terminal).
    Finalized,
}

impl RunState {
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Created => "created",
            RunState::Announced => "announced",
            RunState::Prepared => "prepared",
            RunState::Executing => "executing",
            RunState::Finalized => "finalized",
        }
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Finalized)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
