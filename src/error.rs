//! Error types used by the run controller and the event bus.
//!
//! This module defines two main error enums:
//!
//! - [`RunError`]: errors surfaced to the caller of [`RunController::run`](crate::RunController::run).
//! - [`ListenerError`]: errors raised by individual listeners while handling an event.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! [`RunError::failure_kind`] classifies a run failure by the stage that produced it.

use std::any::Any;

use thiserror::Error;

/// Stage class of a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// `StartRunner` veto or `prepare` failure; no suite was executed.
    Setup,
    /// The session layer failed while executing suites.
    Execution,
    /// `EndRunner` broadcast failed after the run itself succeeded.
    Finalization,
}

/// # Errors produced by a single listener.
///
/// A listener either returns an error from its handler or panics. During a
/// non-blocking `emit` these are only logged and signalled on the bus; during
/// `emit_and_wait` the first one to complete is returned to the caller.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListenerError {
    /// Listener handler returned an error.
    #[error("listener {listener} failed: {error}")]
    Failed {
        /// Listener name.
        listener: &'static str,
        /// The underlying error message (with its cause chain).
        error: String,
    },

    /// Listener handler panicked; the panic was caught by its worker.
    #[error("listener {listener} panicked: {info}")]
    Panicked {
        /// Listener name.
        listener: &'static str,
        /// Panic payload rendered as text.
        info: String,
    },
}

impl ListenerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use snapvisor::ListenerError;
    ///
    /// let err = ListenerError::Failed { listener: "html", error: "disk full".into() };
    /// assert_eq!(err.as_label(), "listener_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ListenerError::Failed { .. } => "listener_failed",
            ListenerError::Panicked { .. } => "listener_panicked",
        }
    }

    /// Name of the listener that produced the error.
    pub fn listener(&self) -> &'static str {
        match self {
            ListenerError::Failed { listener, .. } | ListenerError::Panicked { listener, .. } => {
                listener
            }
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ListenerError::Failed { error, .. } => format!("error: {error}"),
            ListenerError::Panicked { info, .. } => format!("panic: {info}"),
        }
    }
}

/// # Errors produced by a run.
///
/// Setup and execution failures are returned only after the finalize stage has
/// run. A finalize failure never hides an earlier one: both end up in
/// [`RunError::Compound`].
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum RunError {
    /// A `StartRunner` listener rejected the run.
    #[error("run vetoed at start: {0}")]
    Vetoed(#[source] ListenerError),

    /// The state processor failed to prepare.
    #[error("prepare failed: {error}")]
    Prepare {
        /// The underlying error message.
        error: String,
    },

    /// The session layer failed (or panicked) while running suites.
    #[error("session run failed: {error}")]
    Execution {
        /// The underlying error message.
        error: String,
    },

    /// An `EndRunner` listener failed.
    #[error("finalization failed: {0}")]
    Finalization(#[source] ListenerError),

    /// The run failed and its finalization failed as well.
    #[error("{original}; finalization also failed: {finalization}")]
    Compound {
        /// The failure that aborted the run.
        original: Box<RunError>,
        /// The failure raised while finalizing.
        finalization: Box<RunError>,
    },

    /// `run` was called on a controller that already ran.
    #[error("run controller already started")]
    AlreadyStarted,
}

impl RunError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use snapvisor::RunError;
    ///
    /// let err = RunError::Execution { error: "browser crashed".into() };
    /// assert_eq!(err.as_label(), "run_execution_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RunError::Vetoed(_) => "run_vetoed",
            RunError::Prepare { .. } => "run_prepare_failed",
            RunError::Execution { .. } => "run_execution_failed",
            RunError::Finalization(_) => "run_finalization_failed",
            RunError::Compound { .. } => "run_compound_failure",
            RunError::AlreadyStarted => "run_already_started",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RunError::Vetoed(e) => format!("vetoed by {}: {}", e.listener(), e.as_message()),
            RunError::Prepare { error } => format!("prepare: {error}"),
            RunError::Execution { error } => format!("execution: {error}"),
            RunError::Finalization(e) => {
                format!("finalization by {}: {}", e.listener(), e.as_message())
            }
            RunError::Compound {
                original,
                finalization,
            } => format!("{}; then {}", original.as_message(), finalization.as_message()),
            RunError::AlreadyStarted => "already started".to_string(),
        }
    }

    /// Classifies the failure by the stage that produced it.
    ///
    /// A [`RunError::Compound`] reports the kind of its original failure.
    /// [`RunError::AlreadyStarted`] counts as a setup failure.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            RunError::Vetoed(_) | RunError::Prepare { .. } | RunError::AlreadyStarted => {
                FailureKind::Setup
            }
            RunError::Execution { .. } => FailureKind::Execution,
            RunError::Finalization(_) => FailureKind::Finalization,
            RunError::Compound { original, .. } => original.failure_kind(),
        }
    }

    /// Combines the outcome of the run stages with the outcome of finalization.
    ///
    /// The original error always survives; a finalization error is attached to it.
    pub(crate) fn merge(
        outcome: Result<(), RunError>,
        finalized: Result<(), RunError>,
    ) -> Result<(), RunError> {
        match (outcome, finalized) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(original), Err(finalization)) => Err(RunError::Compound {
                original: Box::new(original),
                finalization: Box::new(finalization),
            }),
        }
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
