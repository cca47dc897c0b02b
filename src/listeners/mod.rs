//! # Event listeners.
//!
//! This module provides the [`Listen`] trait and built-in implementations for
//! handling events delivered by an [`EventBus`](crate::EventBus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   RunController / session layer ── emit(Event) ──► EventBus ──► per-listener queue
//!                                                                     │
//!                                                                     ▼
//!                                                          Listen::on_event(&Event)
//!                                                                     │
//!                                               ┌──────────┬──────────┼──────────┐
//!                                               ▼          ▼          ▼          ▼
//!                                          LogWriter  ResultPipeline Reporter   ...
//! ```
//!
//! ## Implementing custom listeners
//! ```no_run
//! use snapvisor::{Event, Listen};
//! use async_trait::async_trait;
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Listen for FailureCounter {
//!     async fn on_event(&self, event: &Event) -> anyhow::Result<()> {
//!         if let Event::TestResult(result) = event {
//!             if !result.equal {
//!                 // count failure
//!             }
//!         }
//!         Ok(())
//!     }
//! }
//! ```

mod listen;
mod listen_fn;
#[cfg(feature = "logging")]
mod log;

pub use listen::Listen;
pub use listen_fn::ListenFn;
#[cfg(feature = "logging")]
pub use log::LogWriter;
