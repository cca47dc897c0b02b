//! # Core listener trait
//!
//! `Listen` is the extension point for plugging event handlers into a bus.
//! Each subscription is driven by a dedicated worker loop fed by a bounded
//! queue owned by the [`EventBus`](crate::EventBus).
//!
//! ## Contract
//! - Implementations may be slow (I/O, report writing); they do **not** block
//!   the emitter of a non-awaited event nor other listeners.
//! - Returning an error is how a listener vetoes an awaited event
//!   (`StartRunner`) or reports a failed flush (`EndRunner`).
//! - Each listener **may declare** its queue capacity via
//!   [`Listen::queue_capacity`]; otherwise the bus default applies.
//! - Listeners that must see every event (bus bridges, coverage attribution)
//!   declare [`Listen::lossless`] and get an unbounded queue instead.

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event listeners.
///
/// Called from a listener-dedicated worker task. Implementations should avoid
/// blocking the async runtime (prefer async I/O and cooperative waits).
#[async_trait]
pub trait Listen: Send + Sync + 'static {
    /// Handle a single event for this listener.
    ///
    /// Only events of the kinds this listener was subscribed with are delivered.
    async fn on_event(&self, event: &Event) -> anyhow::Result<()>;

    /// Human-readable name (for logs and error signals).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this listener's queue (`None` = bus default).
    ///
    /// On overflow of a non-awaited event, the event is **dropped** for this listener.
    /// Ignored for lossless listeners.
    fn queue_capacity(&self) -> Option<usize> {
        None
    }

    /// Whether this listener must receive every event.
    ///
    /// A lossless listener gets an unbounded queue: `emit` never drops an event
    /// for it, at the cost of unbounded memory if it falls behind.
    fn lossless(&self) -> bool {
        false
    }
}
