//! # Function-backed listener (`ListenFn`)
//!
//! [`ListenFn`] wraps a closure `F: Fn(Event) -> Fut`, producing a fresh
//! future per delivered event. The event is passed by value (payloads are
//! `Arc`-shared, so this is cheap) and the future owns it.
//!
//! ## Example
//! ```rust
//! use snapvisor::{Event, EventBus, EventKind};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! bus.on(EventKind::End, "announcer", |_ev: Event| async move {
//!     println!("run finished");
//!     Ok(())
//! });
//! bus.emit_and_wait(Event::End).await.unwrap();
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::events::Event;
use crate::listeners::Listen;

/// Function-backed listener implementation.
#[derive(Debug)]
pub struct ListenFn<F> {
    name: &'static str,
    f: F,
}

impl<F> ListenFn<F> {
    /// Creates a new function-backed listener.
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }

    /// Creates the listener and returns it as a shared handle.
    pub fn arc(name: &'static str, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Listen for ListenFn<F>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn on_event(&self, event: &Event) -> anyhow::Result<()> {
        (self.f)(event.clone()).await
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
