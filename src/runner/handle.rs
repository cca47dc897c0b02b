//! Runner handle carried by `StartRunner` / `EndRunner`.

use std::fmt;
use std::sync::Arc;

use crate::config::RunConfig;
use crate::events::EventBus;

/// Shared view of a runner, handed to listeners of awaited runner events.
///
/// Setup listeners (reporters) typically use [`bus`](Self::bus) during
/// `StartRunner` to subscribe to the rest of the run.
#[derive(Clone)]
pub struct RunnerRef {
    name: &'static str,
    config: Arc<RunConfig>,
    bus: EventBus,
}

impl RunnerRef {
    pub fn new(name: &'static str, config: Arc<RunConfig>, bus: EventBus) -> Self {
        Self { name, config, bus }
    }

    /// Runner name (`"run"` for the run controller).
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn config(&self) -> &Arc<RunConfig> {
        &self.config
    }

    /// Bus the runner publishes on.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

impl fmt::Debug for RunnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerRef")
            .field("name", &self.name)
            .field("browsers", &self.config.browser_ids())
            .finish()
    }
}
