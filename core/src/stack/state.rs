use tracing::{debug, warn};

use crate::config::StateConfig;
use crate::error::Result;
use crate::vm::{Machine, StatsSnapshot};

use super::context::Context;

/// An interpreter instance: one machine and its configuration.
pub struct State {
    vm: Machine,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    pub fn new() -> Self {
        Self::with_config(StateConfig::default())
    }

    pub fn with_config(config: StateConfig) -> Self {
        debug!(target: "stackbind::vm", ?config, "new state");
        Self { vm: Machine::new(config) }
    }

    pub fn config(&self) -> &StateConfig {
        self.vm.config()
    }

    pub fn machine(&self) -> &Machine {
        &self.vm
    }

    /// Runs `f` in a root context opened at the current top. Slots `f` leaves
    /// behind are dropped.
    pub fn run<R>(&self, f: impl FnOnce(&Context<'_>) -> Result<R>) -> Result<R> {
        let base = self.vm.top();
        let result = {
            let ctx = Context::enter(&self.vm, base);
            f(&ctx)
        };
        let left = self.vm.top().saturating_sub(base);
        if left > 0 {
            warn!(target: "stackbind::vm", left, "root scope left values on the stack");
            self.vm.pop(left);
        }
        result
    }

    pub fn depth(&self) -> usize {
        self.vm.top()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.vm.stats().snapshot()
    }

    pub fn reset_stats(&self) {
        self.vm.stats().reset();
    }
}
