use std::path::Path;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Which operation kinds still fire when they are dropped unconsumed.
///
/// Calls are not listed: they are always non-discardable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscardPolicy {
    /// Indexing through `__index` (raw reads are never affected).
    pub index: bool,
    pub arithmetic: bool,
    pub concat: bool,
}

impl Default for DiscardPolicy {
    fn default() -> Self {
        Self {
            index: false,
            arithmetic: true,
            concat: true,
        }
    }
}

impl DiscardPolicy {
    /// Every configurable kind non-discardable.
    pub const fn strict() -> Self {
        Self {
            index: true,
            arithmetic: true,
            concat: true,
        }
    }

    /// Only calls fire on discard.
    pub const fn relaxed() -> Self {
        Self {
            index: false,
            arithmetic: false,
            concat: false,
        }
    }
}

/// Settings for a [`State`](crate::State).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Panic when an anchor is released while not on top of the stack.
    pub watch_stack: bool,
    /// Nested native calls allowed before `stack overflow` is raised.
    pub max_call_depth: usize,
    pub discard: DiscardPolicy,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            watch_stack: cfg!(debug_assertions),
            max_call_depth: 200,
            discard: DiscardPolicy::default(),
        }
    }
}

impl StateConfig {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let config: StateConfig = toml::from_str(input).map_err(|e| anyhow!("invalid state config: {e}"))?;
        if config.max_call_depth == 0 {
            return Err(anyhow!("invalid state config: max_call_depth must be positive"));
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| anyhow!("cannot read {}: {e}", path.display()))?;
        Self::from_toml_str(&text)
    }

    pub fn with_discard(mut self, discard: DiscardPolicy) -> Self {
        self.discard = discard;
        self
    }

    pub fn with_watch_stack(mut self, watch: bool) -> Self {
        self.watch_stack = watch;
        self
    }
}
