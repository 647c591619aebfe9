// crates/dispatchq/src/config.rs

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The dispatch resolution floor [`DelayedQueue`](crate::DelayedQueue) and
/// [`PriorityQueue`](crate::PriorityQueue) never go below: both their
/// `sync_tick` and `sort_window` are clamped up to at least this much.
pub const MIN_TICK: Duration = Duration::from_millis(500);

/// Tunables shared by the delayed/priority queue constructors.
///
/// Plain struct with a `Default` impl rather than a builder: there's no
/// nested or optional structure here to justify one, matching
/// `domain::config::core::CoreConfig`'s shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue name, surfaced in tracing fields. Empty string means unnamed.
    #[serde(default)]
    pub name: String,

    /// How often [`DelayedQueue`](crate::DelayedQueue) refreshes its view
    /// of wall-clock time. Clamped to [`MIN_TICK`].
    #[serde(default = "default_tick")]
    pub sync_tick: Duration,

    /// How often [`PriorityQueue`](crate::PriorityQueue) flushes its heap.
    /// Clamped to [`MIN_TICK`].
    #[serde(default = "default_tick")]
    pub sort_window: Duration,
}

fn default_tick() -> Duration {
    MIN_TICK
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            sync_tick: MIN_TICK,
            sort_window: MIN_TICK,
        }
    }
}

impl QueueConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns `sync_tick`, floored at [`MIN_TICK`].
    pub fn sync_tick(&self) -> Duration {
        self.sync_tick.max(MIN_TICK)
    }

    /// Returns `sort_window`, floored at [`MIN_TICK`].
    pub fn sort_window(&self) -> Duration {
        self.sort_window.max(MIN_TICK)
    }
}
