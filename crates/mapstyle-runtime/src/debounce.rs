//! Debounced triggers with a maximum wait.
//!
//! Triggers arriving in quick succession coalesce into one firing. The
//! firing happens `debounce_ms` after the last trigger, but never later than
//! `max_wait_ms` after the first trigger of the burst.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Debounce timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Quiet period after the last trigger, in milliseconds.
    pub debounce_ms: u64,

    /// Longest delay since the first pending trigger, in milliseconds.
    pub max_wait_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 250,
            max_wait_ms: 1000,
        }
    }
}

impl DebounceConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms.max(self.debounce_ms))
    }
}

/// Tracks the pending burst of triggers.
#[derive(Debug, Clone, Default)]
pub struct DebounceTracker {
    /// First trigger since the last firing.
    first_trigger: Option<Instant>,

    /// Most recent trigger.
    last_trigger: Option<Instant>,
}

impl DebounceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.last_trigger.is_some()
    }

    pub fn trigger(&mut self) {
        self.trigger_at(Instant::now());
    }

    pub fn trigger_at(&mut self, now: Instant) {
        self.last_trigger = Some(now);
        if self.first_trigger.is_none() {
            self.first_trigger = Some(now);
        }
    }

    /// When the pending burst should fire, `None` when nothing is pending.
    pub fn deadline(&self, config: &DebounceConfig) -> Option<Instant> {
        match (self.first_trigger, self.last_trigger) {
            (Some(first), Some(last)) => {
                Some((last + config.debounce()).min(first + config.max_wait()))
            }
            _ => None,
        }
    }

    pub fn is_due(&self, now: Instant, config: &DebounceConfig) -> bool {
        self.deadline(config).is_some_and(|deadline| now >= deadline)
    }

    /// Forget the pending burst after it fired.
    pub fn clear(&mut self) {
        self.first_trigger = None;
        self.last_trigger = None;
    }
}
