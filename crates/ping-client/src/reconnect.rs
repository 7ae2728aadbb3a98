//! Reconnect backoff schedule.

use std::time::Duration;

/// First retry delay.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Upper bound on the retry delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Reconnect policy for a link task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Delays double up to this bound.
    pub max_backoff: Duration,
    /// Give up after this many consecutive failures. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            max_attempts: None,
        }
    }
}

/// Exponential backoff state. Reset after every successful open.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: ReconnectConfig,
    attempts: u32,
}

impl Backoff {
    /// Start a fresh schedule.
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config, attempts: 0 }
    }

    /// Consecutive failures so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay before the next attempt, or `None` once attempts run out.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.config.max_attempts.is_some_and(|max| self.attempts >= max) {
            return None;
        }
        let factor = 2u32.saturating_pow(self.attempts.min(16));
        self.attempts = self.attempts.saturating_add(1);
        Some(self.config.initial_backoff.saturating_mul(factor).min(self.config.max_backoff))
    }

    /// Forget past failures.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
