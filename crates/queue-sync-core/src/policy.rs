//! # Reconnect Backoff Policy
//!
//! Exponential backoff configuration for push reconnection attempts, plus the
//! per-instance failure counter that drives it.
//!
//! The default policy produces the delay sequence 1000, 2000, 4000, 8000,
//! 16000 ms for attempts 0 through 4, capped at 30000 ms for every attempt
//! after that. Jitter is opt-in and disabled by default so the sequence stays
//! exact.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ReconnectConfig;

/// Backoff policy for push reconnection.
///
/// # Examples
///
/// ```rust
/// use queue_sync_core::ReconnectPolicy;
/// use std::time::Duration;
///
/// let policy = ReconnectPolicy::default();
/// assert_eq!(policy.calculate_delay(0), Duration::from_millis(1000));
/// assert_eq!(policy.calculate_delay(3), Duration::from_millis(8000));
/// assert_eq!(policy.calculate_delay(10), Duration::from_millis(30000));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Consecutive failures tolerated before push is abandoned permanently
    pub max_attempts: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound on any computed delay
    pub max_delay: Duration,

    /// Multiplier applied per attempt (2.0 doubles the delay each time)
    pub backoff_multiplier: f64,

    /// Whether to add random jitter to computed delays
    pub use_jitter: bool,

    /// Jitter range as a fraction of the delay (0.25 = +/-25%)
    pub jitter_percent: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30000),
            backoff_multiplier: 2.0,
            use_jitter: false,
            jitter_percent: 0.25,
        }
    }
}

impl ReconnectPolicy {
    /// Create a policy with explicit parameters and no jitter.
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Consecutive failures tolerated before giving up
    /// * `base_delay` - Delay before the first retry
    /// * `max_delay` - Upper bound on any delay
    /// * `backoff_multiplier` - Delay growth factor per attempt
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            backoff_multiplier,
            use_jitter: false,
            jitter_percent: 0.25,
        }
    }

    /// Build a policy from the reconnect configuration section
    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_multiplier: 2.0,
            use_jitter: config.jitter_enabled,
            jitter_percent: 0.25,
        }
    }

    /// Enable jitter with the default range.
    ///
    /// Jitter spreads reconnect storms across clients but makes delays
    /// non-deterministic, so it stays off unless asked for.
    pub fn with_jitter(mut self) -> Self {
        self.use_jitter = true;
        self
    }

    /// Enable jitter with an explicit range, clamped to [0.0, 1.0]
    pub fn with_jitter_percent(mut self, jitter_percent: f64) -> Self {
        self.use_jitter = true;
        self.jitter_percent = jitter_percent.clamp(0.0, 1.0);
        self
    }

    /// Compute the delay before retry number `attempt` (0-based).
    ///
    /// The raw delay is `base_delay * backoff_multiplier^attempt`, capped at
    /// `max_delay`, with jitter applied afterwards when enabled.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_secs =
            self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let delay = Duration::from_secs_f64(delay_secs.min(self.max_delay.as_secs_f64()));

        if self.use_jitter {
            self.add_jitter(delay)
        } else {
            delay
        }
    }

    /// Whether another retry is allowed after `failures` consecutive errors
    pub fn allows_retry(&self, failures: u32) -> bool {
        failures < self.max_attempts
    }

    /// Apply random jitter of +/- `jitter_percent` to a delay
    fn add_jitter(&self, delay: Duration) -> Duration {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        let jitter_range = delay.as_secs_f64() * self.jitter_percent;
        let jitter = rng.gen_range(-jitter_range..=jitter_range);

        Duration::from_secs_f64((delay.as_secs_f64() + jitter).max(0.0))
    }
}

/// Consecutive-failure counter for one push lifecycle.
///
/// The counter increases on every transport error and resets to zero on any
/// successful delivery. Once it reaches the policy's `max_attempts` the push
/// path is abandoned for the remainder of the instance's lifetime.
///
/// # Examples
///
/// ```rust
/// use queue_sync_core::{ReconnectPolicy, ReconnectState};
/// use std::time::Duration;
///
/// let policy = ReconnectPolicy::default();
/// let mut state = ReconnectState::new();
///
/// assert_eq!(state.record_failure(), 1);
/// assert!(!state.is_exhausted(&policy));
/// assert_eq!(state.next_delay(&policy), Duration::from_millis(1000));
///
/// state.reset();
/// assert_eq!(state.failures(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconnectState {
    failures: u32,
}

impl ReconnectState {
    /// Create a counter with zero recorded failures
    pub fn new() -> Self {
        Self { failures: 0 }
    }

    /// Record one consecutive failure and return the new count
    pub fn record_failure(&mut self) -> u32 {
        self.failures = self.failures.saturating_add(1);
        self.failures
    }

    /// Reset the counter after a successful delivery
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Number of consecutive failures recorded so far
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Whether the policy's failure budget is spent
    pub fn is_exhausted(&self, policy: &ReconnectPolicy) -> bool {
        self.failures >= policy.max_attempts
    }

    /// Delay before the retry that follows the most recent failure.
    ///
    /// Failure number `n` schedules retry number `n - 1` in the policy's
    /// 0-based sequence, so the first failure waits `base_delay`. Only
    /// meaningful after at least one recorded failure.
    pub fn next_delay(&self, policy: &ReconnectPolicy) -> Duration {
        policy.calculate_delay(self.failures.saturating_sub(1))
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
