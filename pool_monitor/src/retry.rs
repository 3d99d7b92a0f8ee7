use std::time::Duration;

/// How long the controller waits between cycles, and how hard it tries within one.
///
/// Waiting for the next epoch is not a failure and always uses `idle_interval`. Failed cycles
/// back off exponentially from `initial_backoff` up to `max_backoff`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub idle_interval: Duration,
    /// Attempts per state fetch within a single cycle.
    pub fetch_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_secs(5),
            fetch_attempts: 2,
            initial_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay after the `consecutive_failures`-th failed cycle in a row (counting from 1).
    pub fn backoff(&self, consecutive_failures: u32) -> Duration {
        let exponent = consecutive_failures.saturating_sub(1).min(31);
        self.initial_backoff
            .checked_mul(1u32 << exponent)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }
}
