//! Retry policy: decides redelivery backoff.

use std::time::Duration;

/// Exponential backoff applied when a lease expires without an ack.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first redelivery.
    pub base_delay: Duration,

    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, multiplier: f64) -> Self {
        Self {
            base_delay,
            multiplier,
        }
    }

    /// Delay before redelivering a message that has been delivered
    /// `attempts` times: `base_delay * multiplier^(attempts - 1)`.
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(delay_secs).unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), 2.0)
    }
}
