//! Reconnect backoff policy value object.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponent ceiling; any larger value is already far beyond the cap.
const MAX_EXPONENT: u32 = 64;

/// Exponential backoff applied between reconnection attempts.
///
/// The delay after `n` counted attempts is
/// `initial_delay_ms * backoff_multiplier^(n - 1)`, capped at `max_delay_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Delay after the first unsuccessful attempt in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Maximum delay between attempts in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Growth factor per counted attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_initial_delay_ms() -> u64 {
    5000
}

fn default_max_delay_ms() -> u64 {
    300_000
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

impl BackoffPolicy {
    /// Create a backoff policy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate the wait before the next attempt, given the attempts counted so far.
    ///
    /// Zero counted attempts waits the initial delay.
    pub fn delay_for_attempt(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(MAX_EXPONENT) as i32;
        let max_delay = self.max_delay_ms as f64;
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);

        let delay_ms = if delay.is_finite() {
            delay.min(max_delay)
        } else {
            max_delay
        };

        Duration::from_millis(delay_ms.round() as u64)
    }

    /// Check the policy produces non-decreasing, bounded delays.
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0) {
            return Err(crate::Error::config(format!(
                "backoff_multiplier must be a finite value >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.initial_delay_ms == 0 {
            return Err(crate::Error::config("initial_delay_ms must be greater than 0"));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(crate::Error::config(
                "max_delay_ms must not be lower than initial_delay_ms",
            ));
        }
        Ok(())
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.initial_delay_ms, 5000);
        assert_eq!(policy.max_delay_ms, 300_000);
        assert_eq!(policy.backoff_multiplier, 1.5);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_delay_calculation() {
        let policy = BackoffPolicy::default();

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(5000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(7500));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(11250));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(16875));
    }

    #[test]
    fn test_zero_attempts_uses_initial_delay() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(5000));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let policy = BackoffPolicy::default();

        // 5000 * 1.5^9 is still below the cap
        assert_eq!(policy.delay_for_attempt(10), Duration::from_millis(192_217));
        assert_eq!(policy.delay_for_attempt(11), Duration::from_millis(288_325));
        assert_eq!(policy.delay_for_attempt(12), Duration::from_millis(300_000));
        assert_eq!(policy.delay_for_attempt(1000), Duration::from_millis(300_000));
        assert_eq!(policy.delay_for_attempt(u32::MAX), Duration::from_millis(300_000));
    }

    #[test]
    fn test_delay_is_monotonic_and_bounded() {
        let policy = BackoffPolicy::default();
        let mut previous = Duration::ZERO;
        for attempts in 0..200 {
            let delay = policy.delay_for_attempt(attempts);
            assert!(delay >= previous, "delay decreased at attempt {attempts}");
            assert!(delay <= Duration::from_millis(300_000));
            previous = delay;
        }
    }

    #[test]
    fn test_validate_rejects_shrinking_policy() {
        let policy = BackoffPolicy {
            backoff_multiplier: 0.5,
            ..Default::default()
        };
        assert!(policy.validate().is_err());

        let policy = BackoffPolicy {
            max_delay_ms: 10,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let policy: BackoffPolicy = serde_json::from_str(r#"{"max_delay_ms": 60000}"#).unwrap();
        assert_eq!(policy.initial_delay_ms, 5000);
        assert_eq!(policy.max_delay_ms, 60000);
    }
}
