//! Exponential backoff policy shared by network and storage retries.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff with deterministic jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backoff {
    /// Maximum retry attempts before giving up.
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds).
    pub max_delay_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 200,
            max_delay_ms: 10_000,
        }
    }
}

impl Backoff {
    /// Returns true if another attempt is allowed after `attempts` failures.
    #[must_use]
    pub const fn allows(&self, attempts: u32) -> bool {
        attempts < self.max_retries
    }

    /// Calculates the delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        // base_delay * 2^attempt, capped
        let exp_delay = self.base_delay_ms.saturating_mul(1u64 << attempt.min(10));
        let capped_delay = exp_delay.min(self.max_delay_ms);

        // ±25% jitter derived from the attempt number
        let jitter_range = capped_delay / 4;
        let jitter = if jitter_range > 0 {
            let offset = (u64::from(attempt) * 17) % (jitter_range * 2);
            offset as i64 - jitter_range as i64
        } else {
            0
        };

        let final_delay = (capped_delay as i64 + jitter).max(1) as u64;
        Duration::from_millis(final_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_default() {
        let backoff = Backoff::default();
        assert_eq!(backoff.max_retries, 5);
        assert!(backoff.allows(4));
        assert!(!backoff.allows(5));
    }

    #[test]
    fn test_backoff_delay_calculation() {
        let backoff = Backoff {
            max_retries: 10,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
        };

        let delay1 = backoff.delay(1);
        assert!(delay1.as_millis() >= 750 && delay1.as_millis() <= 1250);

        let delay2 = backoff.delay(2);
        assert!(delay2.as_millis() >= 1500 && delay2.as_millis() <= 2500);

        let delay_high = backoff.delay(20);
        assert!(delay_high.as_millis() <= 37_500);
    }

    #[test]
    fn test_backoff_zero_base() {
        let backoff = Backoff {
            max_retries: 3,
            base_delay_ms: 0,
            max_delay_ms: 0,
        };
        assert_eq!(backoff.delay(3), Duration::from_millis(1));
    }
}
