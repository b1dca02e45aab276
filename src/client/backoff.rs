//! Reconnect policy with jittered exponential back-off.
//!
//! For attempt `n` (0-indexed):
//!
//! ```text
//! delay  = min(base * 2^n, max)
//! jitter = delay * (0.2 + r * 0.3)      r uniform in [0, 1)
//! wait   = delay + jitter
//! ```
//!
//! so every wait lies in `[1.2 * delay, 1.5 * delay]`.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default number of reconnect attempts before giving up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 8;

/// Default base delay.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1_000;

/// Default delay cap, applied before jitter.
pub const DEFAULT_MAX_RECONNECT_DELAY_MS: u64 = 12_000;

/// Smallest jitter, as a fraction of the capped delay.
const JITTER_MIN: f64 = 0.2;

/// Width of the jitter range on top of [`JITTER_MIN`].
const JITTER_SPAN: f64 = 0.3;

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Controls how a manager reconnects after an unexpected close.
///
/// Deserializes from the overlay's camelCase settings:
///
/// ```json
/// { "maxReconnectAttempts": 8, "reconnectDelayMs": 1000, "maxReconnectDelayMs": 12000 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Attempts made before giving up.
    #[serde(rename = "maxReconnectAttempts")]
    pub max_attempts: u32,

    /// Delay before the first attempt, in milliseconds.
    #[serde(rename = "reconnectDelayMs")]
    pub base_delay_ms: u64,

    /// Cap on the pre-jitter delay, in milliseconds.
    #[serde(rename = "maxReconnectDelayMs")]
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            base_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_RECONNECT_DELAY_MS,
        }
    }
}

impl ReconnectPolicy {
    /// Returns the capped delay for `attempt`, before jitter.
    #[must_use]
    pub fn raw_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay_ms = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    /// Returns the delay for `attempt` with the given jitter sample.
    ///
    /// `sample` is clamped to `[0, 1]`; `0` yields `1.2x`, `1` yields `1.5x`.
    #[must_use]
    pub fn jittered_delay(&self, attempt: u32, sample: f64) -> Duration {
        let delay_ms = self.raw_delay(attempt).as_millis() as f64;
        let jitter_ms = delay_ms * (JITTER_MIN + sample.clamp(0.0, 1.0) * JITTER_SPAN);
        Duration::from_millis((delay_ms + jitter_ms) as u64)
    }

    /// Returns a randomly jittered delay for `attempt`.
    pub fn delay_for_attempt<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        self.jittered_delay(attempt, rng.gen_range(0.0..1.0))
    }

    /// Whether `attempt` is past the budget.
    #[inline]
    #[must_use]
    pub const fn should_give_up(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the cap is below the base delay.
    pub fn validate(&self) -> Result<()> {
        if self.max_delay_ms < self.base_delay_ms {
            return Err(Error::config(format!(
                "maxReconnectDelayMs ({}) must not be below reconnectDelayMs ({})",
                self.max_delay_ms, self.base_delay_ms
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_default_policy_values() {
        let p = ReconnectPolicy::default();
        assert_eq!(p.max_attempts, 8);
        assert_eq!(p.base_delay_ms, 1_000);
        assert_eq!(p.max_delay_ms, 12_000);
    }

    #[test]
    fn test_raw_delay_doubles_then_caps() {
        let p = ReconnectPolicy::default();
        assert_eq!(p.raw_delay(0), Duration::from_millis(1_000));
        assert_eq!(p.raw_delay(1), Duration::from_millis(2_000));
        assert_eq!(p.raw_delay(3), Duration::from_millis(8_000));
        assert_eq!(p.raw_delay(4), Duration::from_millis(12_000));
        assert_eq!(p.raw_delay(200), Duration::from_millis(12_000));
    }

    #[test]
    fn test_first_attempt_window() {
        let p = ReconnectPolicy::default();
        assert_eq!(p.jittered_delay(0, 0.0), Duration::from_millis(1_200));
        assert_eq!(p.jittered_delay(0, 1.0), Duration::from_millis(1_500));
    }

    #[test]
    fn test_capped_attempt_window() {
        let p = ReconnectPolicy::default();
        assert_eq!(p.jittered_delay(4, 0.0), Duration::from_millis(14_400));
        assert_eq!(p.jittered_delay(4, 1.0), Duration::from_millis(18_000));
    }

    #[test]
    fn test_should_give_up() {
        let p = ReconnectPolicy {
            max_attempts: 3,
            ..Default::default()
        };
        assert!(!p.should_give_up(2));
        assert!(p.should_give_up(3));
        assert!(p.should_give_up(4));
    }

    #[test]
    fn test_zero_attempts_gives_up_immediately() {
        let p = ReconnectPolicy {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(p.should_give_up(0));
    }

    #[test]
    fn test_validate_rejects_cap_below_base() {
        let p = ReconnectPolicy {
            base_delay_ms: 5_000,
            max_delay_ms: 1_000,
            ..Default::default()
        };
        assert!(p.validate().is_err());
        assert!(ReconnectPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_deserialize_camel_case_with_defaults() {
        let p: ReconnectPolicy = serde_json::from_str(r#"{ "reconnectDelayMs": 250 }"#).unwrap();
        assert_eq!(p.base_delay_ms, 250);
        assert_eq!(p.max_attempts, DEFAULT_MAX_RECONNECT_ATTEMPTS);
        assert_eq!(p.max_delay_ms, DEFAULT_MAX_RECONNECT_DELAY_MS);
    }

    proptest! {
        #[test]
        fn prop_delay_within_jitter_window(
            attempt in 0u32..64,
            base in 1u64..5_000,
            extra in 0u64..60_000,
            seed in any::<u64>(),
        ) {
            let p = ReconnectPolicy { max_attempts: 8, base_delay_ms: base, max_delay_ms: base + extra };
            let mut rng = StdRng::seed_from_u64(seed);

            let raw = p.raw_delay(attempt).as_millis() as u64;
            let delay = p.delay_for_attempt(attempt, &mut rng).as_millis() as u64;

            prop_assert!(raw <= p.max_delay_ms);
            prop_assert!(delay >= raw * 12 / 10);
            prop_assert!(delay <= raw * 15 / 10 + 1);
            prop_assert!(delay <= p.max_delay_ms * 15 / 10 + 1);
        }
    }
}
