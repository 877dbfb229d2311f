//! Delays between attempts.
//!
//! The recovery policy decides *whether* to retry; the backoff decides *when*.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long to wait before each retry.
///
/// # Examples
///
/// ```
/// use jsonfetch::Backoff;
/// use std::time::Duration;
///
/// // Retry straight away
/// let immediate = Backoff::Immediate;
///
/// // 100ms, 200ms, 400ms, ... capped at 30s
/// let exponential = Backoff::Exponential {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(30),
///     jitter: true,
/// };
///
/// // 1s between every attempt
/// let fixed = Backoff::Fixed {
///     delay: Duration::from_secs(1),
/// };
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Retry without waiting.
    #[default]
    Immediate,

    /// Wait the same delay before every retry.
    Fixed {
        /// The delay between attempts.
        #[serde(rename = "delay_ms", with = "crate::config::duration_ms")]
        delay: Duration,
    },

    /// Wait `initial_delay * 2^(retry - 1)`, capped at `max_delay`.
    ///
    /// With `jitter`, each delay is scaled by a random factor in [0.5, 1.0].
    Exponential {
        /// The delay before the first retry.
        #[serde(rename = "initial_delay_ms", with = "crate::config::duration_ms")]
        initial_delay: Duration,
        /// The maximum delay between retries.
        #[serde(rename = "max_delay_ms", with = "crate::config::duration_ms")]
        max_delay: Duration,
        /// Whether to add random jitter to delays.
        #[serde(default)]
        jitter: bool,
    },
}

impl Backoff {
    /// Returns the delay before the given retry (1-indexed, so 1 = first retry).
    pub fn delay_for_retry(&self, retry: usize) -> Duration {
        match self {
            Backoff::Immediate => Duration::ZERO,
            Backoff::Fixed { delay } => *delay,
            Backoff::Exponential {
                initial_delay,
                max_delay,
                jitter,
            } => {
                let exponent = retry.saturating_sub(1).min(u32::MAX as usize) as u32;
                let multiplier = 2u32.saturating_pow(exponent);
                let delay = initial_delay.saturating_mul(multiplier).min(*max_delay);

                if *jitter {
                    let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
                    delay.mul_f64(jitter_factor)
                } else {
                    delay
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_delays() {
        let backoff = Backoff::Exponential {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            jitter: false,
        };

        assert_eq!(backoff.delay_for_retry(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for_retry(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for_retry(3), Duration::from_millis(400));
        assert_eq!(backoff.delay_for_retry(4), Duration::from_millis(800));
        assert_eq!(backoff.delay_for_retry(5), Duration::from_secs(1));
        assert_eq!(backoff.delay_for_retry(64), Duration::from_secs(1));
    }

    #[test]
    fn test_exponential_jitter_stays_in_range() {
        let backoff = Backoff::Exponential {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter: true,
        };

        for _ in 0..50 {
            let delay = backoff.delay_for_retry(3);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(400));
        }
    }

    #[test]
    fn test_fixed_and_immediate() {
        let fixed = Backoff::Fixed {
            delay: Duration::from_secs(1),
        };
        assert_eq!(fixed.delay_for_retry(1), Duration::from_secs(1));
        assert_eq!(fixed.delay_for_retry(7), Duration::from_secs(1));

        assert_eq!(Backoff::Immediate.delay_for_retry(1), Duration::ZERO);
    }
}
