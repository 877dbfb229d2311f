//! Serializable fetcher configuration.
//!
//! [`FetchConfig`] carries the knobs that make sense outside of code: the
//! retry budget, the per-attempt timeout and the backoff schedule. Durations
//! are written as whole milliseconds.
//!
//! ```
//! use jsonfetch::FetchConfig;
//! use std::time::Duration;
//!
//! let config = FetchConfig::from_json_str(r#"{
//!     "max_retries": 5,
//!     "attempt_timeout_ms": 2000,
//!     "backoff": { "kind": "fixed", "delay_ms": 250 }
//! }"#).unwrap();
//!
//! assert_eq!(config.max_retries, 5);
//! assert_eq!(config.attempt_timeout, Some(Duration::from_secs(2)));
//! ```

use crate::{Backoff, BoundedRetry, FetchError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry budget, per-attempt timeout and backoff for a fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Retries allowed after the first attempt. Defaults to 3.
    pub max_retries: usize,

    /// Timeout applied to each attempt separately. `None` disables it.
    #[serde(rename = "attempt_timeout_ms", with = "option_duration_ms")]
    pub attempt_timeout: Option<Duration>,

    /// Delay schedule between attempts. Defaults to no delay.
    pub backoff: Backoff,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: BoundedRetry::DEFAULT_MAX_RETRIES,
            attempt_timeout: None,
            backoff: Backoff::Immediate,
        }
    }
}

impl FetchConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Configuration`] if the JSON is malformed or the
    /// values are inconsistent.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| FetchError::Configuration(format!("Invalid fetch config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the values can drive a fetcher.
    pub fn validate(&self) -> Result<()> {
        if self.attempt_timeout == Some(Duration::ZERO) {
            return Err(FetchError::Configuration(
                "Attempt timeout must be greater than zero".to_string(),
            ));
        }

        if let Backoff::Exponential {
            initial_delay,
            max_delay,
            ..
        } = &self.backoff
        {
            if initial_delay > max_delay {
                return Err(FetchError::Configuration(format!(
                    "Backoff initial delay {:?} exceeds max delay {:?}",
                    initial_delay, max_delay
                )));
            }
        }

        Ok(())
    }
}

/// Serde adapter writing a `Duration` as integer milliseconds.
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod option_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match duration {
            Some(duration) => super::duration_ms::serialize(duration, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
