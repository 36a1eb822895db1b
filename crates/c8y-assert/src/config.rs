//! Configuration of the assertion context

use c8y_assert_core::ConfigError;
use c8y_assert_core::decorate::ASSERTION_PATTERN;
use c8y_assert_core::retry::{RetryOptions, duration_from_secs};
use std::time::Duration;

/// Device id used when an assertion is not given a source.
pub const ENV_DEVICE_ID: &str = "C8Y_DEVICE_ID";
/// Default wait interval in seconds.
pub const ENV_WAIT: &str = "C8Y_ASSERT_WAIT";
/// Default timeout in seconds.
pub const ENV_TIMEOUT: &str = "C8Y_ASSERT_TIMEOUT";
/// Pattern selecting the supervised members.
pub const ENV_PATTERN: &str = "C8Y_ASSERT_PATTERN";

/// Settings of an [`AssertContext`](crate::AssertContext).
///
/// Unset values fall back to no device, the built-in retry defaults
/// (`wait = 2s`, `timeout = 30s`) and the `^assert_.+` member pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssertConfig {
    /// Device the assertions target by default
    pub device_id: Option<String>,

    /// Retry defaults of every supervised member
    pub retry: RetryOptions,

    /// Pattern selecting the supervised members
    pub member_pattern: Option<String>,
}

impl AssertConfig {
    /// Empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the device id.
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Set the default wait interval.
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.retry.wait = Some(wait);
        self
    }

    /// Set the default timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.retry.timeout = Some(timeout);
        self
    }

    /// Set the member pattern.
    pub fn with_member_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.member_pattern = Some(pattern.into());
        self
    }

    /// The member pattern, or `^assert_.+`.
    pub fn member_pattern(&self) -> &str {
        self.member_pattern.as_deref().unwrap_or(ASSERTION_PATTERN)
    }

    /// Load configuration from environment variables.
    ///
    /// This will look for:
    /// - `C8Y_DEVICE_ID` for the default device
    /// - `C8Y_ASSERT_WAIT` for the wait interval (seconds, fractions allowed)
    /// - `C8Y_ASSERT_TIMEOUT` for the timeout (seconds, fractions allowed)
    /// - `C8Y_ASSERT_PATTERN` for the member pattern
    ///
    /// Empty values count as unset. Numbers that cannot be read as a
    /// non-negative amount of seconds are reported as [`ConfigError`].
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), with a `.env` file as fallback.
    ///
    /// Variables set in the process environment win over the file.
    #[cfg(feature = "env")]
    pub fn from_env_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let invalid = |err: dotenvy::Error| {
            ConfigError::invalid_value(path.display().to_string(), err.to_string())
        };

        let mut file = std::collections::HashMap::new();
        for item in dotenvy::from_path_iter(path).map_err(invalid)? {
            let (key, value) = item.map_err(invalid)?;
            file.insert(key, value);
        }

        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| file.get(key).cloned()))
    }

    #[cfg_attr(not(feature = "env"), allow(dead_code))]
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let seconds = |key: &str| -> Result<Option<Duration>, ConfigError> {
            let Some(value) = read(key) else {
                return Ok(None);
            };
            let secs = value.trim().parse::<f64>().map_err(|_| {
                ConfigError::invalid_value(key, format!("{value:?} is not a number of seconds"))
            })?;
            duration_from_secs(key, secs).map(Some)
        };

        let config = Self {
            device_id: read(ENV_DEVICE_ID),
            retry: RetryOptions {
                wait: seconds(ENV_WAIT)?,
                timeout: seconds(ENV_TIMEOUT)?,
            },
            member_pattern: read(ENV_PATTERN),
        };

        tracing::debug!(
            device_id = config.device_id.as_deref(),
            wait = ?config.retry.wait,
            timeout = ?config.retry.timeout,
            pattern = config.member_pattern(),
            "loaded assertion configuration"
        );
        Ok(config)
    }

    /// Merge this configuration with another, with the other taking precedence.
    pub fn merge(mut self, other: AssertConfig) -> Self {
        if other.device_id.is_some() {
            self.device_id = other.device_id;
        }
        self.retry = other.retry.or(self.retry);
        if other.member_pattern.is_some() {
            self.member_pattern = other.member_pattern;
        }
        self
    }
}
