//! Retry policy and per-call overrides.

use crate::error::ConfigError;
use std::time::Duration;

/// Default pause between attempts.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(2);

/// Default total time budget of a supervised call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The `(wait_interval, timeout)` pair governing one supervised call.
///
/// A policy is always valid: the wait interval is positive. Build one with
/// [`RetryPolicy::new`] or resolve it from [`RetryOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    wait_interval: Duration,
    timeout: Duration,
}

impl RetryPolicy {
    /// Create a policy, rejecting a zero wait interval.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use c8y_assert_core::retry::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new(Duration::from_millis(500), Duration::from_secs(10)).unwrap();
    /// assert_eq!(policy.timeout(), Duration::from_secs(10));
    ///
    /// assert!(RetryPolicy::new(Duration::ZERO, Duration::from_secs(10)).is_err());
    /// ```
    pub fn new(wait_interval: Duration, timeout: Duration) -> Result<Self, ConfigError> {
        if wait_interval.is_zero() {
            return Err(ConfigError::ZeroWait);
        }
        Ok(Self {
            wait_interval,
            timeout,
        })
    }

    /// Pause between two attempts.
    pub fn wait_interval(&self) -> Duration {
        self.wait_interval
    }

    /// Total time budget measured from the first attempt.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for RetryPolicy {
    /// `wait_interval = 2s`, `timeout = 30s`.
    fn default() -> Self {
        Self {
            wait_interval: DEFAULT_WAIT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Optional `wait` / `timeout` overrides.
///
/// Every supervised member accepts one of these next to its own arguments.
/// Unset fields fall back to the component defaults and then to
/// [`DEFAULT_WAIT`] / [`DEFAULT_TIMEOUT`].
///
/// # Examples
///
/// ```rust
/// use c8y_assert_core::retry::RetryOptions;
/// use std::time::Duration;
///
/// let defaults = RetryOptions::new().timeout(Duration::from_secs(60));
/// let call = RetryOptions::new().wait(Duration::from_millis(250));
///
/// let policy = call.resolve(&defaults).unwrap();
/// assert_eq!(policy.wait_interval(), Duration::from_millis(250));
/// assert_eq!(policy.timeout(), Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryOptions {
    /// Pause between attempts
    pub wait: Option<Duration>,
    /// Total time budget
    pub timeout: Option<Duration>,
}

impl RetryOptions {
    /// No overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the wait interval.
    pub fn wait(mut self, wait: Duration) -> Self {
        self.wait = Some(wait);
        self
    }

    /// Override the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override both values from fractional seconds.
    pub fn from_secs_f64(wait: f64, timeout: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            wait: Some(duration_from_secs("wait", wait)?),
            timeout: Some(duration_from_secs("timeout", timeout)?),
        })
    }

    /// Whether neither value is set.
    pub fn is_empty(&self) -> bool {
        self.wait.is_none() && self.timeout.is_none()
    }

    /// Fill unset values from `fallback`.
    pub fn or(self, fallback: RetryOptions) -> RetryOptions {
        RetryOptions {
            wait: self.wait.or(fallback.wait),
            timeout: self.timeout.or(fallback.timeout),
        }
    }

    /// Layer these overrides over `defaults` and the built-in defaults.
    pub fn resolve(&self, defaults: &RetryOptions) -> Result<RetryPolicy, ConfigError> {
        let merged = self.or(*defaults);
        RetryPolicy::new(
            merged.wait.unwrap_or(DEFAULT_WAIT),
            merged.timeout.unwrap_or(DEFAULT_TIMEOUT),
        )
    }
}

/// Convert fractional seconds into a [`Duration`].
///
/// Negative, NaN and infinite values are rejected with a [`ConfigError`]
/// naming `key`.
pub fn duration_from_secs(key: &str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::invalid_value(key, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.wait_interval(), Duration::from_secs(2));
        assert_eq!(policy.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_timeout_is_valid() {
        let policy = RetryPolicy::new(Duration::from_millis(10), Duration::ZERO).unwrap();
        assert_eq!(policy.timeout(), Duration::ZERO);
    }

    #[test]
    fn test_zero_wait_is_rejected() {
        assert_eq!(
            RetryPolicy::new(Duration::ZERO, Duration::from_secs(1)),
            Err(ConfigError::ZeroWait)
        );
        assert_eq!(
            RetryOptions::new()
                .wait(Duration::ZERO)
                .resolve(&RetryOptions::new()),
            Err(ConfigError::ZeroWait)
        );
    }

    #[rstest]
    #[case::nothing_set(RetryOptions::new(), RetryOptions::new(), 2_000, 30_000)]
    #[case::defaults_only(
        RetryOptions::new(),
        RetryOptions::new().wait(Duration::from_secs(1)).timeout(Duration::from_secs(5)),
        1_000,
        5_000
    )]
    #[case::call_wins(
        RetryOptions::new().timeout(Duration::from_millis(100)),
        RetryOptions::new().wait(Duration::from_secs(1)).timeout(Duration::from_secs(5)),
        1_000,
        100
    )]
    fn test_resolve_layers(
        #[case] call: RetryOptions,
        #[case] defaults: RetryOptions,
        #[case] wait_ms: u64,
        #[case] timeout_ms: u64,
    ) {
        let policy = call.resolve(&defaults).unwrap();
        assert_eq!(policy.wait_interval(), Duration::from_millis(wait_ms));
        assert_eq!(policy.timeout(), Duration::from_millis(timeout_ms));
    }

    #[test]
    fn test_options_from_fractional_seconds() {
        let policy = RetryOptions::from_secs_f64(0.5, 2.25)
            .unwrap()
            .resolve(&RetryOptions::new())
            .unwrap();
        assert_eq!(policy.wait_interval(), Duration::from_millis(500));
        assert_eq!(policy.timeout(), Duration::from_millis(2250));

        let err = RetryOptions::from_secs_f64(1.0, -3.0).unwrap_err();
        assert!(err.to_string().starts_with("invalid value for timeout"));
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn test_invalid_seconds(#[case] secs: f64) {
        let err = duration_from_secs("C8Y_ASSERT_WAIT", secs).unwrap_err();
        assert!(err.to_string().contains("C8Y_ASSERT_WAIT"));
    }

    proptest! {
        #[test]
        fn prop_resolved_wait_is_never_zero(wait_ms in 0u64..10_000, timeout_ms in 0u64..100_000) {
            let options = RetryOptions::new()
                .wait(Duration::from_millis(wait_ms))
                .timeout(Duration::from_millis(timeout_ms));
            match options.resolve(&RetryOptions::new()) {
                Ok(policy) => prop_assert!(!policy.wait_interval().is_zero()),
                Err(err) => {
                    prop_assert_eq!(wait_ms, 0);
                    prop_assert_eq!(err, ConfigError::ZeroWait);
                }
            }
        }
    }
}
