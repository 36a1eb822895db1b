//! Error types for retry supervision.
//!
//! A supervised call ends in one of three ways besides success:
//!
//! - [`RetryError::Exhausted`]: every attempt failed with a retryable error and
//!   the timeout elapsed. The last error is kept and a [`RetryDiagnostic`] is
//!   attached as its source, so the message is self-describing.
//! - [`RetryError::Terminal`]: the operation reported an outcome that waiting
//!   cannot fix. The error is passed through untouched.
//! - [`RetryError::Configuration`]: the policy was invalid, nothing was invoked.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Invalid retry or timer configuration.
///
/// Raised while a call is being set up, never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The wait interval between attempts was zero.
    #[error("wait interval must be greater than zero")]
    ZeroWait,

    /// A background timer was configured without a positive interval.
    #[error("interval needs to be greater than zero")]
    ZeroInterval,

    /// A configuration value could not be interpreted.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Name of the setting (e.g. an environment variable)
        key: String,
        /// Why the value was rejected
        reason: String,
    },

    /// A component invoked a member missing from its member list.
    #[error("{component} has no member named {member}")]
    UnknownMember {
        /// Component name
        component: &'static str,
        /// Requested member
        member: String,
    },

    /// The member name pattern is not a valid regular expression.
    #[error("invalid member pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl ConfigError {
    /// Create an [`ConfigError::InvalidValue`] error.
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Retry context attached to the last error once the timeout is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDiagnostic {
    /// Time since the first attempt started
    pub elapsed: Duration,
    /// Number of attempts made
    pub attempts: u32,
    /// Configured timeout
    pub timeout: Duration,
    /// Configured wait interval
    pub wait: Duration,
}

impl fmt::Display for RetryDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Retries ended. duration={:.3}s, attempts={}, timeout={:.3}s, wait={:.3}s",
            self.elapsed.as_secs_f64(),
            self.attempts,
            self.timeout.as_secs_f64(),
            self.wait.as_secs_f64()
        )
    }
}

impl std::error::Error for RetryDiagnostic {}

/// Failure of a supervised call.
///
/// `E` is the error type of the wrapped operation.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Retryable failures until the timeout elapsed.
    ///
    /// The message is the last error's followed by the diagnostic; the error
    /// chain continues with the diagnostic. Use [`RetryError::error`] to get
    /// at the last error itself.
    #[error("{last_error} ({diagnostic})")]
    Exhausted {
        /// Error of the final attempt
        last_error: E,
        /// Elapsed time, attempt count and policy of the call
        #[source]
        diagnostic: RetryDiagnostic,
    },

    /// A terminal failure, returned as raised.
    #[error(transparent)]
    Terminal(E),

    /// Failure of a member that is not decorated, invoked exactly once.
    #[error(transparent)]
    Unsupervised(E),

    /// The retry policy could not be built.
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl<E> RetryError<E> {
    /// The error raised by the operation, if the call got that far.
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Exhausted { last_error, .. } => Some(last_error),
            Self::Terminal(err) | Self::Unsupervised(err) => Some(err),
            Self::Configuration(_) => None,
        }
    }

    /// Consume the error, returning the operation's own error if there is one.
    pub fn into_error(self) -> Option<E> {
        match self {
            Self::Exhausted { last_error, .. } => Some(last_error),
            Self::Terminal(err) | Self::Unsupervised(err) => Some(err),
            Self::Configuration(_) => None,
        }
    }

    /// Retry diagnostics, present only when the timeout was exhausted.
    pub fn diagnostic(&self) -> Option<&RetryDiagnostic> {
        match self {
            Self::Exhausted { diagnostic, .. } => Some(diagnostic),
            _ => None,
        }
    }

    /// Whether the call stopped on a terminal failure.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    /// Whether the call stopped because the timeout elapsed.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Map the operation error, keeping the outcome and diagnostics.
    pub fn map_err<F, O>(self, op: O) -> RetryError<F>
    where
        O: FnOnce(E) -> F,
    {
        match self {
            Self::Exhausted {
                last_error,
                diagnostic,
            } => RetryError::Exhausted {
                last_error: op(last_error),
                diagnostic,
            },
            Self::Terminal(err) => RetryError::Terminal(op(err)),
            Self::Unsupervised(err) => RetryError::Unsupervised(op(err)),
            Self::Configuration(err) => RetryError::Configuration(err),
        }
    }
}
