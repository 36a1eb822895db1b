//! Outcome classification: decides whether a failure is worth another attempt.

use crate::error::ConfigError;
use std::error::Error;
use std::fmt;

/// Retry eligibility of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The expectation is not met yet, or a transient fault occurred.
    Retryable,
    /// The outcome is final, waiting cannot change it.
    Terminal,
}

impl ErrorKind {
    /// Whether this kind must stop the retry loop.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Terminal)
    }
}

/// Errors that know their own [`ErrorKind`].
///
/// Classification is by variant, never by message. The supervisor consults
/// [`Classify::kind`] after every failed attempt, the first one included.
///
/// # Examples
///
/// ```rust
/// use c8y_assert_core::retry::{Classify, ErrorKind};
///
/// #[derive(Debug, thiserror::Error)]
/// enum StatusError {
///     #[error("still running")]
///     Pending,
///     #[error("failed for good")]
///     Failed,
/// }
///
/// impl Classify for StatusError {
///     fn kind(&self) -> ErrorKind {
///         match self {
///             StatusError::Pending => ErrorKind::Retryable,
///             StatusError::Failed => ErrorKind::Terminal,
///         }
///     }
/// }
///
/// assert!(StatusError::Failed.kind().is_terminal());
/// ```
pub trait Classify {
    /// The retry eligibility of this error.
    fn kind(&self) -> ErrorKind;

    /// Shorthand for `self.kind().is_terminal()`.
    fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }
}

/// I/O faults are transient.
impl Classify for std::io::Error {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Retryable
    }
}

impl Classify for ConfigError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Terminal
    }
}

impl<E: Classify + ?Sized> Classify for Box<E> {
    fn kind(&self) -> ErrorKind {
        (**self).kind()
    }
}

impl<E: Classify + ?Sized> Classify for std::sync::Arc<E> {
    fn kind(&self) -> ErrorKind {
        (**self).kind()
    }
}

/// An arbitrary error with an explicit [`ErrorKind`] tag.
///
/// Lets operations whose error type has no classification of its own decide
/// per failure, e.g. `Tagged::terminal(err)` once a status is known to be final.
#[derive(Debug)]
pub struct Tagged<E> {
    kind: ErrorKind,
    error: E,
}

impl<E> Tagged<E> {
    /// Tag an error with a kind.
    pub fn new(kind: ErrorKind, error: E) -> Self {
        Self { kind, error }
    }

    /// Tag an error as retryable.
    pub fn retryable(error: E) -> Self {
        Self::new(ErrorKind::Retryable, error)
    }

    /// Tag an error as terminal.
    pub fn terminal(error: E) -> Self {
        Self::new(ErrorKind::Terminal, error)
    }

    /// The wrapped error.
    pub fn get_ref(&self) -> &E {
        &self.error
    }

    /// Unwrap the tagged error.
    pub fn into_inner(self) -> E {
        self.error
    }
}

impl<E> Classify for Tagged<E> {
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl<E: fmt::Display> fmt::Display for Tagged<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<E: Error> Error for Tagged<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.error.source()
    }
}
