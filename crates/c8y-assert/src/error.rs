//! Error types for c8y assertions
//!
//! Every assertion failure is an [`AssertError`]. Its variant decides whether
//! the retry supervisor polls again ([`ErrorKind::Retryable`]) or gives up at
//! once ([`ErrorKind::Terminal`]). Failures of the remote accessor are
//! [`ApiError`]s, wrapped into [`AssertError::Api`].

use c8y_assert_core::retry::{Classify, ErrorKind};
use c8y_assert_core::{ConfigError, RetryError};
use thiserror::Error;

/// Result type of every public assertion member.
pub type Result<T> = std::result::Result<T, RetryError<AssertError>>;

/// Failure reported by a [`DeviceManagementApi`](crate::api::DeviceManagementApi) implementation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The requested object does not exist (404).
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Kind of object, e.g. `"operation"`
        resource: &'static str,
        /// Requested id
        id: String,
    },

    /// Network or connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The platform answered with an unexpected status code.
    #[error("API error (status {status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// The response could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Create a [`ApiError::NotFound`] error.
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Whether the object was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Classify for ApiError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::Connection(_) => ErrorKind::Retryable,
            Self::Status { status, .. } if *status == 429 || *status >= 500 => {
                ErrorKind::Retryable
            }
            Self::Status { .. } | Self::Decode(_) => ErrorKind::Terminal,
        }
    }
}

/// Failure of an assertion.
#[derive(Debug, Error)]
pub enum AssertError {
    /// The expectation is not met yet.
    #[error("{0}")]
    Unmet(String),

    /// The observed outcome is final, e.g. an operation that `FAILED`.
    #[error("{0}")]
    Final(String),

    /// The object the assertion looks for does not exist (yet).
    #[error("{resource} not found (id={id})")]
    NotFound {
        /// Kind of object, e.g. `"alarm"`
        resource: &'static str,
        /// Requested id
        id: String,
    },

    /// The remote accessor failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A pattern given to the assertion is not a valid regular expression.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AssertError {
    /// Create an [`AssertError::Unmet`] error.
    pub fn unmet(message: impl Into<String>) -> Self {
        Self::Unmet(message.into())
    }

    /// Create an [`AssertError::Final`] error.
    pub fn terminal(message: impl Into<String>) -> Self {
        Self::Final(message.into())
    }

    /// Create an [`AssertError::NotFound`] error.
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Map an accessor `NotFound` to an assertion `NotFound`.
    pub(crate) fn from_lookup(err: ApiError) -> Self {
        match err {
            ApiError::NotFound { resource, id } => Self::NotFound { resource, id },
            other => Self::Api(other),
        }
    }
}

impl Classify for AssertError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Unmet(_) | Self::NotFound { .. } => ErrorKind::Retryable,
            Self::Api(err) => err.kind(),
            Self::Final(_) | Self::InvalidPattern(_) | Self::Config(_) => ErrorKind::Terminal,
        }
    }
}
