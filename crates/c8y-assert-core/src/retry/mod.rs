//! Retry supervision for eventually consistent reads.
//!
//! # Key Types
//!
//! - [`RetrySupervisor`] - the polling loop
//! - [`RetryPolicy`] / [`RetryOptions`] - wait interval and timeout, per call
//! - [`Classify`] / [`ErrorKind`] - retryable vs terminal failures
//! - [`RetryObserver`] - sink for attempt transitions
//!
//! # Examples
//!
//! ```rust
//! use c8y_assert_core::retry::{RetryPolicy, RetrySupervisor, Tagged};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let policy = RetryPolicy::new(Duration::from_millis(10), Duration::from_secs(10)).unwrap();
//!
//! // A terminal failure ends the call right away, the timeout is not consulted.
//! let result: Result<(), _> = RetrySupervisor::new()
//!     .run("assert_success", &policy, || async {
//!         Err(Tagged::terminal(std::io::Error::other("operation FAILED")))
//!     })
//!     .await;
//!
//! assert!(result.unwrap_err().is_terminal());
//! # }
//! ```

mod classify;
mod observer;
mod policy;
mod supervisor;

pub use classify::{Classify, ErrorKind, Tagged};
pub use observer::{AttemptRecord, NoopObserver, RetryObserver, StatsObserver, TracingObserver};
pub use policy::{DEFAULT_TIMEOUT, DEFAULT_WAIT, RetryOptions, RetryPolicy, duration_from_secs};
pub use supervisor::{RetrySupervisor, retry};
