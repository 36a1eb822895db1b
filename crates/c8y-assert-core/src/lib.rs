#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Retry supervision for eventual-consistency assertions.
//!
//! Remote platforms converge asynchronously: an operation turns `SUCCESSFUL`
//! a few seconds after it was created, a measurement shows up after the device
//! sent it. Assertions against such a system have to be re-checked until they
//! hold or a time budget runs out. This crate provides the building blocks:
//!
//! - **Retry supervisor** ([`retry::RetrySupervisor`]): fixed wait, total
//!   timeout measured from the first attempt, diagnostics on exhaustion
//! - **Outcome classification** ([`retry::Classify`]): retryable failures are
//!   re-checked, terminal failures stop the loop at once
//! - **Member decoration** ([`decorate`]): per-instance retry wrapping of every
//!   member whose name matches `^assert_.+`
//! - **Background timers** ([`timer::BackgroundTimerTask`]): repeat an async
//!   target on a dedicated thread with cooperative cancellation
//!
//! # Examples
//!
//! ```rust
//! use c8y_assert_core::prelude::*;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = RetryOptions::new()
//!     .wait(Duration::from_millis(100))
//!     .timeout(Duration::from_secs(5))
//!     .resolve(&RetryOptions::new())?;
//!
//! let value = RetrySupervisor::new()
//!     .run("assert_value", &policy, || async { Ok::<_, std::io::Error>(42) })
//!     .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

pub mod decorate;
pub mod error;
pub mod retry;
pub mod timer;

pub use error::{ConfigError, RetryDiagnostic, RetryError};

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use c8y_assert_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::decorate::{Decorate, Decoration, MemberTable};
    pub use crate::error::{ConfigError, RetryDiagnostic, RetryError};
    pub use crate::retry::{
        Classify, ErrorKind, RetryObserver, RetryOptions, RetryPolicy, RetrySupervisor, Tagged,
        TracingObserver,
    };
    pub use crate::timer::{BackgroundTimerTask, TimerError, TimerSettings};
}
