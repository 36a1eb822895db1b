//! The retry loop.

use super::classify::{Classify, ErrorKind};
use super::observer::{AttemptRecord, NoopObserver, RetryObserver};
use super::policy::{RetryOptions, RetryPolicy};
use crate::error::{RetryDiagnostic, RetryError};
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;

/// Re-invokes an operation until it succeeds, fails terminally, or runs out of time.
///
/// # Loop
///
/// 1. Invoke the operation (attempt 1). Success is returned immediately.
/// 2. A [`ErrorKind::Terminal`] failure is returned as [`RetryError::Terminal`]
///    at once, whatever budget is left.
/// 3. A [`ErrorKind::Retryable`] failure ends the call with
///    [`RetryError::Exhausted`] once the time since the first attempt reaches
///    the timeout; otherwise the supervisor sleeps the wait interval and
///    goes back to 1.
///
/// A zero timeout therefore means exactly one attempt.
///
/// Sleeping uses `tokio::time`, so only the calling task is suspended. The
/// operation runs potentially many times and must be safe to repeat.
///
/// # Examples
///
/// ```rust
/// use c8y_assert_core::retry::{RetryPolicy, RetrySupervisor, Tagged};
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let supervisor = RetrySupervisor::new();
/// let policy = RetryPolicy::new(Duration::from_millis(10), Duration::from_secs(1))?;
/// let polls = AtomicU32::new(0);
///
/// let status = supervisor
///     .run("assert_ready", &policy, || async {
///         if polls.fetch_add(1, Ordering::SeqCst) < 2 {
///             Err(Tagged::retryable(std::io::Error::other("not ready yet")))
///         } else {
///             Ok("ready")
///         }
///     })
///     .await?;
///
/// assert_eq!(status, "ready");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RetrySupervisor {
    observer: Arc<dyn RetryObserver>,
}

impl RetrySupervisor {
    /// Supervisor reporting to a [`NoopObserver`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Supervisor reporting to `observer`.
    pub fn with_observer(observer: impl RetryObserver + 'static) -> Self {
        Self {
            observer: Arc::new(observer),
        }
    }

    /// Supervisor reporting to a shared observer.
    pub fn with_shared_observer(observer: Arc<dyn RetryObserver>) -> Self {
        Self { observer }
    }

    /// The observer sink.
    pub fn observer(&self) -> &Arc<dyn RetryObserver> {
        &self.observer
    }

    /// Run `operation` under `policy`.
    ///
    /// `member` labels the observer callbacks.
    pub async fn run<T, E, F, Fut>(
        &self,
        member: &str,
        policy: &RetryPolicy,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + Error,
    {
        let start = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            self.observer.on_attempt_start(member, attempt);

            let err = match operation().await {
                Ok(value) => {
                    let record = AttemptRecord {
                        attempt_number: attempt,
                        elapsed: start.elapsed(),
                        last_error: None,
                    };
                    self.observer.on_success(member, &record);
                    return Ok(value);
                }
                Err(err) => err,
            };

            let elapsed = start.elapsed();
            let record = AttemptRecord {
                attempt_number: attempt,
                elapsed,
                last_error: Some(&err as &dyn Error),
            };

            match err.kind() {
                ErrorKind::Terminal => {
                    self.observer.on_terminal(member, &record);
                    return Err(RetryError::Terminal(err));
                }
                ErrorKind::Retryable if elapsed >= policy.timeout() => {
                    self.observer.on_exhausted(member, &record);
                    return Err(RetryError::Exhausted {
                        last_error: err,
                        diagnostic: RetryDiagnostic {
                            elapsed,
                            attempts: attempt,
                            timeout: policy.timeout(),
                            wait: policy.wait_interval(),
                        },
                    });
                }
                ErrorKind::Retryable => {
                    self.observer
                        .on_attempt_failed(member, &record, policy.wait_interval());
                }
            }

            tokio::time::sleep(policy.wait_interval()).await;
        }
    }

    /// Resolve `options` over `defaults`, then [`run`](Self::run).
    ///
    /// An invalid policy is returned as [`RetryError::Configuration`] without
    /// invoking the operation.
    pub async fn run_with_options<T, E, F, Fut>(
        &self,
        member: &str,
        options: &RetryOptions,
        defaults: &RetryOptions,
        operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + Error,
    {
        let policy = options.resolve(defaults)?;
        self.run(member, &policy, operation).await
    }
}

impl Default for RetrySupervisor {
    fn default() -> Self {
        Self::with_observer(NoopObserver)
    }
}

impl fmt::Debug for RetrySupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrySupervisor").finish_non_exhaustive()
    }
}

/// Run `operation` with a default supervisor (no observer).
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + Error,
{
    RetrySupervisor::new().run("operation", policy, operation).await
}
