//! Observation of retry attempts.
//!
//! The supervisor never logs on its own. It reports every attempt transition
//! to a [`RetryObserver`] sink, which defaults to [`NoopObserver`].
//! [`TracingObserver`] turns the transitions into `tracing` events.

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Snapshot of the retry loop after an attempt finished.
#[derive(Debug, Clone, Copy)]
pub struct AttemptRecord<'a> {
    /// Attempt number (1-indexed)
    pub attempt_number: u32,
    /// Time since the first attempt started
    pub elapsed: Duration,
    /// Error of this attempt, `None` on success
    pub last_error: Option<&'a (dyn Error + 'a)>,
}

/// Sink for retry attempt transitions.
///
/// All methods default to doing nothing, implement the ones you need.
///
/// # Examples
///
/// ```rust
/// use c8y_assert_core::retry::{AttemptRecord, RetryObserver};
/// use std::time::Duration;
///
/// struct PrintFailures;
///
/// impl RetryObserver for PrintFailures {
///     fn on_attempt_failed(&self, member: &str, record: &AttemptRecord<'_>, next_wait: Duration) {
///         if let Some(err) = record.last_error {
///             eprintln!("{member} attempt {} failed: {err}, next in {next_wait:?}", record.attempt_number);
///         }
///     }
/// }
/// ```
pub trait RetryObserver: Send + Sync {
    /// An attempt is about to run.
    fn on_attempt_start(&self, member: &str, attempt: u32) {
        let _ = (member, attempt);
    }

    /// An attempt failed with a retryable error and the loop will sleep `next_wait`.
    fn on_attempt_failed(&self, member: &str, record: &AttemptRecord<'_>, next_wait: Duration) {
        let _ = (member, record, next_wait);
    }

    /// The operation succeeded.
    fn on_success(&self, member: &str, record: &AttemptRecord<'_>) {
        let _ = (member, record);
    }

    /// The timeout elapsed, `record` holds the last error.
    fn on_exhausted(&self, member: &str, record: &AttemptRecord<'_>) {
        let _ = (member, record);
    }

    /// A terminal error stopped the loop.
    fn on_terminal(&self, member: &str, record: &AttemptRecord<'_>) {
        let _ = (member, record);
    }
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RetryObserver for NoopObserver {}

/// Observer that emits `tracing` events.
///
/// # Log Levels
///
/// - attempt start: DEBUG
/// - failed attempt that will be retried: INFO
/// - success: INFO
/// - timeout exhausted, terminal failure: WARN
#[derive(Debug, Clone)]
pub struct TracingObserver {
    component: String,
}

impl TracingObserver {
    /// Create an observer labelling events with `component`.
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// The component label.
    pub fn component(&self) -> &str {
        &self.component
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("c8y")
    }
}

impl RetryObserver for TracingObserver {
    fn on_attempt_start(&self, member: &str, attempt: u32) {
        tracing::debug!(
            component = %self.component,
            member,
            attempt,
            "executing"
        );
    }

    fn on_attempt_failed(&self, member: &str, record: &AttemptRecord<'_>, next_wait: Duration) {
        tracing::info!(
            component = %self.component,
            member,
            attempt = record.attempt_number,
            elapsed_ms = record.elapsed.as_millis() as u64,
            wait_ms = next_wait.as_millis() as u64,
            error = record.last_error.map(tracing::field::display),
            "failed attempt"
        );
    }

    fn on_success(&self, member: &str, record: &AttemptRecord<'_>) {
        tracing::info!(
            component = %self.component,
            member,
            attempt = record.attempt_number,
            elapsed_ms = record.elapsed.as_millis() as u64,
            "successful"
        );
    }

    fn on_exhausted(&self, member: &str, record: &AttemptRecord<'_>) {
        tracing::warn!(
            component = %self.component,
            member,
            attempts = record.attempt_number,
            elapsed_ms = record.elapsed.as_millis() as u64,
            error = record.last_error.map(tracing::field::display),
            "retries ended"
        );
    }

    fn on_terminal(&self, member: &str, record: &AttemptRecord<'_>) {
        tracing::warn!(
            component = %self.component,
            member,
            attempt = record.attempt_number,
            error = record.last_error.map(tracing::field::display),
            "final assertion failure, not retrying"
        );
    }
}

/// Observer counting transitions, useful in tests and for metrics.
#[derive(Debug, Default)]
pub struct StatsObserver {
    attempts: AtomicU32,
    failures: AtomicU32,
    successes: AtomicU32,
    exhaustions: AtomicU32,
    terminals: AtomicU32,
}

impl StatsObserver {
    /// Create a zeroed observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts started.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Failed attempts that were followed by a wait.
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Successful calls.
    pub fn successes(&self) -> u32 {
        self.successes.load(Ordering::SeqCst)
    }

    /// Calls that ran out of time.
    pub fn exhaustions(&self) -> u32 {
        self.exhaustions.load(Ordering::SeqCst)
    }

    /// Calls stopped by a terminal error.
    pub fn terminals(&self) -> u32 {
        self.terminals.load(Ordering::SeqCst)
    }
}

impl RetryObserver for StatsObserver {
    fn on_attempt_start(&self, _member: &str, _attempt: u32) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_attempt_failed(&self, _member: &str, _record: &AttemptRecord<'_>, _next_wait: Duration) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    fn on_success(&self, _member: &str, _record: &AttemptRecord<'_>) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_exhausted(&self, _member: &str, _record: &AttemptRecord<'_>) {
        self.exhaustions.fetch_add(1, Ordering::SeqCst);
    }

    fn on_terminal(&self, _member: &str, _record: &AttemptRecord<'_>) {
        self.terminals.fetch_add(1, Ordering::SeqCst);
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for Arc<T> {
    fn on_attempt_start(&self, member: &str, attempt: u32) {
        (**self).on_attempt_start(member, attempt)
    }

    fn on_attempt_failed(&self, member: &str, record: &AttemptRecord<'_>, next_wait: Duration) {
        (**self).on_attempt_failed(member, record, next_wait)
    }

    fn on_success(&self, member: &str, record: &AttemptRecord<'_>) {
        (**self).on_success(member, record)
    }

    fn on_exhausted(&self, member: &str, record: &AttemptRecord<'_>) {
        (**self).on_exhausted(member, record)
    }

    fn on_terminal(&self, member: &str, record: &AttemptRecord<'_>) {
        (**self).on_terminal(member, record)
    }
}
