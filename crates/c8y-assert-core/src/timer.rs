//! Background timer task.
//!
//! [`BackgroundTimerTask`] invokes an async target repeatedly on a dedicated
//! thread driving its own current-thread tokio runtime: first after `delay`,
//! then every `interval`, until cancelled or until `count` invocations have
//! run. The caller's runtime may block without stalling the timer.
//!
//! Cancellation is cooperative. It is observed between invocations and while
//! waiting for the next tick, so an in-flight invocation always runs to
//! completion.
//!
//! # Examples
//!
//! ```rust
//! use c8y_assert_core::timer::{BackgroundTimerTask, TimerSettings};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let task = BackgroundTimerTask::spawn(
//!     "heartbeat",
//!     TimerSettings::every(Duration::from_millis(50)).with_count(3),
//!     || async { Ok::<_, std::io::Error>(()) },
//! )?;
//!
//! assert_eq!(task.join().await?, 3);
//! # Ok(())
//! # }
//! ```

use crate::error::ConfigError;
use std::any::Any;
use std::error::Error;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Runtime;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Schedule of a [`BackgroundTimerTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    interval: Duration,
    delay: Duration,
    count: u64,
}

impl TimerSettings {
    /// Run every `interval`, starting immediately, without limit.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            delay: Duration::ZERO,
            count: 0,
        }
    }

    /// Wait `delay` before the first invocation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Stop after exactly `count` invocations, `0` means unbounded.
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    /// Time between two invocations.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time before the first invocation.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Invocation limit, `0` when unbounded.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Reject a zero interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }
}

/// Why a background timer task ended abnormally.
#[derive(Debug, Error)]
pub enum TimerError<E> {
    /// The settings were invalid.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// The target returned an error; the task stopped.
    #[error("timer target failed on invocation {invocations}: {source}")]
    Target {
        /// Invocation that failed (1-indexed)
        invocations: u64,
        /// The target's error
        #[source]
        source: E,
    },

    /// The timer thread could not be started, returned by `spawn`, or its
    /// runtime could not be built, returned by `join`.
    #[error("failed to start timer thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The target panicked.
    #[error("timer target panicked: {0}")]
    Panicked(String),

    /// The timer thread could not be joined.
    #[error("timer task was aborted")]
    Aborted,
}

/// A repeating async target running on its own thread.
///
/// Dropping the handle cancels the task without waiting for it.
#[derive(Debug)]
pub struct BackgroundTimerTask<E> {
    name: String,
    cancel: CancellationToken,
    invocations: Arc<AtomicU64>,
    thread: Option<JoinHandle<Result<u64, TimerError<E>>>>,
}

impl<E> BackgroundTimerTask<E>
where
    E: Error + Send + 'static,
{
    /// Start the timer on a new thread.
    ///
    /// The target runs on the timer's own runtime, so its futures need not be
    /// `Send`. Any tokio resource it uses must not be bound to another runtime.
    pub fn spawn<F, Fut>(
        name: impl Into<String>,
        settings: TimerSettings,
        target: F,
    ) -> Result<Self, TimerError<E>>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>>,
    {
        settings.validate()?;

        let name = name.into();
        let cancel = CancellationToken::new();
        let invocations = Arc::new(AtomicU64::new(0));

        let thread = {
            let name = name.clone();
            let cancel = cancel.clone();
            let invocations = invocations.clone();
            std::thread::Builder::new()
                .name(format!("timer-{name}"))
                .spawn(move || -> Result<u64, TimerError<E>> {
                    let runtime = timer_runtime().map_err(TimerError::Spawn)?;
                    runtime.block_on(run_timer(name, settings, cancel, invocations, target))
                })
                .map_err(TimerError::Spawn)?
        };

        Ok(Self {
            name,
            cancel,
            invocations,
            thread: Some(thread),
        })
    }

    /// Task name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the task to stop. Returns immediately.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Invocations started so far.
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Whether the timer thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the timer thread to exit, returning the number of invocations.
    ///
    /// The thread is joined on tokio's blocking pool, so the calling task
    /// only suspends.
    pub async fn join(mut self) -> Result<u64, TimerError<E>> {
        let Some(thread) = self.thread.take() else {
            return Ok(self.invocations());
        };

        match tokio::task::spawn_blocking(move || thread.join()).await {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => Err(TimerError::Panicked(panic_message(payload))),
            Err(_) => Err(TimerError::Aborted),
        }
    }

    /// Cancel, then [`join`](Self::join).
    pub async fn stop(self) -> Result<u64, TimerError<E>> {
        self.cancel();
        self.join().await
    }
}

impl<E> Drop for BackgroundTimerTask<E> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn timer_runtime() -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

async fn run_timer<E, F, Fut>(
    name: String,
    settings: TimerSettings,
    cancel: CancellationToken,
    invocations: Arc<AtomicU64>,
    mut target: F,
) -> Result<u64, TimerError<E>>
where
    E: Error,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    // Ticks stay on the schedule start + delay + n * interval
    let mut ticker = tokio::time::interval_at(Instant::now() + settings.delay, settings.interval);

    tracing::debug!(
        timer = %name,
        interval_ms = settings.interval.as_millis() as u64,
        delay_ms = settings.delay.as_millis() as u64,
        count = settings.count,
        "timer started"
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let invocation = invocations.fetch_add(1, Ordering::SeqCst) + 1;
        if let Err(source) = target().await {
            tracing::warn!(timer = %name, invocation, error = %source, "timer target failed");
            return Err(TimerError::Target {
                invocations: invocation,
                source,
            });
        }

        if settings.count > 0 && invocation >= settings.count {
            break;
        }
    }

    let total = invocations.load(Ordering::SeqCst);
    tracing::debug!(timer = %name, invocations = total, "timer stopped");
    Ok(total)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
