//! Periodic background work during a test, e.g. publishing measurements

use crate::error::AssertError;
use c8y_assert_core::timer::{BackgroundTimerTask, TimerError, TimerSettings};
use std::error::Error;
use std::future::Future;

/// A set of background timers stopped together.
///
/// # Examples
///
/// ```rust
/// use c8y_assert::{AssertError, BackgroundTasks};
/// use c8y_assert_core::timer::TimerSettings;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut tasks = BackgroundTasks::<AssertError>::new();
/// tasks.start(
///     "heartbeat",
///     || async {
///         // publish something
///         Ok(())
///     },
///     TimerSettings::every(Duration::from_secs(5)),
/// )?;
///
/// // ... run the test ...
///
/// tasks.stop().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BackgroundTasks<E = AssertError> {
    tasks: Vec<BackgroundTimerTask<E>>,
}

impl<E> BackgroundTasks<E>
where
    E: Error + Send + 'static,
{
    /// An empty set.
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Start `target` on its own timer thread and track it.
    ///
    /// An invalid schedule, e.g. a zero interval, is rejected as
    /// [`TimerError::Configuration`] before anything runs.
    pub fn start<F, Fut>(
        &mut self,
        name: impl Into<String>,
        target: F,
        settings: TimerSettings,
    ) -> Result<(), TimerError<E>>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>>,
    {
        let task = BackgroundTimerTask::spawn(name, settings, target)?;
        self.tasks.push(task);
        Ok(())
    }

    /// Number of tracked tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no task is tracked.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Cancel all tasks, then wait for each of them to exit.
    ///
    /// Every task is joined even when an earlier one failed. The first
    /// captured failure is returned.
    pub async fn stop(&mut self) -> Result<(), TimerError<E>> {
        for task in &self.tasks {
            task.cancel();
        }

        let mut first_error = None;
        for task in self.tasks.drain(..) {
            let name = task.name().to_string();
            match task.join().await {
                Ok(invocations) => {
                    tracing::debug!(task = %name, invocations, "background task stopped");
                }
                Err(err) => {
                    tracing::warn!(task = %name, error = %err, "background task failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

impl<E> Default for BackgroundTasks<E>
where
    E: Error + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
