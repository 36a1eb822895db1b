//! Background timer task lifecycle tests
//!
//! The timer runs on its own thread and runtime, so these tests use the real
//! clock with short intervals and generous bounds.

use c8y_assert_core::timer::{BackgroundTimerTask, TimerError, TimerSettings};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Target counting its invocations, failing on invocation `fail_on` (0 = never)
fn counting_target(
    counter: Arc<AtomicU64>,
    fail_on: u64,
) -> impl FnMut() -> std::future::Ready<Result<(), io::Error>> + Send + 'static {
    move || {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if n == fail_on {
            std::future::ready(Err(io::Error::other("publish rejected")))
        } else {
            std::future::ready(Ok(()))
        }
    }
}

/// Poll `condition` until it holds, failing after 5s.
async fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached within 5s");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_cancel_stops_further_invocations() {
    let counter = Arc::new(AtomicU64::new(0));
    let task = BackgroundTimerTask::spawn(
        "measurements",
        TimerSettings::every(Duration::from_millis(20)),
        counting_target(counter.clone(), 0),
    )
    .unwrap();

    wait_for(|| counter.load(Ordering::SeqCst) >= 3).await;
    task.cancel();

    let joined_at = Instant::now();
    let invocations = task.join().await.unwrap();
    assert!(joined_at.elapsed() < Duration::from_secs(1));
    assert!(invocations >= 3);

    let after_join = counter.load(Ordering::SeqCst);
    assert_eq!(after_join, invocations);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(counter.load(Ordering::SeqCst), after_join);
}

#[tokio::test]
async fn test_timer_keeps_firing_while_caller_blocks() {
    let counter = Arc::new(AtomicU64::new(0));
    let task = BackgroundTimerTask::spawn(
        "heartbeat",
        TimerSettings::every(Duration::from_millis(50)),
        counting_target(counter.clone(), 0),
    )
    .unwrap();

    // Blocks the test's only runtime thread, e.g. a synchronous REST call
    std::thread::sleep(Duration::from_millis(300));
    let seen = task.invocations();
    assert!(seen >= 3, "only {seen} invocations while the caller was blocked");

    assert!(task.stop().await.unwrap() >= seen);
}

#[tokio::test]
async fn test_cancel_during_long_interval_is_prompt() {
    let counter = Arc::new(AtomicU64::new(0));
    let task = BackgroundTimerTask::spawn(
        "slow",
        TimerSettings::every(Duration::from_secs(600)),
        counting_target(counter.clone(), 0),
    )
    .unwrap();

    wait_for(|| counter.load(Ordering::SeqCst) == 1).await;

    let stopped_at = Instant::now();
    assert_eq!(task.stop().await.unwrap(), 1);
    assert!(stopped_at.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_cancel_is_visible_before_join() {
    let task = BackgroundTimerTask::spawn(
        "flag",
        TimerSettings::every(Duration::from_secs(600)),
        counting_target(Arc::new(AtomicU64::new(0)), 0),
    )
    .unwrap();

    assert_eq!(task.name(), "flag");
    assert!(!task.is_cancelled());
    task.cancel();
    assert!(task.is_cancelled());

    task.join().await.unwrap();
}

#[tokio::test]
async fn test_count_runs_exactly_that_many_times() {
    let counter = Arc::new(AtomicU64::new(0));
    let task = BackgroundTimerTask::spawn(
        "bounded",
        TimerSettings::every(Duration::from_millis(10)).with_count(3),
        counting_target(counter.clone(), 0),
    )
    .unwrap();

    assert_eq!(task.join().await.unwrap(), 3);
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_delay_postpones_first_invocation() {
    let counter = Arc::new(AtomicU64::new(0));
    let start = Instant::now();
    let task = BackgroundTimerTask::spawn(
        "delayed",
        TimerSettings::every(Duration::from_millis(10))
            .with_delay(Duration::from_millis(300))
            .with_count(1),
        counting_target(counter.clone(), 0),
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    assert_eq!(task.join().await.unwrap(), 1);
    assert!(start.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_target_error_is_captured() {
    let counter = Arc::new(AtomicU64::new(0));
    let task = BackgroundTimerTask::spawn(
        "failing",
        TimerSettings::every(Duration::from_millis(10)),
        counting_target(counter.clone(), 2),
    )
    .unwrap();

    wait_for(|| task.is_finished()).await;

    match task.join().await {
        Err(TimerError::Target {
            invocations,
            source,
        }) => {
            assert_eq!(invocations, 2);
            assert_eq!(source.to_string(), "publish rejected");
        }
        other => panic!("Expected target error, got {other:?}"),
    }
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_target_panic_is_captured() {
    let counter = Arc::new(AtomicU64::new(0));
    let inner = counter.clone();
    let task = BackgroundTimerTask::spawn(
        "panicking",
        TimerSettings::every(Duration::from_millis(10)),
        move || {
            let inner = inner.clone();
            async move {
                if inner.fetch_add(1, Ordering::SeqCst) == 1 {
                    panic!("boom");
                }
                Ok::<(), io::Error>(())
            }
        },
    )
    .unwrap();

    match task.join().await {
        Err(TimerError::Panicked(message)) => assert_eq!(message, "boom"),
        other => panic!("Expected panic, got {other:?}"),
    }
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_dropping_the_handle_cancels() {
    let counter = Arc::new(AtomicU64::new(0));
    let task = BackgroundTimerTask::spawn(
        "dropped",
        TimerSettings::every(Duration::from_millis(10)),
        counting_target(counter.clone(), 0),
    )
    .unwrap();

    wait_for(|| counter.load(Ordering::SeqCst) >= 2).await;
    drop(task);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let after_drop = counter.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(counter.load(Ordering::SeqCst), after_drop);
}
